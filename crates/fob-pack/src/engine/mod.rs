//! Bundling engine contract.
//!
//! The executor only talks to [`BundleEngine`]: one `bundle` call per build
//! unit yields a [`BundleGraph`], which is then written once in the unit's
//! format. [`RolldownEngine`] is the production implementation.

mod declarations;
mod plugins;
mod rolldown_engine;
mod tsconfig;
mod writer;

pub use declarations::generate_declarations;
pub use rolldown_engine::RolldownEngine;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ExternalPattern;
use crate::pipeline::Pipeline;

/// Output module format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Esm,
    Cjs,
}

impl Format {
    /// `.cjs` outputs are CommonJS, everything else is ESM.
    pub fn from_output_path(path: &str) -> Self {
        if path.ends_with(".cjs") {
            Format::Cjs
        } else {
            Format::Esm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Esm => "esm",
            Format::Cjs => "cjs",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an engine log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// A log raised while bundling one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLog {
    pub level: LogLevel,
    pub code: Option<String>,
    pub message: String,
    pub plugin: Option<String>,
    pub id: Option<String>,
}

impl EngineLog {
    pub fn warn(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warn,
            code: Some(code.into()),
            message: message.into(),
            plugin: None,
            id: None,
        }
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Callback receiving every log the engine raises for a unit.
pub type LogCallback = Arc<dyn Fn(EngineLog) + Send + Sync>;

/// One engine invocation.
#[derive(Clone)]
pub struct BundleRequest {
    /// Project root; relative specifiers in the pipeline resolve against it.
    pub cwd: PathBuf,
    pub input: PathBuf,
    pub pipeline: Pipeline,
    pub externals: Vec<ExternalPattern>,
    pub on_log: LogCallback,
}

impl fmt::Debug for BundleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleRequest")
            .field("cwd", &self.cwd)
            .field("input", &self.input)
            .field("pipeline", &self.pipeline)
            .field("externals", &self.externals)
            .finish_non_exhaustive()
    }
}

/// Options for writing a bundled graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Absolute path of the primary output file.
    pub file: PathBuf,
    pub format: Format,
    pub banner: Option<String>,
    pub footer: Option<String>,
}

/// Bundles a single input into an in-memory graph.
#[async_trait]
pub trait BundleEngine: Send + Sync {
    async fn bundle(&self, request: BundleRequest) -> anyhow::Result<Box<dyn BundleGraph>>;
}

/// The result of one `bundle` call.
#[async_trait]
pub trait BundleGraph: Send {
    /// Write the graph to `options.file`, creating parent directories.
    async fn write(&mut self, options: &WriteOptions) -> anyhow::Result<()>;
}

#[async_trait]
impl<E: BundleEngine + ?Sized> BundleEngine for Arc<E> {
    async fn bundle(&self, request: BundleRequest) -> anyhow::Result<Box<dyn BundleGraph>> {
        (**self).bundle(request).await
    }
}

/// Prepend the banner and append the footer, each on its own line.
///
/// A banner starting with `#!` replaces any hashbang line already at the
/// top of `code`; a script may only carry one.
pub(crate) fn wrap_code(code: &str, banner: Option<&str>, footer: Option<&str>) -> String {
    let mut out = String::with_capacity(code.len());
    let mut code = code;
    if let Some(banner) = banner {
        if banner.starts_with("#!") && code.starts_with("#!") {
            code = code.split_once('\n').map_or("", |(_, rest)| rest);
        }
        out.push_str(banner);
        if !banner.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(code);
    if let Some(footer) = footer {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(footer);
        if !footer.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
