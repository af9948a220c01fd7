//! [`BundleEngine`] on top of rolldown.
//!
//! `bundle` prepares everything that does not depend on the output format
//! (plugins, tsconfig aliases, resolution settings). Rolldown fixes the
//! format at build time, so the actual build runs in [`BundleGraph::write`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rolldown::{
    BundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform, RawMinifyOptions,
    ResolveOptions,
};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;

use super::plugins::{ExternalsPlugin, JsonMode, JsonPlugin, ReplacePlugin};
use super::tsconfig::{self, PathAlias};
use super::{
    BundleEngine, BundleGraph, BundleRequest, EngineLog, Format, LogCallback, LogLevel,
    WriteOptions, declarations, wrap_code, writer,
};
use crate::pipeline::{NodeResolveOptions, PipelinePlugin, TranspilePlatform};

const DEFAULT_EXTENSIONS: [&str; 8] = [
    ".ts", ".tsx", ".mts", ".cts", ".js", ".mjs", ".cjs", ".json",
];

/// Rolldown diagnostic kinds and the log codes they surface as.
const DIAGNOSTIC_CODES: [(&str, &str); 11] = [
    ("CircularDependency", "CIRCULAR_DEPENDENCY"),
    ("UnresolvedImport", "UNRESOLVED_IMPORT"),
    ("UnresolvedEntry", "UNRESOLVED_ENTRY"),
    ("MissingExport", "MISSING_EXPORT"),
    ("MixedExport", "MIXED_EXPORT"),
    ("EmptyImportMeta", "EMPTY_IMPORT_META"),
    ("CommonJsVariableInEsm", "COMMONJS_VARIABLE_IN_ESM"),
    ("AmbiguousExternalNamespace", "AMBIGUOUS_EXTERNAL_NAMESPACE"),
    ("UnloadableDependency", "UNLOADABLE_DEPENDENCY"),
    ("ParseError", "PARSE_ERROR"),
    ("Eval", "EVAL"),
];

/// The production engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownEngine;

impl RolldownEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BundleEngine for RolldownEngine {
    async fn bundle(&self, request: BundleRequest) -> Result<Box<dyn BundleGraph>> {
        if let Some(options) = request.pipeline.declarations() {
            return declarations::bundle_declarations(&request, options).await;
        }

        let transpile = request.pipeline.transpile().cloned().unwrap_or_default();
        let tsconfig = tsconfig::tsconfig_path(&request.cwd, transpile.tsconfig.as_deref());
        let aliases = tsconfig::read_aliases(&tsconfig).await;
        let plugins = build_plugins(&request, &aliases)?;

        tracing::debug!(
            input = %request.input.display(),
            pipeline = ?request.pipeline.names(),
            aliases = aliases.len(),
            "Prepared rolldown unit"
        );

        Ok(Box::new(RolldownGraph {
            unit: Some(PreparedUnit {
                cwd: request.cwd,
                input: request.input,
                platform: transpile.platform.unwrap_or(TranspilePlatform::Node),
                minify: transpile.minify.unwrap_or(false),
                resolve: request.pipeline.resolve().cloned(),
                aliases,
                plugins,
            }),
            on_log: request.on_log,
        }))
    }
}

/// Rolldown plugins for the pipeline, in pipeline order. Externals come
/// first so that nothing else resolves an excluded specifier.
fn build_plugins(
    request: &BundleRequest,
    aliases: &[PathAlias],
) -> Result<Vec<SharedPluginable>> {
    let mut externals =
        ExternalsPlugin::new(request.externals.clone(), Arc::clone(&request.on_log));
    if request.pipeline.resolve().is_none() {
        externals = externals.with_bare_external(aliases.iter().map(|a| a.key.clone()).collect());
    }

    let mut plugins: Vec<SharedPluginable> = vec![Arc::new(externals)];
    let mut json_stage = false;

    for stage in request.pipeline.plugins() {
        match stage {
            // Resolution and transpilation are rolldown options.
            PipelinePlugin::Resolve(_) | PipelinePlugin::Transpile(_) => {}
            PipelinePlugin::Replace(options) => {
                plugins.push(Arc::new(ReplacePlugin::new(options)?));
            }
            PipelinePlugin::Json(options) => {
                json_stage = true;
                plugins.push(Arc::new(JsonPlugin::new(JsonMode::from(Some(options)))));
            }
            PipelinePlugin::Custom(plugin) => plugins.push(plugin.shared()),
            PipelinePlugin::Declarations(_) => {
                anyhow::bail!("declaration stage cannot run in a transpile pipeline")
            }
        }
    }

    if !json_stage {
        plugins.push(Arc::new(JsonPlugin::new(JsonMode::Reject)));
    }
    Ok(plugins)
}

/// Everything needed to run rolldown except the output format.
struct PreparedUnit {
    cwd: PathBuf,
    input: PathBuf,
    platform: TranspilePlatform,
    minify: bool,
    resolve: Option<NodeResolveOptions>,
    aliases: Vec<PathAlias>,
    plugins: Vec<SharedPluginable>,
}

impl PreparedUnit {
    fn bundler_options(&self, format: Format) -> BundlerOptions {
        let name = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index")
            .to_string();

        BundlerOptions {
            input: Some(vec![InputItem {
                name: Some(name),
                import: self.input.to_string_lossy().into_owned(),
            }]),
            cwd: Some(self.cwd.clone()),
            format: Some(match format {
                Format::Esm => OutputFormat::Esm,
                Format::Cjs => OutputFormat::Cjs,
            }),
            platform: Some(match self.platform {
                TranspilePlatform::Node => Platform::Node,
                TranspilePlatform::Browser => Platform::Browser,
                TranspilePlatform::Neutral => Platform::Neutral,
            }),
            minify: self.minify.then(|| RawMinifyOptions::from(true)),
            resolve: Some(resolve_options(
                &self.cwd,
                self.platform,
                format,
                self.resolve.as_ref(),
                &self.aliases,
            )),
            ..Default::default()
        }
    }
}

fn resolve_options(
    cwd: &Path,
    platform: TranspilePlatform,
    format: Format,
    resolve: Option<&NodeResolveOptions>,
    aliases: &[PathAlias],
) -> ResolveOptions {
    let alias = (!aliases.is_empty()).then(|| {
        aliases
            .iter()
            .map(|a| (a.key.clone(), vec![Some(a.target.to_string_lossy().into_owned())]))
            .collect()
    });

    let extensions = resolve
        .and_then(|r| r.extensions.clone())
        .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());

    let Some(resolve) = resolve else {
        return ResolveOptions {
            alias,
            extensions: Some(extensions),
            ..Default::default()
        };
    };

    let browser = resolve.browser || platform == TranspilePlatform::Browser;
    let main_fields = resolve.main_fields.clone().unwrap_or_else(|| {
        let fields: &[&str] = if browser {
            &["browser", "module", "main"]
        } else {
            &["module", "main"]
        };
        fields.iter().map(|f| f.to_string()).collect()
    });

    ResolveOptions {
        alias,
        main_fields: Some(main_fields),
        condition_names: Some(
            resolve
                .export_conditions
                .clone()
                .unwrap_or_else(|| default_conditions(browser, format)),
        ),
        extensions: Some(extensions),
        modules: Some(node_modules_dirs(cwd)),
        symlinks: Some(true),
        ..Default::default()
    }
}

fn default_conditions(browser: bool, format: Format) -> Vec<String> {
    let platform = if browser { "browser" } else { "node" };
    let kind = match format {
        Format::Esm => "import",
        Format::Cjs => "require",
    };
    [platform, kind, "module", "default"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// `node_modules` of `cwd` and every ancestor, nearest first.
fn node_modules_dirs(cwd: &Path) -> Vec<String> {
    let mut dirs: Vec<String> = cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").to_string_lossy().into_owned())
        .collect();
    dirs.push("node_modules".to_string());
    dirs
}

fn diagnostic_code(text: &str) -> Option<&'static str> {
    DIAGNOSTIC_CODES
        .iter()
        .find(|(kind, _)| text.contains(kind))
        .map(|(_, code)| *code)
}

fn engine_error(error: &dyn fmt::Debug) -> anyhow::Error {
    let text = format!("{error:?}");
    match diagnostic_code(&text) {
        Some(code) => anyhow::anyhow!("[{code}] {text}"),
        None => anyhow::anyhow!(text),
    }
}

fn warning_log(warning: &(impl fmt::Debug + fmt::Display)) -> EngineLog {
    EngineLog {
        level: LogLevel::Warn,
        code: diagnostic_code(&format!("{warning:?}")).map(str::to_string),
        message: warning.to_string(),
        plugin: None,
        id: None,
    }
}

struct RolldownGraph {
    unit: Option<PreparedUnit>,
    on_log: LogCallback,
}

#[async_trait]
impl BundleGraph for RolldownGraph {
    async fn write(&mut self, options: &WriteOptions) -> Result<()> {
        let mut unit = self
            .unit
            .take()
            .context("bundle graph was already written")?;
        let bundler_options = unit.bundler_options(options.format);
        let plugins = std::mem::take(&mut unit.plugins);

        let mut bundler = BundlerBuilder::default()
            .with_options(bundler_options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| engine_error(&e))?;
        let output = bundler.generate().await.map_err(|e| engine_error(&e))?;

        for warning in &output.warnings {
            (self.on_log)(warning_log(warning));
        }

        let base_dir = options
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut wrote_entry = false;

        for item in &output.assets {
            match item {
                Output::Chunk(chunk) if chunk.is_entry && !wrote_entry => {
                    let code = wrap_code(
                        &chunk.code,
                        options.banner.as_deref(),
                        options.footer.as_deref(),
                    );
                    writer::write_output(&options.file, code.as_bytes()).await?;
                    wrote_entry = true;
                }
                Output::Chunk(chunk) => {
                    let path = writer::chunk_path(&base_dir, chunk.filename.as_str())?;
                    writer::write_output(&path, chunk.code.as_bytes()).await?;
                }
                Output::Asset(asset) => {
                    let path = writer::chunk_path(&base_dir, asset.filename.as_str())?;
                    writer::write_output(&path, asset.source.as_bytes()).await?;
                }
            }
        }

        if !wrote_entry {
            anyhow::bail!("rolldown produced no entry chunk for {}", unit.input.display());
        }
        Ok(())
    }
}
