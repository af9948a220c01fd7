//! Configuration schema and the resolved build configuration.
//!
//! [`UserConfig`] is what a config file, the `fobPack` manifest field or a
//! Rust caller supplies. [`ConfigResolver`] merges it with the manifest and
//! CLI overrides into a [`BuildConfiguration`], which is immutable from then
//! on and is all the executor reads.

mod defaults;
mod provider;
mod resolve;

pub use defaults::{CONFIG_FILES, DEFAULT_SOURCE_ROOT, ENV_PREFIX, default_externals};
pub use provider::{
    ConfigProvider, FileConfigProvider, ManifestConfigProvider, StaticConfigProvider,
    find_config_file,
};
pub use resolve::{CliOverrides, ConfigResolver, resolve_config};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::Format;
use crate::pipeline::{PluginOptions, Toggle};
use crate::plan::exclusion::ExclusionRule;
use crate::plan::target::{BinTargets, OutputTarget};

/// A module specifier pattern left out of the bundle.
///
/// Written as a plain string it matches the id exactly or as a package
/// prefix (`react` matches `react/jsx-runtime`); written as `/pattern/` it is
/// a regular expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExternalPattern {
    Package(String),
    Regex(Regex),
}

impl ExternalPattern {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(ExternalPattern::Regex)
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            ExternalPattern::Package(name) => {
                id == name
                    || id
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            ExternalPattern::Regex(re) => re.is_match(id),
        }
    }
}

impl TryFrom<String> for ExternalPattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(pattern) if !pattern.is_empty() => ExternalPattern::regex(pattern),
            _ => Ok(ExternalPattern::Package(value)),
        }
    }
}

impl From<ExternalPattern> for String {
    fn from(value: ExternalPattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExternalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalPattern::Package(name) => f.write_str(name),
            ExternalPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl PartialEq for ExternalPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExternalPattern::Package(a), ExternalPattern::Package(b)) => a == b,
            (ExternalPattern::Regex(a), ExternalPattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Shell commands run around the build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Per-field source file names for export targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportsMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<String>,
}

/// `exports` scope options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsOptions {
    #[serde(default)]
    pub src_dir: Option<String>,
    #[serde(default)]
    pub externals: Option<Vec<ExternalPattern>>,
    #[serde(default)]
    pub log_filter: Option<Vec<String>>,
    #[serde(default)]
    pub minify: Option<bool>,
    #[serde(default)]
    pub tsconfig: Option<String>,
    #[serde(default)]
    pub exclude: Vec<ExclusionRule>,
    #[serde(default)]
    pub matcher: ExportsMatcher,
    #[serde(flatten)]
    pub plugins: PluginOptions,
    /// Keys no field claimed; rejected when loading.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// `bin` scope options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinOptions {
    #[serde(default)]
    pub src_dir: Option<String>,
    #[serde(default)]
    pub externals: Option<Vec<ExternalPattern>>,
    #[serde(default)]
    pub log_filter: Option<Vec<String>>,
    #[serde(default)]
    pub minify: Option<bool>,
    #[serde(default)]
    pub tsconfig: Option<String>,
    /// Binary names to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Source file name used for every binary.
    #[serde(default)]
    pub matcher: Option<String>,
    #[serde(flatten)]
    pub plugins: PluginOptions,
    /// Keys no field claimed; rejected when loading.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// One explicit build unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryOptions {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub format: Option<Format>,
    #[serde(default)]
    pub externals: Option<Vec<ExternalPattern>>,
    #[serde(default)]
    pub log_filter: Option<Vec<String>>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub minify: Option<bool>,
    #[serde(default)]
    pub tsconfig: Option<String>,
    #[serde(flatten)]
    pub plugins: PluginOptions,
    /// Keys no field claimed; rejected when loading.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// User configuration as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default)]
    pub src_dir: Option<String>,
    #[serde(default)]
    pub exports: Option<Toggle<ExportsOptions>>,
    #[serde(default)]
    pub bin: Option<Toggle<BinOptions>>,
    #[serde(default)]
    pub entries: Option<Vec<EntryOptions>>,
    /// Added to the default externals.
    #[serde(default)]
    pub externals: Option<Vec<ExternalPattern>>,
    #[serde(default)]
    pub log_filter: Option<Vec<String>>,
    #[serde(default)]
    pub minify: Option<bool>,
    #[serde(default)]
    pub tsconfig: Option<String>,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(flatten)]
    pub plugins: PluginOptions,
    /// Keys no field claimed; rejected when loading.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl UserConfig {
    /// Dotted paths of every key no field claimed, nested scopes included.
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.unknown.keys().cloned().collect();
        if let Some(Toggle::Options(exports)) = &self.exports {
            keys.extend(exports.unknown.keys().map(|k| format!("exports.{k}")));
        }
        if let Some(Toggle::Options(bin)) = &self.bin {
            keys.extend(bin.unknown.keys().map(|k| format!("bin.{k}")));
        }
        for (index, entry) in self.entries.iter().flatten().enumerate() {
            keys.extend(entry.unknown.keys().map(|k| format!("entries[{index}].{k}")));
        }
        keys
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum ConfigSource {
    /// `--config <file>`.
    CliFile(PathBuf),
    /// `fob-pack.{toml,json,yaml}` in the project root.
    ConventionalFile(PathBuf),
    /// The `fobPack` field of `package.json`.
    Manifest,
    /// `exports`/`bin` of `package.json` alone.
    Auto,
    /// Supplied by a Rust caller.
    Programmatic,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliFile(path) | ConfigSource::ConventionalFile(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_else(|| path.to_string_lossy());
                f.write_str(&name)
            }
            ConfigSource::Manifest => f.write_str("package.json"),
            ConfigSource::Auto => f.write_str("auto"),
            ConfigSource::Programmatic => f.write_str("programmatic"),
        }
    }
}

/// Options shared by every planned scope after cascading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSettings {
    pub source_root: String,
    pub externals: Vec<ExternalPattern>,
    pub log_filter: Vec<String>,
    /// Plugin options with the minify/tsconfig cascade folded into
    /// `transpile`.
    pub plugins: PluginOptions,
}

/// Resolved `exports` scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsPlan {
    pub targets: IndexMap<String, OutputTarget>,
    pub matcher: ExportsMatcher,
    pub exclusions: Vec<ExclusionRule>,
    #[serde(flatten)]
    pub settings: ScopeSettings,
}

/// Resolved `bin` scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinPlan {
    pub targets: BinTargets,
    pub matcher: Option<String>,
    pub exclusions: Vec<String>,
    #[serde(flatten)]
    pub settings: ScopeSettings,
}

/// Resolved explicit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPlan {
    pub input: String,
    pub output: String,
    pub format: Format,
    pub banner: Option<String>,
    pub footer: Option<String>,
    #[serde(flatten)]
    pub settings: ScopeSettings,
}

/// The canonical configuration driving one build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    pub source: ConfigSource,
    pub root: PathBuf,
    pub source_root: String,
    /// `None` when exports are disabled or undeclared.
    pub exports: Option<ExportsPlan>,
    /// `None` when binaries are disabled or undeclared.
    pub bin: Option<BinPlan>,
    pub entries: Vec<EntryPlan>,
    pub externals: Vec<ExternalPattern>,
    pub log_filter: Vec<String>,
    pub plugins: PluginOptions,
    pub hooks: Hooks,
}

impl BuildConfiguration {
    /// Length of the longest output path that will be built, for aligning
    /// report columns.
    pub fn longest_output(&self) -> usize {
        use crate::plan::target::{is_declaration_path, is_path_allowed};

        let mut longest = 0;
        if let Some(exports) = &self.exports {
            for target in exports.targets.values() {
                for (field, path) in target.outputs() {
                    let allowed = match field {
                        crate::plan::target::TargetField::Types => is_declaration_path(path),
                        _ => is_path_allowed(path),
                    };
                    if allowed {
                        longest = longest.max(path.len());
                    }
                }
            }
        }
        if let Some(bin) = &self.bin {
            for (_, path) in bin.targets.entries() {
                if is_path_allowed(path) {
                    longest = longest.max(path.len());
                }
            }
        }
        for entry in &self.entries {
            longest = longest.max(entry.output.len());
        }
        longest
    }
}
