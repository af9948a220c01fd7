//! `package.json` reading.
//!
//! Only the fields the build plan needs are modeled: `name`, `exports`, `bin`,
//! `dependencies` and the embedded `fobPack` configuration block. The loose
//! shorthand forms npm allows are captured as sum types here and normalized
//! into [`OutputTarget`]s once, so nothing downstream re-derives their shape.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::plan::target::{BinTargets, OutputTarget};

/// Manifest file name probed in the project root.
pub const MANIFEST_FILE: &str = "package.json";

/// The subset of `package.json` consumed by the build plan.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exports: Option<ManifestExports>,
    #[serde(default)]
    pub bin: Option<ManifestBin>,
    #[serde(default)]
    pub dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub fob_pack: Option<serde_json::Value>,
}

/// `exports` as written in the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestExports {
    /// `"exports": "./dist/index.mjs"`
    Path(String),
    /// Either a subpath map (`"."`, `"./utils"`) or a bare conditions object.
    Map(IndexMap<String, ExportValue>),
}

/// Value of one `exports` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExportValue {
    Path(String),
    Conditions(IndexMap<String, ExportValue>),
}

/// `bin` as written in the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestBin {
    /// `"bin": "./dist/cli.mjs"`, named after the package.
    Path(String),
    /// `"bin": { "tool": "./dist/cli.mjs" }`
    Map(IndexMap<String, String>),
}

impl Manifest {
    /// Read `package.json` from `root`. A missing manifest reads as empty.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No package.json, using empty manifest");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Self::parse(&raw, path)
    }

    /// Parse manifest JSON. `path` is only used for error reporting.
    pub fn parse(raw: &str, path: impl Into<PathBuf>) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Manifest {
            path: path.into(),
            reason: e.to_string(),
        })
    }

    /// Whether the manifest declares anything buildable on its own.
    pub fn declares_targets(&self) -> bool {
        self.exports.is_some() || self.bin.is_some()
    }

    /// Keys of `dependencies`, in declaration order.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    /// Normalized export targets keyed by export subpath.
    pub fn export_targets(&self) -> IndexMap<String, OutputTarget> {
        let mut targets = IndexMap::new();
        match &self.exports {
            None => {}
            Some(ManifestExports::Path(path)) => {
                targets.insert(".".to_string(), OutputTarget::from_path(path));
            }
            Some(ManifestExports::Map(map)) => {
                if map.keys().any(|k| k.starts_with('.')) {
                    for (key, value) in map {
                        if !key.starts_with('.') {
                            tracing::warn!(key = %key, "Ignoring exports key mixed with subpaths");
                            continue;
                        }
                        targets.insert(key.clone(), target_from_value(value));
                    }
                } else {
                    targets.insert(".".to_string(), target_from_conditions(map));
                }
            }
        }
        targets
    }

    /// Normalized binary targets.
    pub fn bin_targets(&self) -> Option<BinTargets> {
        match &self.bin {
            None => None,
            Some(ManifestBin::Path(path)) => {
                let name = self
                    .name
                    .as_deref()
                    .map(bin_name_from_package)
                    .unwrap_or("bin")
                    .to_string();
                Some(BinTargets::Single {
                    name,
                    path: path.clone(),
                })
            }
            Some(ManifestBin::Map(map)) => Some(BinTargets::Named(map.clone())),
        }
    }
}

/// `@scope/tool` installs its bin as `tool`.
fn bin_name_from_package(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn target_from_value(value: &ExportValue) -> OutputTarget {
    match value {
        ExportValue::Path(path) => OutputTarget::from_path(path),
        ExportValue::Conditions(conditions) => target_from_conditions(conditions),
    }
}

fn target_from_conditions(conditions: &IndexMap<String, ExportValue>) -> OutputTarget {
    let mut target = OutputTarget::default();
    let default = conditions.get("default").and_then(condition_path);

    target.types = conditions
        .get("types")
        .and_then(condition_path)
        .or_else(|| nested_types(conditions));
    target.import = conditions
        .get("import")
        .and_then(condition_path)
        .or_else(|| default.clone().filter(|p| !p.ends_with(".cjs")));
    target.require = conditions
        .get("require")
        .and_then(condition_path)
        .or_else(|| default.filter(|p| p.ends_with(".cjs")));
    target
}

/// `types` nested under `import` or `require`. A target holds one
/// declaration output, so `import` wins and the other is reported.
fn nested_types(conditions: &IndexMap<String, ExportValue>) -> Option<String> {
    let nested = |field: &str| match conditions.get(field) {
        Some(ExportValue::Conditions(nested)) => nested.get("types").and_then(condition_path),
        _ => None,
    };
    let import = nested("import");
    let require = nested("require");
    match (import, require) {
        (Some(import), Some(require)) => {
            if import != require {
                tracing::warn!(
                    kept = %import,
                    dropped = %require,
                    "Only one nested `types` condition per export is built"
                );
            }
            Some(import)
        }
        (import, require) => import.or(require),
    }
}

/// Resolve a condition value to a runtime path. Nested conditions such as
/// `"import": { "types": "...", "default": "..." }` resolve to their `default`.
fn condition_path(value: &ExportValue) -> Option<String> {
    match value {
        ExportValue::Path(path) => Some(path.clone()),
        ExportValue::Conditions(nested) => nested.get("default").and_then(condition_path),
    }
}
