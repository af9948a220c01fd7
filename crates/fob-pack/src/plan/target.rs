//! Output targets declared by `exports` and `bin`, and the path policy that
//! decides which declared outputs are buildable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Suffixes that mark a type declaration output.
pub const DECLARATION_SUFFIXES: [&str; 3] = [".d.ts", ".d.mts", ".d.cts"];

/// Extensions accepted for runtime outputs.
const RUNTIME_EXTENSIONS: [&str; 3] = [".js", ".mjs", ".cjs"];

/// One declared export: up to three independently buildable artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<String>,
}

impl OutputTarget {
    /// Target for a shorthand string export, classified by suffix.
    pub fn from_path(path: &str) -> Self {
        let mut target = Self::default();
        if is_declaration_path(path) {
            target.types = Some(path.to_string());
        } else if path.ends_with(".cjs") {
            target.require = Some(path.to_string());
        } else {
            target.import = Some(path.to_string());
        }
        target
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_none() && self.import.is_none() && self.require.is_none()
    }

    /// Declared outputs in build order: types, import, require.
    pub fn outputs(&self) -> impl Iterator<Item = (TargetField, &str)> {
        [
            (TargetField::Types, self.types.as_deref()),
            (TargetField::Import, self.import.as_deref()),
            (TargetField::Require, self.require.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, path)| path.map(|p| (field, p)))
    }

    pub(crate) fn clear(&mut self, field: TargetField) {
        match field {
            TargetField::Types => self.types = None,
            TargetField::Import => self.import = None,
            TargetField::Require => self.require = None,
        }
    }
}

/// Sub-field of an [`OutputTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetField {
    Types,
    Import,
    Require,
}

impl TargetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Types => "types",
            TargetField::Import => "import",
            TargetField::Require => "require",
        }
    }
}

/// Declared executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BinTargets {
    /// `"bin": "./dist/cli.mjs"`
    Single { name: String, path: String },
    /// `"bin": { "name": "./dist/cli.mjs" }`
    Named(IndexMap<String, String>),
}

impl BinTargets {
    /// `(name, path)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            BinTargets::Single { name, path } => vec![(name.as_str(), path.as_str())],
            BinTargets::Named(map) => map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BinTargets::Single { .. } => false,
            BinTargets::Named(map) => map.is_empty(),
        }
    }
}

/// Runtime outputs must be `./`-relative JavaScript files.
pub fn is_path_allowed(path: &str) -> bool {
    path.starts_with("./") && RUNTIME_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub fn is_declaration_path(path: &str) -> bool {
    DECLARATION_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Split a file name into stem and extension, treating declaration suffixes
/// as a single extension (`index.d.ts` → `index`, `.d.ts`).
pub fn split_extension(file_name: &str) -> (&str, &str) {
    if let Some(suffix) = DECLARATION_SUFFIXES
        .iter()
        .find(|suffix| file_name.ends_with(*suffix))
    {
        return file_name.split_at(file_name.len() - suffix.len());
    }
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => file_name.split_at(idx),
    }
}
