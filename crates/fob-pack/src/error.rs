//! Error types for fob-pack operations.

use std::path::PathBuf;

/// Error types for configuration resolution and build execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No configuration source could be resolved for the project.
    #[error("No configuration found in {}", .root.display())]
    ConfigurationNotFound { root: PathBuf },

    /// A configuration file exists (or was requested) but could not be loaded.
    #[error("Failed to load config {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    /// A configuration value is present but unusable.
    #[error("Invalid value for '{field}': {value}")]
    InvalidConfig {
        field: String,
        value: String,
        hint: String,
    },

    /// The package manifest could not be read or parsed.
    #[error("Invalid package manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    /// Bundling or writing a single build unit failed.
    #[error("Failed to build {unit} (from {}): {reason}", .input.display())]
    BuildUnit {
        unit: String,
        input: PathBuf,
        reason: String,
    },

    /// A lifecycle hook command failed.
    #[error("Hook '{name}' failed: {reason}")]
    Hook {
        name: String,
        command: String,
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fob-pack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::ConfigLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(
        field: impl Into<String>,
        value: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Error::InvalidConfig {
            field: field.into(),
            value: value.into(),
            hint: hint.into(),
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::ConfigurationNotFound { .. } => "CONFIG_NOT_FOUND",
            Error::ConfigLoad { .. } => "CONFIG_LOAD_ERROR",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::Manifest { .. } => "MANIFEST_ERROR",
            Error::BuildUnit { .. } => "BUILD_UNIT_ERROR",
            Error::Hook { .. } => "HOOK_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::ConfigurationNotFound { .. } => Some(Box::new(
                "Add `exports` or `bin` to package.json, a \"fobPack\" field, \
                 or create fob-pack.toml / fob-pack.json / fob-pack.yaml.",
            )),
            Error::ConfigLoad { .. } => Some(Box::new(
                "Check the config file for syntax errors and unknown keys.",
            )),
            Error::InvalidConfig { hint, .. } => Some(Box::new(hint.clone())),
            Error::Manifest { .. } => Some(Box::new("package.json must be valid JSON.")),
            Error::BuildUnit { input, .. } => Some(Box::new(format!(
                "Check that {} exists and compiles. Outputs written before this unit are kept.",
                input.display()
            ))),
            Error::Hook { command, .. } => Some(Box::new(format!(
                "The hook command `{}` must exit with status 0.",
                command
            ))),
            Error::Io(_) => None,
        }
    }
}
