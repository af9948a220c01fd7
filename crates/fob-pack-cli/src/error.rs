//! Error handling for the fob-pack CLI.
//!
//! Library failures keep their own [`fob_pack::Error`] type, which already
//! carries a diagnostic code and help text; the CLI only adds the few
//! failures that can happen outside the library.

use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration resolution, planning or a build unit failed.
    #[error(transparent)]
    Pack(#[from] fob_pack::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors outside the build itself
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resolved configuration could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a [`CliError`] into a report for `main`.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Pack(e) => miette::Report::new(e),
        other => miette::miette!("{}", other),
    }
}
