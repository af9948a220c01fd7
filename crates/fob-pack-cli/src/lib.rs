//! fob-pack CLI - build a package from its package.json.
//!
//! A thin layer over the [`fob_pack`] library:
//!
//! - [`cli`] - flag definitions (clap)
//! - [`commands`] - the build command
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - colored status lines and size/duration formatting

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
