//! Command implementations.
//!
//! fob-pack currently has one command, [`build`]; it exposes an `execute`
//! function taking the parsed arguments.

pub mod build;

pub use build::execute as build_execute;
