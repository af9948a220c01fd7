//! Command-line interface definition for fob-pack.
//!
//! fob-pack has a single command: resolve the project configuration and
//! build everything it declares. The flags only adjust where configuration
//! comes from and how much is printed.


use std::path::PathBuf;

use clap::Parser;
use fob_pack::CliOverrides;

/// fob-pack - build a package from its package.json
#[derive(Parser, Debug)]
#[command(
    name = "fob-pack",
    version,
    about = "Build a JavaScript/TypeScript package from its package.json",
    long_about = "fob-pack reads the `exports` and `bin` fields of package.json, infers a source\n\
                  file for every declared output and builds each one as ESM, CommonJS or type\n\
                  declarations. Extra settings come from fob-pack.{toml,json,yaml}, the `fobPack`\n\
                  field of package.json, or the file given with --config."
)]
pub struct Cli {
    /// Configuration file to use instead of the conventional ones
    ///
    /// Relative paths are resolved against the project root. When given,
    /// no other configuration source is consulted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit without building
    #[arg(long)]
    pub print_config: bool,

    /// Minify every output unless a scope sets `minify` itself
    #[arg(long)]
    pub minify: bool,

    /// tsconfig.json used by the transpile stage
    #[arg(long, value_name = "FILE")]
    pub tsconfig: Option<String>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    ///
    /// Shows every planned unit, the inferred source files and the plugin
    /// pipeline of each unit.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Flag values that feed configuration resolution.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            minify: self.minify.then_some(true),
            tsconfig: self.tsconfig.clone(),
        }
    }
}
