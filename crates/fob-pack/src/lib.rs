#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-pack
//!
//! Config-driven package builds on rolldown.
//!
//! A project describes what it publishes in `package.json` (`exports`,
//! `bin`) and optionally in a `fob-pack.{toml,json,yaml}` file or the
//! `fobPack` manifest field. fob-pack resolves that into one
//! [`BuildConfiguration`], infers a source file for every declared output and
//! builds each output as its own unit: ESM, CJS or type declarations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fob_pack::{BuildPlanExecutor, CliOverrides, RolldownEngine, resolve_config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::env::current_dir()?;
//! let config = resolve_config(&root, &CliOverrides::default()).await?;
//!
//! let report = BuildPlanExecutor::new(RolldownEngine::new())
//!     .execute(&config)
//!     .await?;
//! println!("{} units, {} bytes", report.stats.unit_count, report.stats.total_bytes);
//! # Ok(()) }
//! ```
//!
//! ### Programmatic configuration
//!
//! Custom rolldown plugins can only be supplied from Rust, through a
//! [`StaticConfigProvider`]:
//!
//! ```no_run
//! use fob_pack::config::{ConfigResolver, StaticConfigProvider, UserConfig};
//! use fob_pack::pipeline::{CustomPlugin, ExtraPlugins};
//! # use std::borrow::Cow;
//! # #[derive(Debug)]
//! # struct Banner;
//! # impl rolldown_plugin::Plugin for Banner {
//! #     fn name(&self) -> Cow<'static, str> { "banner".into() }
//! #     fn register_hook_usage(&self) -> rolldown_plugin::HookUsage { rolldown_plugin::HookUsage::empty() }
//! # }
//!
//! # async fn run() -> fob_pack::Result<()> {
//! let mut config = UserConfig::default();
//! config.plugins.extra = ExtraPlugins::Around {
//!     start: vec![CustomPlugin::new(Banner)],
//!     end: Vec::new(),
//! };
//! let resolved = ConfigResolver::new(".")
//!     .with_provider(StaticConfigProvider::new(config))
//!     .resolve()
//!     .await?;
//! # let _ = resolved;
//! # Ok(()) }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod log_filter;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod stats;

pub use config::{
    BuildConfiguration, CliOverrides, ConfigResolver, ConfigSource, UserConfig, resolve_config,
};
pub use engine::{BundleEngine, BundleGraph, EngineLog, Format, RolldownEngine};
pub use error::{Error, Result};
pub use executor::{
    BuildEvent, BuildObserver, BuildPlanExecutor, BuildReport, BuildUnit, NoopObserver, Phase,
    UnitReport,
};
pub use hooks::{HookPoint, run_hook};
pub use pipeline::{Pipeline, build_declaration_pipeline, build_pipeline};
pub use plan::{apply_exclusions, infer_input_path};
pub use stats::{BundleStats, StatsReporter};
