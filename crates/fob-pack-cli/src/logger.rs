//! Logging setup for the fob-pack CLI.
//!
//! The library only emits `tracing` events; this module installs the
//! subscriber that prints them.
//!
//! ```rust,no_run
//! use fob_pack_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("Starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "fob_pack=debug,fob_pack_cli=debug";
const QUIET_FILTER: &str = "fob_pack=error,fob_pack_cli=error";
const DEFAULT_FILTER: &str = "fob_pack=info,fob_pack_cli=info";

/// Initialize the tracing subscriber.
///
/// The level is picked in this order:
/// 1. `--verbose`: debug for the fob-pack crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`, when set and valid
/// 4. info for the fob-pack crates
///
/// Must be called once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The subscriber is global, so only the filter selection is tested here.

    #[test]
    fn test_verbose_wins() {
        assert_eq!(filter_for(true, false).to_string(), EnvFilter::new(VERBOSE_FILTER).to_string());
    }

    #[test]
    fn test_quiet_filter() {
        assert_eq!(filter_for(false, true).to_string(), EnvFilter::new(QUIET_FILTER).to_string());
    }
}
