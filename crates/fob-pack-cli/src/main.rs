//! fob-pack CLI entry point: parse flags, set up logging, run the build.

use clap::Parser;
use fob_pack_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    commands::build_execute(args)
        .await
        .map_err(error::cli_error_to_miette)
}
