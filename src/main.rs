use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sill_catalog::app::{run, Command, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "sill-catalog", version, about = "Browse and filter the software catalog")]
struct Cli {
    #[arg(long, help = "Enable verbose debug logs")]
    debug: bool,
    #[arg(long, help = "Path to config.toml")]
    config: Option<PathBuf>,
    #[arg(long, help = "Read the catalog from a JSON file instead of the API")]
    file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(RunOptions {
        debug: cli.debug,
        config: cli.config,
        file: cli.file,
        command: cli.command,
    })
}
