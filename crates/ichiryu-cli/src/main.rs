mod bootstrap;
mod cli_args;
mod commands;
mod settings;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap::init_tracing;
use crate::cli_args::{Cli, CliCommand};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        CliCommand::Run { config } => commands::run_bot(&config).await,
        CliCommand::ArtAdd {
            file,
            name,
            catalog,
        } => commands::art_add(&file, &name, &catalog).map(|_| ()),
        CliCommand::IndexBuild { catalog, cache } => {
            commands::index_build(&catalog, &cache).map(|_| ())
        }
    }
}
