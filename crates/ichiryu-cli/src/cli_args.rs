use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ichiryu",
    about = "IRC channel logger and card-lookup bot",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Connect to the configured server and run until interrupted.
    Run {
        #[arg(long, env = "ICHIRYU_CONFIG", value_name = "PATH")]
        config: PathBuf,
    },
    /// Store the contents of a text file as a named text-art entry.
    ArtAdd {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long, default_value = "ascii_art.json", value_name = "PATH")]
        catalog: PathBuf,
    },
    /// Build the name index from the catalog and write the binary cache.
    IndexBuild {
        #[arg(long, default_value = "mtg_cards.json", value_name = "PATH")]
        catalog: PathBuf,
        #[arg(long, default_value = "mtg.cache", value_name = "PATH")]
        cache: PathBuf,
    },
}
