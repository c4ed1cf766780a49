//! readlist CLI: keep a reading list in an Org-mode outline.
//!
//! Adds book entries (by hand or from an ISBN lookup), files them under
//! categories, and tracks ratings and reading progress.

mod commands;
mod prompt;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
