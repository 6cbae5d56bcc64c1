//! lotctl - CLI for the lotline identifier service
//!
//! Decodes codes locally and talks to a running `lotline` service for
//! minting, stored-tag lookups, and counter inspection.

use anyhow::Result;
use clap::Parser;

mod client;
mod commands;
mod config;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
