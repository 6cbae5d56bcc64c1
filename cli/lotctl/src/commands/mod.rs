//! CLI commands.

mod codes;
mod mint;
mod scope;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::OutputFormat;

/// lotline CLI - decode, mint, and inspect LOT and Serial codes.
#[derive(Debug, Parser)]
#[command(name = "lotctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Base URL of the lotline service.
    #[arg(long, global = true, env = "LOTCTL_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode a code locally.
    Decode(codes::DecodeArgs),

    /// Show which format versions accept a code's shape.
    Detect(codes::DetectArgs),

    /// Print the hyphenated display form of a code.
    Display(codes::DisplayArgs),

    /// Decode a code on the service, using its stored version tag.
    Lookup(codes::LookupArgs),

    /// Mint LOT or Serial codes.
    Mint(mint::MintCommand),

    /// Inspect a sequence counter.
    Scope(scope::ScopeArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let format = OutputFormat::parse(&self.format);
        let config = Config::load()?.with_api_url(self.api_url);
        let ctx = CommandContext { config, format };

        match self.command {
            Commands::Decode(args) => codes::decode(ctx, args),
            Commands::Detect(args) => codes::detect(ctx, args),
            Commands::Display(args) => codes::display(ctx, args),
            Commands::Lookup(args) => codes::lookup(ctx, args).await,
            Commands::Mint(cmd) => cmd.run(ctx).await,
            Commands::Scope(args) => scope::show(ctx, args).await,
            Commands::Version => {
                println!("lotctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Get an API client for the configured service.
    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mint_lot() {
        let cli = Cli::try_parse_from([
            "lotctl",
            "--format",
            "json",
            "mint",
            "lot",
            "--line",
            "KR001",
            "--model",
            "PSA10",
            "--date",
            "2025-11-15",
        ])
        .unwrap();
        assert_eq!(cli.format, "json");
        assert!(matches!(cli.command, Commands::Mint(_)));
    }

    #[test]
    fn test_parse_decode_with_version() {
        let cli = Cli::try_parse_from([
            "lotctl",
            "decode",
            "KR001251101001",
            "--format-version",
            "1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Decode(_)));
        assert!(Cli::try_parse_from(["lotctl", "decode", "X", "--format-version", "9"]).is_err());
    }
}
