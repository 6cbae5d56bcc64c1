//! Minting commands.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use lotline_codec::FormatVersion;
use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::output::{print_fields, print_success, FieldRow, OutputFormat};

use super::CommandContext;

/// Mint commands.
#[derive(Debug, Args)]
pub struct MintCommand {
    #[command(subcommand)]
    command: MintSubcommand,
}

#[derive(Debug, Subcommand)]
enum MintSubcommand {
    /// Mint the next LOT for a line, model, and month.
    Lot(MintLotArgs),

    /// Mint the next Serial of an existing LOT.
    Serial(MintSerialArgs),
}

#[derive(Debug, Args)]
struct MintLotArgs {
    /// Production line, e.g. KR001.
    #[arg(long)]
    line: String,

    /// Full model name as listed in the service's model table.
    #[arg(long)]
    model: String,

    /// Any day in the production month (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
}

#[derive(Debug, Args)]
struct MintSerialArgs {
    /// Canonical code of the LOT.
    lot_code: String,
}

impl MintCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            MintSubcommand::Lot(args) => mint_lot(ctx, args).await,
            MintSubcommand::Serial(args) => mint_serial(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize)]
struct MintLotRequest {
    line: String,
    model: String,
    target_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
struct LotResponse {
    code: String,
    formatted: String,
    version: FormatVersion,
    sequence: u16,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerialResponse {
    code: String,
    formatted: String,
    version: FormatVersion,
    lot_code: String,
    unit_sequence: u16,
}

async fn mint_lot(ctx: CommandContext, args: MintLotArgs) -> Result<()> {
    let client = ctx.client()?;
    let request = MintLotRequest {
        line: args.line,
        model: args.model,
        target_date: args.date,
    };

    let lot: LotResponse = client.post(&["v1", "lots"], &request).await?;

    if ctx.format == OutputFormat::Table {
        print_success(&format!("Minted LOT {}", lot.code));
    }
    let rows = vec![
        FieldRow::new("Code", &lot.code),
        FieldRow::new("Formatted", &lot.formatted),
        FieldRow::new("Version", lot.version),
        FieldRow::new("Sequence", lot.sequence),
    ];
    print_fields(&rows, &lot, ctx.format);
    Ok(())
}

async fn mint_serial(ctx: CommandContext, args: MintSerialArgs) -> Result<()> {
    let client = ctx.client()?;

    let serial: SerialResponse = client
        .post(
            &["v1", "lots", args.lot_code.as_str(), "serials"],
            &serde_json::json!({}),
        )
        .await
        .map_err(|e| match e {
            CliError::Api { status: 404, .. } => {
                CliError::NotFound(format!("LOT '{}' not found", args.lot_code))
            }
            other => other,
        })?;

    if ctx.format == OutputFormat::Table {
        print_success(&format!("Minted Serial {}", serial.code));
    }
    let rows = vec![
        FieldRow::new("Code", &serial.code),
        FieldRow::new("Formatted", &serial.formatted),
        FieldRow::new("Version", serial.version),
        FieldRow::new("LOT", &serial.lot_code),
        FieldRow::new("Unit", serial.unit_sequence),
    ];
    print_fields(&rows, &serial, ctx.format);
    Ok(())
}
