//! Decode, detect, display, and lookup commands.

use anyhow::Result;
use clap::Args;
use lotline_codec::{candidates, DecodeReport, Decoded, FormatVersion, VersionSource};
use serde::Serialize;

use crate::error::CliError;
use crate::output::{print_fields, print_output, print_single, print_warning, FieldRow};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Canonical LOT or Serial code.
    code: String,

    /// Decode with this format version instead of detecting it.
    #[arg(long)]
    format_version: Option<FormatVersion>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Canonical LOT or Serial code.
    code: String,
}

#[derive(Debug, Args)]
pub struct DisplayArgs {
    /// Canonical LOT or Serial code.
    code: String,

    /// Format with this version instead of detecting it.
    #[arg(long)]
    format_version: Option<FormatVersion>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Canonical LOT or Serial code.
    code: String,

    /// Override the stored version tag.
    #[arg(long)]
    format_version: Option<FormatVersion>,
}

/// Table rows for a decode report, local or from `/v1/codes`.
fn report_rows(report: &DecodeReport) -> Vec<FieldRow> {
    let mut rows = vec![FieldRow::new("Code", &report.serial_number)];
    if !report.valid {
        rows.push(FieldRow::new("Valid", "no"));
        if let Some(error) = &report.error {
            rows.push(FieldRow::new("Error", error));
        }
        return rows;
    }

    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    if let Some(version) = report.version {
        rows.push(FieldRow::new("Version", version));
    }
    if let Some(kind) = report.kind {
        rows.push(FieldRow::new("Kind", kind));
    }
    rows.push(FieldRow::new("Formatted", optional(&report.formatted)));
    if let Some(lot_code) = &report.lot_code {
        rows.push(FieldRow::new("LOT", lot_code));
    }
    if let Some(c) = &report.components {
        rows.push(FieldRow::new("Country", optional(&c.country_code)));
        rows.push(FieldRow::new("Line", &c.line_number));
        rows.push(FieldRow::new("Model", &c.model_code));
        rows.push(FieldRow::new("Month", &c.production_month));
        if let Some(day) = &c.production_day {
            rows.push(FieldRow::new("Day", day));
        }
        if let Some(shift) = &c.shift {
            rows.push(FieldRow::new("Shift", shift));
        }
        rows.push(FieldRow::new("Sequence", &c.sequence));
        if let Some(unit) = &c.unit_sequence {
            rows.push(FieldRow::new("Unit", unit));
        }
    }
    if let Some(date) = report.production_date {
        rows.push(FieldRow::new("Produced", date.date()));
    }
    if let Some(source) = &report.source {
        rows.push(FieldRow::new("Version source", source));
    }
    rows
}

/// Decode a code without contacting the service.
pub fn decode(ctx: CommandContext, args: DecodeArgs) -> Result<()> {
    let source = if args.format_version.is_some() {
        VersionSource::Explicit
    } else {
        VersionSource::Detected
    };
    let decoded =
        lotline_codec::decode(&args.code, args.format_version).map_err(CliError::from)?;
    let report = DecodeReport::decoded(decoded, source);
    print_fields(&report_rows(&report), &report, ctx.format);
    Ok(())
}

#[derive(Debug, Serialize)]
struct DetectReport {
    code: String,
    detected: Option<FormatVersion>,
    candidates: Vec<DetectRow>,
}

#[derive(Debug, Serialize, tabled::Tabled)]
struct DetectRow {
    #[tabled(rename = "Version")]
    version: FormatVersion,

    #[tabled(rename = "Parses")]
    parses: bool,

    #[tabled(rename = "Detail")]
    detail: String,
}

/// List every version whose grammar accepts the code's shape.
pub fn detect(ctx: CommandContext, args: DetectArgs) -> Result<()> {
    let rows: Vec<DetectRow> = candidates(&args.code)
        .into_iter()
        .map(|version| match Decoded::with_version(&args.code, version) {
            Ok(decoded) => DetectRow {
                version,
                parses: true,
                detail: format!("{} {}", decoded.kind(), decoded.formatted()),
            },
            Err(e) => DetectRow {
                version,
                parses: false,
                detail: e.to_string(),
            },
        })
        .collect();

    let report = DetectReport {
        detected: rows.first().map(|r| r.version),
        code: args.code,
        candidates: rows,
    };

    match ctx.format {
        crate::output::OutputFormat::Table => {
            print_output(&report.candidates, ctx.format);
            if report.candidates.iter().filter(|r| r.parses).count() > 1 {
                print_warning("code parses under several versions; use the stored tag");
            }
        }
        crate::output::OutputFormat::Json => print_single(&report),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DisplayReport {
    code: String,
    version: FormatVersion,
    formatted: String,
}

/// Print the display form of a code.
pub fn display(ctx: CommandContext, args: DisplayArgs) -> Result<()> {
    let version = match args.format_version {
        Some(v) => v,
        None => lotline_codec::decode(&args.code, None)
            .map_err(CliError::from)?
            .version,
    };
    let formatted = version.display(&args.code).map_err(|e| CliError::Decode(e.into()))?;

    match ctx.format {
        crate::output::OutputFormat::Table => println!("{formatted}"),
        crate::output::OutputFormat::Json => print_single(&DisplayReport {
            code: args.code,
            version,
            formatted,
        }),
    }
    Ok(())
}

/// Decode a code on the service.
pub async fn lookup(ctx: CommandContext, args: LookupArgs) -> Result<()> {
    let client = ctx.client()?;
    let query: Vec<(&str, String)> = args
        .format_version
        .map(|v| ("version", v.tag().to_string()))
        .into_iter()
        .collect();

    let report: DecodeReport = client.get(&["v1", "codes", args.code.as_str()], &query).await?;
    print_fields(&report_rows(&report), &report, ctx.format);
    Ok(())
}
