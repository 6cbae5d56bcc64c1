//! Sequence counter inspection.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use lotline_codec::SEQUENCE_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::output::{print_fields, FieldRow};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Scope key, e.g. lot:KR001:PSA:2025-11, lot:v1:01:PSA:2025-11, or
    /// serial:v2:KR01PSA2511001.
    scope_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScopeCounter {
    scope_key: String,
    last_issued: u16,
    updated_at: DateTime<Utc>,
    #[serde(default = "default_capacity")]
    capacity: u16,
}

fn default_capacity() -> u16 {
    SEQUENCE_CAPACITY
}

/// Show a scope's counter.
pub async fn show(ctx: CommandContext, args: ScopeArgs) -> Result<()> {
    let client = ctx.client()?;

    let counter: ScopeCounter = client
        .get(&["v1", "scopes", args.scope_key.as_str()], &[])
        .await
        .map_err(|e| match e {
            CliError::Api { status: 404, .. } => {
                CliError::NotFound(format!("Nothing issued in scope '{}'", args.scope_key))
            }
            other => other,
        })?;

    let rows = vec![
        FieldRow::new("Scope", &counter.scope_key),
        FieldRow::new("Last issued", counter.last_issued),
        FieldRow::new("Remaining", counter.capacity.saturating_sub(counter.last_issued)),
        FieldRow::new("Updated", counter.updated_at.to_rfc3339()),
    ];
    print_fields(&rows, &counter, ctx.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_response() {
        let counter: ScopeCounter = serde_json::from_value(serde_json::json!({
            "scope_key": "lot:v1:01:PSA:2025-11",
            "last_issued": 40,
            "updated_at": "2025-11-15T08:00:00Z",
            "capacity": 99
        }))
        .unwrap();
        assert_eq!(counter.capacity.saturating_sub(counter.last_issued), 59);
    }

    #[test]
    fn test_capacity_defaults_when_absent() {
        let counter: ScopeCounter = serde_json::from_value(serde_json::json!({
            "scope_key": "lot:KR001:PSA:2025-11",
            "last_issued": 1,
            "updated_at": "2025-11-15T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(counter.capacity, SEQUENCE_CAPACITY);
    }
}
