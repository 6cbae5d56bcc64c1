//! Postgres-backed sequence counters.
//!
//! Each scope is one row in `sequence_counters`. Issuing a value is a single
//! upsert that only advances the row while it is below capacity, so two
//! callers can never read the same `last_issued`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use tracing::debug;

use super::error::classify;
use super::{CounterStore, DbError, ScopeCounter};

/// Row from the sequence_counters table.
#[derive(Debug)]
struct CounterRow {
    scope_key: String,
    last_issued: i16,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CounterRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            scope_key: row.try_get("scope_key")?,
            last_issued: row.try_get("last_issued")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_sequence(scope_key: &str, value: i16) -> Result<u16, DbError> {
    u16::try_from(value).map_err(|_| DbError::CorruptRow {
        code: scope_key.to_string(),
        reason: format!("negative counter {value}"),
    })
}

/// Sequence counters in Postgres.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(&self, scope_key: &str, capacity: u16) -> Result<Option<u16>, DbError> {
        let capacity = i16::try_from(capacity).unwrap_or(i16::MAX);

        // The WHERE on the conflict arm leaves an exhausted row untouched,
        // which makes RETURNING yield no row.
        let issued = sqlx::query_scalar::<_, i16>(
            r#"
            INSERT INTO sequence_counters (scope_key, last_issued)
            VALUES ($1, 1)
            ON CONFLICT (scope_key) DO UPDATE
                SET last_issued = sequence_counters.last_issued + 1,
                    updated_at = now()
                WHERE sequence_counters.last_issued < $2
            RETURNING last_issued
            "#,
        )
        .bind(scope_key)
        .bind(capacity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, scope_key))?;

        debug!(scope_key = %scope_key, issued = ?issued, "Counter increment");

        issued.map(|v| to_sequence(scope_key, v)).transpose()
    }

    async fn counter(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            SELECT scope_key, last_issued, updated_at
            FROM sequence_counters
            WHERE scope_key = $1
            "#,
        )
        .bind(scope_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(|r| {
            Ok(ScopeCounter {
                last_issued: to_sequence(&r.scope_key, r.last_issued)?,
                scope_key: r.scope_key,
                updated_at: r.updated_at,
            })
        })
        .transpose()
    }
}
