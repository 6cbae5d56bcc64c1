//! Postgres-backed identifier records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lotline_codec::{CodeKind, FormatVersion, LotIdentifier, SerialIdentifier};
use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use tracing::debug;

use super::error::{sqlstate, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use super::{DbError, IdentifierStore, StoredIdentifier};

/// Row from either identifier table.
#[derive(Debug)]
struct IdentifierRow {
    canonical_code: String,
    format_version: i16,
    lot_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for IdentifierRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            canonical_code: row.try_get("canonical_code")?,
            format_version: row.try_get("format_version")?,
            lot_code: row.try_get("lot_code")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<IdentifierRow> for StoredIdentifier {
    type Error = DbError;

    fn try_from(row: IdentifierRow) -> Result<Self, Self::Error> {
        let format_version =
            FormatVersion::from_tag(row.format_version).ok_or_else(|| DbError::CorruptRow {
                code: row.canonical_code.clone(),
                reason: format!("unknown format version {}", row.format_version),
            })?;
        let kind = if row.lot_code.is_some() {
            CodeKind::Serial
        } else {
            CodeKind::Lot
        };
        Ok(StoredIdentifier {
            canonical_code: row.canonical_code,
            format_version,
            kind,
            lot_code: row.lot_code,
            created_at: row.created_at,
        })
    }
}

/// Maps insert failures onto the identifier-specific variants.
fn insert_error(err: sqlx::Error, code: &str, lot_code: Option<&str>) -> DbError {
    match (sqlstate(&err).as_deref(), lot_code) {
        (Some(UNIQUE_VIOLATION), _) => DbError::DuplicateCode(code.to_string()),
        (Some(FOREIGN_KEY_VIOLATION), Some(lot)) => DbError::UnknownLot(lot.to_string()),
        _ => DbError::Query(err),
    }
}

/// Identifier records in Postgres.
#[derive(Clone)]
pub struct PgIdentifierStore {
    pool: PgPool,
}

impl PgIdentifierStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentifierStore for PgIdentifierStore {
    async fn insert_lot(&self, lot: &LotIdentifier) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO lot_identifiers (canonical_code, format_version)
            VALUES ($1, $2)
            "#,
        )
        .bind(lot.code())
        .bind(lot.version().tag())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, lot.code(), None))?;

        debug!(code = %lot.code(), version = %lot.version(), "Stored LOT");
        Ok(())
    }

    async fn insert_serial(&self, serial: &SerialIdentifier) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO serial_identifiers (canonical_code, format_version, lot_code)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(serial.code())
        .bind(serial.version().tag())
        .bind(serial.lot_code())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, serial.code(), Some(serial.lot_code())))?;

        debug!(code = %serial.code(), lot_code = %serial.lot_code(), "Stored Serial");
        Ok(())
    }

    async fn find(&self, code: &str) -> Result<Option<StoredIdentifier>, DbError> {
        let row = sqlx::query_as::<_, IdentifierRow>(
            r#"
            SELECT canonical_code, format_version, NULL::TEXT AS lot_code, created_at
            FROM lot_identifiers
            WHERE canonical_code = $1
            UNION ALL
            SELECT canonical_code, format_version, lot_code, created_at
            FROM serial_identifiers
            WHERE canonical_code = $1
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(StoredIdentifier::try_from).transpose()
    }
}
