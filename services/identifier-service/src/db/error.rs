//! Database error types.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/identifier-service.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// Serialization failure or deadlock on a counter row; safe to retry.
    #[error("transient conflict on scope '{scope_key}'")]
    Conflict { scope_key: String },

    /// An identifier with this canonical code already exists.
    #[error("identifier '{0}' already exists")]
    DuplicateCode(String),

    /// A Serial referenced a LOT with no persisted row.
    #[error("LOT '{0}' does not exist")]
    UnknownLot(String),

    /// A stored row could not be decoded.
    #[error("corrupt identifier row for '{code}': {reason}")]
    CorruptRow { code: String, reason: String },
}

impl DbError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }
}

/// SQLSTATE codes Postgres uses for retryable transaction failures.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Returns the SQLSTATE of a database error, if any.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Maps retryable SQLSTATEs to [`DbError::Conflict`], everything else to `Query`.
pub(crate) fn classify(err: sqlx::Error, scope_key: &str) -> DbError {
    match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => DbError::Conflict {
            scope_key: scope_key.to_string(),
        },
        _ => DbError::Query(err),
    }
}
