//! Persistence for sequence counters and minted identifiers.
//!
//! Two seams are defined here:
//! - [`CounterStore`]: the single atomic increment-with-cap per scope
//! - [`IdentifierStore`]: canonical codes with their format version tag
//!
//! Postgres implementations live in `counters` and `identifiers`; the
//! in-memory implementations in `memory` back tests and `LOTLINE_STORE=memory`.

mod counters;
mod error;
mod identifiers;
mod memory;

pub use counters::PgCounterStore;
pub use error::DbError;
pub use identifiers::PgIdentifierStore;
pub use memory::{MemoryCounterStore, MemoryIdentifierStore};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lotline_codec::{CodeKind, FormatVersion, LotIdentifier, SerialIdentifier};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Per-scope sequence counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Advances the counter for `scope_key` by one unless it already equals
    /// `capacity`, creating the row on first use.
    ///
    /// Returns the newly issued value, or `None` when the scope is exhausted.
    async fn increment(&self, scope_key: &str, capacity: u16) -> Result<Option<u16>, DbError>;

    /// Reads the counter without advancing it.
    async fn counter(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError>;
}

/// Minted identifiers keyed by canonical code.
#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Persists a LOT. Fails with [`DbError::DuplicateCode`] if the code exists.
    async fn insert_lot(&self, lot: &LotIdentifier) -> Result<(), DbError>;

    /// Persists a Serial. Its LOT must already be stored.
    async fn insert_serial(&self, serial: &SerialIdentifier) -> Result<(), DbError>;

    /// Looks up a LOT or Serial by its exact canonical code.
    async fn find(&self, code: &str) -> Result<Option<StoredIdentifier>, DbError>;
}

/// A counter row as seen by operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeCounter {
    pub scope_key: String,
    pub last_issued: u16,
    pub updated_at: DateTime<Utc>,
}

/// A persisted identifier and its authoritative version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentifier {
    pub canonical_code: String,
    pub format_version: FormatVersion,
    pub kind: CodeKind,
    /// Set for Serials only.
    pub lot_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Counter and identifier stores sharing one backend.
#[derive(Clone)]
pub struct Stores {
    pub counters: Arc<dyn CounterStore>,
    pub identifiers: Arc<dyn IdentifierStore>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    pub fn memory() -> Self {
        let counters = Arc::new(MemoryCounterStore::new());
        let identifiers = Arc::new(MemoryIdentifierStore::new());
        Self {
            counters,
            identifiers,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/lotline";

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    /// Run pending migrations from the first migrations directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/identifier-service/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get a counter store handle.
    pub fn counter_store(&self) -> PgCounterStore {
        PgCounterStore::new(self.pool.clone())
    }

    /// Get an identifier store handle.
    pub fn identifier_store(&self) -> PgIdentifierStore {
        PgIdentifierStore::new(self.pool.clone())
    }

    /// Both stores as trait objects.
    pub fn stores(&self) -> Stores {
        Stores {
            counters: Arc::new(self.counter_store()),
            identifiers: Arc::new(self.identifier_store()),
        }
    }
}
