use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use lotline_codec::{FormatVersion, ModelCodeMap};

use crate::allocator::AllocatorConfig;
use crate::db::DbConfig;

/// Model table compiled into the binary, used when `LOTLINE_MODEL_MAP` is unset.
const DEFAULT_MODEL_MAP: &str = include_str!("../models.toml");

/// Backing store for counters and identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend '{other}' (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub store: StoreBackend,
    pub database: DbConfig,
    pub active_format: FormatVersion,
    pub model_map: Option<PathBuf>,
    pub allocator: AllocatorConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("LOTLINE_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = std::env::var("LOTLINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("LOTLINE_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let store = std::env::var("LOTLINE_STORE")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let active_format = match std::env::var("LOTLINE_ACTIVE_FORMAT") {
            Ok(v) => parse_active_format(&v)?,
            Err(_) => FormatVersion::V2,
        };

        let model_map = std::env::var("LOTLINE_MODEL_MAP").ok().map(PathBuf::from);

        let defaults = AllocatorConfig::default();
        let max_attempts = std::env::var("LOTLINE_ALLOC_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);
        let backoff = std::env::var("LOTLINE_ALLOC_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);

        let database = DbConfig::from_env();

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            store,
            database,
            active_format,
            model_map,
            allocator: AllocatorConfig {
                max_attempts,
                backoff,
            },
        })
    }

    /// Loads the model table from `LOTLINE_MODEL_MAP`, or the built-in one.
    pub fn load_model_map(&self) -> Result<ModelCodeMap> {
        match &self.model_map {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read model map {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("invalid model map {}", path.display()))
            }
            None => toml::from_str(DEFAULT_MODEL_MAP).context("invalid built-in model map"),
        }
    }
}

/// New codes may only be minted under the compact grammars.
fn parse_active_format(raw: &str) -> Result<FormatVersion> {
    let version: FormatVersion = raw
        .parse()
        .with_context(|| format!("invalid LOTLINE_ACTIVE_FORMAT '{raw}'"))?;
    if version.is_legacy() {
        bail!("LOTLINE_ACTIVE_FORMAT cannot be {version}: the legacy format is read-only");
    }
    Ok(version)
}
