//! Sequence allocation per scope.
//!
//! A scope is the key space a counter is kept over: LOTs count within a
//! (line, model, month) triple and Serials count within their LOT. A scope
//! is built from the fields its grammar actually writes, so two scopes never
//! mint the same code, and its capacity is capped by the grammar's sequence
//! width. The allocator only retries transient store conflicts; exhaustion
//! is final.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lotline_codec::{
    CodeKind, FormatVersion, LineCode, LotIdentifier, ModelCode, YearMonth, SEQUENCE_CAPACITY,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{CounterStore, DbError, ScopeCounter};

/// The key space a sequence counter is maintained over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AllocationScope {
    /// LOTs for one production line, model, and month under `version`.
    Lot {
        version: FormatVersion,
        line: LineCode,
        model: ModelCode,
        month: YearMonth,
    },
    /// Units within one LOT. The version is part of the key so codes that
    /// read alike under two grammars never share a counter.
    Serial { lot: LotIdentifier },
}

impl AllocationScope {
    pub fn lot(version: FormatVersion, line: LineCode, model: ModelCode, month: YearMonth) -> Self {
        AllocationScope::Lot {
            version,
            line,
            model,
            month,
        }
    }

    pub fn serial(lot: &LotIdentifier) -> Self {
        AllocationScope::Serial { lot: lot.clone() }
    }

    /// Stable string key persisted in `sequence_counters`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Capacity of the scope a persisted key names. Keys that do not carry
    /// a version tag belong to the full-width grammars.
    pub fn capacity_of_key(scope_key: &str) -> u16 {
        let mut parts = scope_key.splitn(3, ':');
        let kind = match parts.next() {
            Some("lot") => CodeKind::Lot,
            Some("serial") => CodeKind::Serial,
            _ => return SEQUENCE_CAPACITY,
        };
        parts
            .next()
            .and_then(|segment| segment.strip_prefix('v'))
            .and_then(|tag| tag.parse::<FormatVersion>().ok())
            .map_or(SEQUENCE_CAPACITY, |version| version.sequence_capacity(kind))
    }

    /// Largest sequence the scope's grammar can write.
    pub fn capacity(&self) -> u16 {
        match self {
            AllocationScope::Lot { version, .. } => version.sequence_capacity(CodeKind::Lot),
            AllocationScope::Serial { lot } => lot.version().sequence_capacity(CodeKind::Serial),
        }
    }
}

impl fmt::Display for AllocationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationScope::Lot {
                version,
                line,
                model,
                month,
            } => {
                if version.has_country() {
                    write!(f, "lot:{line}:{model}:{month}")
                } else {
                    // Lines that differ only by country share one code space.
                    let number = line.number();
                    write!(f, "lot:v{}:{number:02}:{model}:{month}", version.tag())
                }
            }
            AllocationScope::Serial { lot } => {
                write!(f, "serial:v{}:{}", lot.version().tag(), lot.code())
            }
        }
    }
}

/// Allocation failures.
#[derive(Debug, Error)]
pub enum AllocError {
    /// The scope has issued its last sequence.
    #[error("scope '{scope_key}' is exhausted at {capacity}")]
    Exhausted { scope_key: String, capacity: u16 },

    /// The store kept reporting conflicts past the retry bound.
    #[error("scope '{scope_key}' still contended after {attempts} attempts")]
    Contention { scope_key: String, attempts: u32 },

    /// Non-retryable store failure.
    #[error("counter store error: {0}")]
    Store(#[from] DbError),
}

/// Retry policy for transient counter conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Issues strictly increasing, unique sequences per scope.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    config: AllocatorConfig,
    capacity: u16,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>, config: AllocatorConfig) -> Self {
        Self {
            store,
            config,
            capacity: SEQUENCE_CAPACITY,
        }
    }

    /// Largest value any scope will issue. Scopes whose grammar is
    /// narrower stop earlier.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Reserves the next sequence in `scope`, in `1..=capacity`, where the
    /// capacity is the smaller of the allocator's and the scope's.
    ///
    /// Concurrent callers on one scope receive distinct values. Once a scope
    /// reaches capacity every later call fails with [`AllocError::Exhausted`]
    /// and the counter does not move.
    pub async fn reserve_next(&self, scope: &AllocationScope) -> Result<u16, AllocError> {
        let capacity = scope.capacity().min(self.capacity);
        self.reserve(&scope.key(), capacity).await
    }

    /// Same as [`reserve_next`](Self::reserve_next) for a raw scope key,
    /// bounded by the allocator's capacity.
    pub async fn reserve_key(&self, scope_key: &str) -> Result<u16, AllocError> {
        self.reserve(scope_key, self.capacity).await
    }

    async fn reserve(&self, scope_key: &str, capacity: u16) -> Result<u16, AllocError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.store.increment(scope_key, capacity).await {
                Ok(Some(sequence)) => {
                    debug!(scope_key = %scope_key, sequence, attempt, "Reserved sequence");
                    return Ok(sequence);
                }
                Ok(None) => {
                    warn!(scope_key = %scope_key, capacity, "Scope exhausted");
                    return Err(AllocError::Exhausted {
                        scope_key: scope_key.to_string(),
                        capacity,
                    });
                }
                Err(e) if e.is_transient() => {
                    debug!(scope_key = %scope_key, attempt, error = %e, "Counter conflict, retrying");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
                Err(e) => return Err(AllocError::Store(e)),
            }
        }

        warn!(scope_key = %scope_key, attempts = max_attempts, "Counter contention");
        Err(AllocError::Contention {
            scope_key: scope_key.to_string(),
            attempts: max_attempts,
        })
    }

    /// The counter row for a scope, if anything was ever issued in it.
    pub async fn last_issued(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        self.store.counter(scope_key).await
    }
}
