//! In-memory stores for tests and single-process deployments.
//!
//! Counters are `AtomicU16`s in a sharded map, so scopes never contend with
//! each other and a scope's increment is one compare-and-swap loop.

use std::sync::atomic::{AtomicI64, AtomicU16, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lotline_codec::{CodeKind, LotIdentifier, SerialIdentifier};

use super::{CounterStore, DbError, IdentifierStore, ScopeCounter, StoredIdentifier};

#[derive(Debug)]
struct Counter {
    last_issued: AtomicU16,
    updated_at_ms: AtomicI64,
}

impl Counter {
    fn new() -> Self {
        Self {
            last_issued: AtomicU16::new(0),
            updated_at_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }
}

/// Sequence counters held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    scopes: DashMap<String, Arc<Counter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, scope_key: &str) -> Arc<Counter> {
        if let Some(counter) = self.scopes.get(scope_key) {
            return Arc::clone(counter.value());
        }
        Arc::clone(
            self.scopes
                .entry(scope_key.to_string())
                .or_insert_with(|| Arc::new(Counter::new()))
                .value(),
        )
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, scope_key: &str, capacity: u16) -> Result<Option<u16>, DbError> {
        let counter = self.scope(scope_key);
        let advanced =
            counter
                .last_issued
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < capacity).then_some(current + 1)
                });
        match advanced {
            Ok(previous) => {
                counter
                    .updated_at_ms
                    .store(Utc::now().timestamp_millis(), Ordering::Release);
                Ok(Some(previous + 1))
            }
            Err(_) => Ok(None),
        }
    }

    async fn counter(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        Ok(self.scopes.get(scope_key).map(|entry| {
            let counter = entry.value();
            let updated_at =
                DateTime::from_timestamp_millis(counter.updated_at_ms.load(Ordering::Acquire))
                    .unwrap_or_default();
            ScopeCounter {
                scope_key: scope_key.to_string(),
                last_issued: counter.last_issued.load(Ordering::Acquire),
                updated_at,
            }
        }))
    }
}

/// Identifier records held in process memory.
#[derive(Debug, Default)]
pub struct MemoryIdentifierStore {
    records: DashMap<String, StoredIdentifier>,
}

impl MemoryIdentifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&self, record: StoredIdentifier) -> Result<(), DbError> {
        match self.records.entry(record.canonical_code.clone()) {
            Entry::Occupied(_) => Err(DbError::DuplicateCode(record.canonical_code)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl IdentifierStore for MemoryIdentifierStore {
    async fn insert_lot(&self, lot: &LotIdentifier) -> Result<(), DbError> {
        self.insert(StoredIdentifier {
            canonical_code: lot.code().to_string(),
            format_version: lot.version(),
            kind: CodeKind::Lot,
            lot_code: None,
            created_at: Utc::now(),
        })
    }

    async fn insert_serial(&self, serial: &SerialIdentifier) -> Result<(), DbError> {
        let lot_exists = self
            .records
            .get(serial.lot_code())
            .is_some_and(|r| r.kind == CodeKind::Lot);
        if !lot_exists {
            return Err(DbError::UnknownLot(serial.lot_code().to_string()));
        }
        self.insert(StoredIdentifier {
            canonical_code: serial.code().to_string(),
            format_version: serial.version(),
            kind: CodeKind::Serial,
            lot_code: Some(serial.lot_code().to_string()),
            created_at: Utc::now(),
        })
    }

    async fn find(&self, code: &str) -> Result<Option<StoredIdentifier>, DbError> {
        Ok(self.records.get(code).map(|r| r.value().clone()))
    }
}
