use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lotline_codec::{FormatVersion, LineCode, LotIdentifier, ModelCode, YearMonth};
use lotline_service::allocator::{AllocError, AllocationScope, AllocatorConfig, SequenceAllocator};
use lotline_service::db::{CounterStore, DbError, MemoryCounterStore, ScopeCounter};

fn fast_config(max_attempts: u32) -> AllocatorConfig {
    AllocatorConfig {
        max_attempts,
        backoff: Duration::from_millis(1),
    }
}

fn memory_allocator() -> SequenceAllocator {
    SequenceAllocator::new(Arc::new(MemoryCounterStore::new()), fast_config(5))
}

fn lot_scope(line: &str, model: &str, year: i32, month: u32) -> AllocationScope {
    versioned_lot_scope(FormatVersion::V2, line, model, year, month)
}

fn versioned_lot_scope(
    version: FormatVersion,
    line: &str,
    model: &str,
    year: i32,
    month: u32,
) -> AllocationScope {
    AllocationScope::lot(
        version,
        LineCode::parse(line).unwrap(),
        ModelCode::parse(model).unwrap(),
        YearMonth::new(year, month).unwrap(),
    )
}

/// Reports a transient conflict for the first `conflicts` calls, then
/// delegates to an in-memory store.
struct ConflictingStore {
    remaining: AtomicU32,
    calls: AtomicU32,
    inner: MemoryCounterStore,
}

impl ConflictingStore {
    fn new(conflicts: u32) -> Self {
        Self {
            remaining: AtomicU32::new(conflicts),
            calls: AtomicU32::new(0),
            inner: MemoryCounterStore::new(),
        }
    }
}

#[async_trait]
impl CounterStore for ConflictingStore {
    async fn increment(&self, scope_key: &str, capacity: u16) -> Result<Option<u16>, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let conflicted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(DbError::Conflict {
                scope_key: scope_key.to_string(),
            });
        }
        self.inner.increment(scope_key, capacity).await
    }

    async fn counter(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        self.inner.counter(scope_key).await
    }
}

struct BrokenStore;

#[async_trait]
impl CounterStore for BrokenStore {
    async fn increment(&self, scope_key: &str, _capacity: u16) -> Result<Option<u16>, DbError> {
        Err(DbError::CorruptRow {
            code: scope_key.to_string(),
            reason: "unreadable".to_string(),
        })
    }

    async fn counter(&self, _scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_first_sequence_is_one() {
    let allocator = memory_allocator();
    let scope = lot_scope("KR001", "PSA", 2025, 11);
    assert_eq!(allocator.reserve_next(&scope).await.unwrap(), 1);
    assert_eq!(allocator.reserve_next(&scope).await.unwrap(), 2);

    let counter = allocator.last_issued(&scope.key()).await.unwrap().unwrap();
    assert_eq!(counter.scope_key, "lot:KR001:PSA:2025-11");
    assert_eq!(counter.last_issued, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_are_unique_and_contiguous() {
    let allocator = memory_allocator();
    let scope = lot_scope("KR001", "PSA", 2025, 11);

    // Pre-advance so the batch starts at k + 1.
    for _ in 0..7 {
        allocator.reserve_next(&scope).await.unwrap();
    }

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let allocator = allocator.clone();
            let scope = scope.clone();
            tokio::spawn(async move { allocator.reserve_next(&scope).await.unwrap() })
        })
        .collect();

    let mut issued = BTreeSet::new();
    for handle in handles {
        assert!(issued.insert(handle.await.unwrap()), "duplicate sequence");
    }
    assert_eq!(issued, (8..=71).collect::<BTreeSet<u16>>());
}

#[tokio::test]
async fn test_scopes_are_isolated() {
    let allocator = memory_allocator();
    let november = lot_scope("KR001", "PSA", 2025, 11);
    let december = lot_scope("KR001", "PSA", 2025, 12);
    let other_line = lot_scope("KR002", "PSA", 2025, 11);

    for _ in 0..5 {
        allocator.reserve_next(&november).await.unwrap();
    }
    assert_eq!(allocator.reserve_next(&december).await.unwrap(), 1);
    assert_eq!(allocator.reserve_next(&other_line).await.unwrap(), 1);
    assert_eq!(allocator.reserve_next(&november).await.unwrap(), 6);
}

#[tokio::test]
async fn test_serial_scope_is_per_lot() {
    let allocator = memory_allocator();
    let first = LotIdentifier::parse("KR01PSA2511001", FormatVersion::V2).unwrap();
    let second = LotIdentifier::parse("KR01PSA2511002", FormatVersion::V2).unwrap();

    assert_eq!(allocator.reserve_next(&AllocationScope::serial(&first)).await.unwrap(), 1);
    assert_eq!(allocator.reserve_next(&AllocationScope::serial(&first)).await.unwrap(), 2);
    assert_eq!(allocator.reserve_next(&AllocationScope::serial(&second)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_exhaustion_at_capacity_is_sticky() {
    let allocator = memory_allocator();
    let scope = lot_scope("KR001", "PSA", 2025, 11);

    let mut last = 0;
    for _ in 0..999 {
        last = allocator.reserve_next(&scope).await.unwrap();
    }
    assert_eq!(last, 999);

    for _ in 0..3 {
        match allocator.reserve_next(&scope).await {
            Err(AllocError::Exhausted {
                scope_key,
                capacity,
            }) => {
                assert_eq!(scope_key, "lot:KR001:PSA:2025-11");
                assert_eq!(capacity, 999);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    let counter = allocator.last_issued(&scope.key()).await.unwrap().unwrap();
    assert_eq!(counter.last_issued, 999);
}

#[tokio::test]
async fn test_narrow_grammar_exhausts_at_its_width() {
    let allocator = memory_allocator();
    let scope = versioned_lot_scope(FormatVersion::V1, "KR001", "PSA", 2025, 11);

    for expected in 1..=99 {
        assert_eq!(allocator.reserve_next(&scope).await.unwrap(), expected);
    }
    for _ in 0..2 {
        match allocator.reserve_next(&scope).await {
            Err(AllocError::Exhausted {
                scope_key,
                capacity,
            }) => {
                assert_eq!(scope_key, "lot:v1:01:PSA:2025-11");
                assert_eq!(capacity, 99);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    let counter = allocator.last_issued(&scope.key()).await.unwrap().unwrap();
    assert_eq!(counter.last_issued, 99);
}

#[tokio::test]
async fn test_transient_conflicts_are_retried() {
    let store = Arc::new(ConflictingStore::new(3));
    let allocator = SequenceAllocator::new(store.clone(), fast_config(5));

    let sequence = allocator.reserve_key("lot:KR001:PSA:2025-11").await.unwrap();
    assert_eq!(sequence, 1);
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_contention_past_retry_bound() {
    let store = Arc::new(ConflictingStore::new(u32::MAX));
    let allocator = SequenceAllocator::new(store.clone(), fast_config(3));

    match allocator.reserve_key("lot:KR001:PSA:2025-11").await {
        Err(AllocError::Contention { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected contention, got {other:?}"),
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_store_failures_are_not_retried() {
    let allocator = SequenceAllocator::new(Arc::new(BrokenStore), fast_config(5));
    assert!(matches!(
        allocator.reserve_key("lot:KR001:PSA:2025-11").await,
        Err(AllocError::Store(DbError::CorruptRow { .. }))
    ));
}
