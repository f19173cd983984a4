//! Store wrapper used by the window tests to observe and steer allocations.

use async_trait::async_trait;
use segcode_core::store::Result;
use segcode_core::{CounterRow, Segment, SegmentStore, StorageError};
use segcode_storage::InMemorySegmentStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

pub(crate) struct InstrumentedStore {
    inner: InMemorySegmentStore,
    allocations: AtomicUsize,
    creations: AtomicUsize,
    pending_failures: AtomicUsize,
    fail_always: AtomicBool,
    gate: watch::Sender<bool>,
}

impl InstrumentedStore {
    pub(crate) fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: InMemorySegmentStore::new(),
            allocations: AtomicUsize::new(0),
            creations: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
            fail_always: AtomicBool::new(false),
            gate,
        }
    }

    /// Number of `allocate_next` calls so far, counted when the call starts.
    pub(crate) fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Number of `create_counter_if_absent` calls that created a row.
    pub(crate) fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Fails the next `n` allocations with [`StorageError::Unavailable`].
    pub(crate) fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_always(&self, enabled: bool) {
        self.fail_always.store(enabled, Ordering::SeqCst);
    }

    /// Holds every allocation at its start until [`resume`](Self::resume).
    pub(crate) fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn resume(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) async fn counter(&self, key: &str) -> Option<CounterRow> {
        self.inner.get_counter(key).await.unwrap()
    }

    fn should_fail(&self) -> bool {
        self.fail_always.load(Ordering::SeqCst)
            || self
                .pending_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl SegmentStore for InstrumentedStore {
    async fn create_counter_if_absent(&self, row: &CounterRow) -> Result<bool> {
        let created = self.inner.create_counter_if_absent(row).await?;
        if created {
            self.creations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(created)
    }

    async fn update_step(&self, business_key: &str, step: u64) -> Result<bool> {
        self.inner.update_step(business_key, step).await
    }

    async fn allocate_next(&self, business_key: &str) -> Result<Segment> {
        self.allocations.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open).await.unwrap();

        if self.should_fail() {
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }
        self.inner.allocate_next(business_key).await
    }

    async fn get_counter(&self, business_key: &str) -> Result<Option<CounterRow>> {
        self.inner.get_counter(business_key).await
    }
}
