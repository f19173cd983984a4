use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use segcode_core::store::Result;
use segcode_core::{CounterRow, Segment, SegmentStore, StorageError};
use tracing::{debug, info};

/// In-memory implementation of [`SegmentStore`] using DashMap.
///
/// A mutable DashMap reference holds the shard lock for its key, which
/// serves as the exclusive row lock for read-advance-write. Counters live
/// only as long as the store, so this is suitable for tests and for
/// single-process deployments that do not need ids to survive a restart.
#[derive(Debug, Default)]
pub struct InMemorySegmentStore {
    counters: DashMap<String, CounterRow>,
}

impl InMemorySegmentStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Creates a store pre-seeded with the given counters.
    pub fn with_counters(rows: impl IntoIterator<Item = CounterRow>) -> Self {
        let counters = rows
            .into_iter()
            .map(|row| (row.business_key.clone(), row))
            .collect();
        Self { counters }
    }
}

#[async_trait]
impl SegmentStore for InMemorySegmentStore {
    async fn create_counter_if_absent(&self, row: &CounterRow) -> Result<bool> {
        match self.counters.entry(row.business_key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(row.clone());
                info!(
                    key = %row.business_key,
                    initial_value = row.current_max,
                    step = row.step,
                    "created counter"
                );
                Ok(true)
            }
        }
    }

    async fn update_step(&self, business_key: &str, step: u64) -> Result<bool> {
        let Some(mut row) = self.counters.get_mut(business_key) else {
            return Ok(false);
        };
        row.step = step;
        Ok(true)
    }

    async fn allocate_next(&self, business_key: &str) -> Result<Segment> {
        let mut row = self
            .counters
            .get_mut(business_key)
            .ok_or_else(|| StorageError::CounterMissing(business_key.to_string()))?;

        let segment = row.advance()?;
        debug!(
            key = %business_key,
            start = segment.start(),
            end = segment.end(),
            "allocated segment"
        );
        Ok(segment)
    }

    async fn get_counter(&self, business_key: &str) -> Result<Option<CounterRow>> {
        Ok(self.counters.get(business_key).map(|row| row.clone()))
    }
}
