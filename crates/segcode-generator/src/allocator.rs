use crate::error::AllocationError;
use segcode_core::{CounterRow, Segment, SegmentStore, StorageError};
use std::sync::Arc;
use tracing::{error, info};

/// The only component that talks to the [`SegmentStore`].
///
/// Turns one store round-trip into a [`Segment`]. Failures are reported as
/// [`AllocationError`] and are never retried here.
#[derive(Debug)]
pub struct SegmentAllocator<S> {
    store: Arc<S>,
}

impl<S> Clone for SegmentAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SegmentStore> SegmentAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the counter row for `key` if it is missing.
    ///
    /// An existing row keeps its `current_max`; only its `step` is brought
    /// in line with the configured one.
    pub async fn ensure_counter(
        &self,
        key: &str,
        initial_value: u64,
        step: u64,
    ) -> Result<CounterRow, AllocationError> {
        let wanted = CounterRow::new(key, initial_value, step);
        let created = self
            .store
            .create_counter_if_absent(&wanted)
            .await
            .map_err(|e| AllocationError::new(key, e))?;
        if created {
            return Ok(wanted);
        }

        let mut existing = self
            .store
            .get_counter(key)
            .await
            .map_err(|e| AllocationError::new(key, e))?
            .ok_or_else(|| {
                AllocationError::new(key, StorageError::CounterMissing(key.to_string()))
            })?;

        if existing.step != step {
            info!(key = %key, from = existing.step, to = step, "updating counter step");
            self.store
                .update_step(key, step)
                .await
                .map_err(|e| AllocationError::new(key, e))?;
            existing.step = step;
        }

        Ok(existing)
    }

    /// Carves the next segment for `key`.
    pub async fn allocate(&self, key: &str) -> Result<Segment, AllocationError> {
        match self.store.allocate_next(key).await {
            Ok(segment) => {
                info!(
                    key = %key,
                    start = segment.start(),
                    end = segment.end(),
                    step = segment.step(),
                    "allocated new segment"
                );
                Ok(segment)
            }
            Err(err) => {
                error!(key = %key, error = %err, "failed to allocate segment");
                Err(AllocationError::new(key, err))
            }
        }
    }
}
