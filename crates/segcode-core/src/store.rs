use crate::error::StorageError;
use crate::segment::{CounterRow, Segment};
use async_trait::async_trait;

/// Result type for segment store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The persistent table of counters that segments are carved from.
///
/// Implementations are the single source of truth for global uniqueness:
/// [`allocate_next`](Self::allocate_next) must read, advance and write the
/// counter inside one isolated transaction so that no two callers, in this
/// process or any other, ever receive overlapping segments.
#[async_trait]
pub trait SegmentStore: Send + Sync + 'static {
    /// Creates the counter row if no row exists for `row.business_key`.
    ///
    /// Returns `true` if this call created the row. Safe under concurrent
    /// callers: exactly one of them observes `true`.
    async fn create_counter_if_absent(&self, row: &CounterRow) -> Result<bool>;

    /// Changes the step of an existing counter. `current_max` is untouched.
    ///
    /// Returns `false` if no row exists for the key.
    async fn update_step(&self, business_key: &str, step: u64) -> Result<bool>;

    /// Carves the next segment `(current_max, current_max + step]` under an
    /// exclusive row lock.
    ///
    /// Fails with [`StorageError::CounterMissing`] if the row does not exist.
    async fn allocate_next(&self, business_key: &str) -> Result<Segment>;

    /// Reads the counter row without locking it.
    async fn get_counter(&self, business_key: &str) -> Result<Option<CounterRow>>;
}
