//! Snowflake-style time-ordered id source.
//!
//! Ids pack milliseconds since a custom epoch, a datacenter id, a worker id
//! and a per-millisecond sequence into one `u64`. No shared store is needed,
//! but every live process must be configured with a distinct
//! `(datacenter_id, worker_id)` pair.

mod clock;
pub mod error;
mod snowflake;
mod snowflake_id;

pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use snowflake::{Snowflake, SnowflakeSettings, DEFAULT_EPOCH};
pub use snowflake_id::SnowflakeId;

#[cfg(test)]
pub(crate) use clock::test_clock::TestClock;
