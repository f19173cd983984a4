pub mod memory;
pub mod mysql;

pub use memory::InMemorySegmentStore;
pub use mysql::MySqlSegmentStore;
pub use segcode_core::{CounterRow, Segment, SegmentStore, StorageError};
