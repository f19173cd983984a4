use jiff::{SignedDuration, Timestamp};
use modular_bitfield::prelude::*;
use std::fmt;

/// A 64-bit Snowflake id, least significant field first.
///
/// As a `u64` the layout is
/// `0 | timestamp:41 | datacenter_id:5 | worker_id:5 | sequence:12`,
/// so ids compare in mint order within one process.
#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowflakeId {
    /// 12 bits for the per-millisecond sequence.
    pub sequence: B12,
    /// 5 bits for the worker id (32 workers per datacenter).
    pub worker_id: B5,
    /// 5 bits for the datacenter id (32 datacenters).
    pub datacenter_id: B5,
    /// 41 bits for milliseconds since the generator epoch.
    pub timestamp: B41,
    #[skip]
    __: B1,
}

pub(crate) const SEQUENCE_BITS: u32 = 12;
pub(crate) const WORKER_ID_BITS: u32 = 5;
pub(crate) const DATACENTER_ID_BITS: u32 = 5;
pub(crate) const TIMESTAMP_BITS: u32 = 41;

pub(crate) const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
pub(crate) const MAX_WORKER_ID: u8 = (1 << WORKER_ID_BITS) - 1;
pub(crate) const MAX_DATACENTER_ID: u8 = (1 << DATACENTER_ID_BITS) - 1;
pub(crate) const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

impl SnowflakeId {
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.into_bytes())
    }

    pub fn from_u64(raw: u64) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    /// The wall-clock time this id was minted at, given the generator epoch.
    pub fn minted_at(&self, epoch: Timestamp) -> Option<Timestamp> {
        let offset = SignedDuration::from_millis(i64::try_from(self.timestamp()).ok()?);
        epoch.checked_add(offset).ok()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.as_u64()
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_fields_into_classic_layout() {
        let id = SnowflakeId::new()
            .with_timestamp(123_456)
            .with_datacenter_id(3)
            .with_worker_id(7)
            .with_sequence(42);

        let expected = (123_456u64 << 22) | (3 << 17) | (7 << 12) | 42;
        assert_eq!(id.as_u64(), expected);
        assert_eq!(SnowflakeId::from_u64(expected), id);
    }

    #[test]
    fn top_bit_is_never_set() {
        let id = SnowflakeId::new()
            .with_timestamp(MAX_TIMESTAMP)
            .with_datacenter_id(MAX_DATACENTER_ID)
            .with_worker_id(MAX_WORKER_ID)
            .with_sequence(MAX_SEQUENCE);

        assert_eq!(id.as_u64(), i64::MAX as u64);
    }

    #[test]
    fn minted_at_adds_epoch() {
        let epoch = Timestamp::from_millisecond(1_000).unwrap();
        let id = SnowflakeId::new().with_timestamp(500);
        assert_eq!(id.minted_at(epoch).unwrap().as_millisecond(), 1_500);
    }
}
