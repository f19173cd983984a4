use crate::error::StorageError;
use serde::{Deserialize, Serialize};

/// A contiguous, exclusively-owned range of ids, `[start, end]` inclusive.
///
/// Segments are carved out of a [`CounterRow`] by a single store transaction
/// and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    start: u64,
    end: u64,
    step: u64,
}

impl Segment {
    /// Builds the segment `(previous_max, previous_max + step]` that follows a
    /// counter's high-water mark.
    pub fn after(previous_max: u64, step: u64) -> Result<Self, StorageError> {
        if step == 0 {
            return Err(StorageError::InvalidData("segment step is zero".to_string()));
        }
        // u64::MAX itself is never handed out so that a cursor one past the
        // end of a segment is always representable.
        let end = previous_max
            .checked_add(step)
            .filter(|end| *end < u64::MAX)
            .ok_or_else(|| {
                StorageError::Exhausted(format!(
                    "current_max {previous_max} + step {step} overflows"
                ))
            })?;

        Ok(Self {
            start: previous_max + 1,
            end,
            step,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Ids left after `id` has been handed out, or `None` if `id` is past the end.
    pub fn remaining_after(&self, id: u64) -> Option<u64> {
        self.end.checked_sub(id)
    }

    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A persistent counter, one per business key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRow {
    /// Logical namespace of the counter, e.g. `short_link`.
    pub business_key: String,
    /// High-water mark already handed out.
    pub current_max: u64,
    /// Width of every segment carved from this counter.
    pub step: u64,
}

impl CounterRow {
    pub fn new(business_key: impl Into<String>, current_max: u64, step: u64) -> Self {
        Self {
            business_key: business_key.into(),
            current_max,
            step,
        }
    }

    /// Advances the high-water mark by one step and returns the carved segment.
    ///
    /// Callers must hold the row exclusively for the duration of the call.
    pub fn advance(&mut self) -> Result<Segment, StorageError> {
        let segment = Segment::after(self.current_max, self.step)?;
        self.current_max = segment.end();
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_after_high_water_mark() {
        let segment = Segment::after(1000, 100).unwrap();
        assert_eq!(segment.start(), 1001);
        assert_eq!(segment.end(), 1100);
        assert_eq!(segment.step(), 100);
    }

    #[test]
    fn remaining_after_counts_down_to_end() {
        let segment = Segment::after(0, 10).unwrap();
        assert_eq!(segment.remaining_after(1), Some(9));
        assert_eq!(segment.remaining_after(10), Some(0));
        assert_eq!(segment.remaining_after(11), None);
    }

    #[test]
    fn consecutive_advances_never_overlap() {
        let mut row = CounterRow::new("short_link", 1000, 100);
        let first = row.advance().unwrap();
        let second = row.advance().unwrap();

        assert_eq!((first.start(), first.end()), (1001, 1100));
        assert_eq!((second.start(), second.end()), (1101, 1200));
        assert!(!first.overlaps(&second));
        assert_eq!(row.current_max, 1200);
    }

    #[test]
    fn overflowing_counter_is_exhausted() {
        let mut row = CounterRow::new("short_link", u64::MAX - 5, 10);
        assert!(matches!(row.advance(), Err(StorageError::Exhausted(_))));
        assert_eq!(row.current_max, u64::MAX - 5);
    }

    #[test]
    fn zero_step_is_invalid() {
        assert!(matches!(
            Segment::after(0, 0),
            Err(StorageError::InvalidData(_))
        ));
    }
}
