use thiserror::Error;

/// Errors returned by Snowflake initialization and ID generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid worker id {worker_id}; expected 0..={max}")]
    InvalidWorkerId { worker_id: u8, max: u8 },
    #[error("invalid datacenter id {datacenter_id}; expected 0..={max}")]
    InvalidDatacenterId { datacenter_id: u8, max: u8 },
    #[error("epoch is ahead of current clock time: epoch_ms={epoch_ms}, now_ms={now_ms}")]
    EpochAhead { epoch_ms: i64, now_ms: i64 },
    #[error("clock moved backwards: last_ms={last_ms}, now_ms={now_ms}")]
    ClockRegression { last_ms: i64, now_ms: i64 },
    #[error("overtime limit")]
    OverTimeLimit,
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}
