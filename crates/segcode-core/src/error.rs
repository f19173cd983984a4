use thiserror::Error;

/// Errors returned by [`SegmentStore`](crate::SegmentStore) implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("counter row missing for business key: {0}")]
    CounterMissing(String),
    #[error("segment store unavailable: {0}")]
    Unavailable(String),
    #[error("segment store operation timed out: {0}")]
    Timeout(String),
    #[error("segment store transaction conflict: {0}")]
    Conflict(String),
    #[error("segment store query failed: {0}")]
    Query(String),
    #[error("stored counter is invalid: {0}")]
    InvalidData(String),
    #[error("counter exhausted for business key: {0}")]
    Exhausted(String),
}

/// Startup configuration errors. None of these are recoverable at runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("obfuscation modulus must be greater than one")]
    ModulusTooSmall,
    #[error("obfuscation prime {prime} must be in 1..{modulus}")]
    PrimeOutOfRange { prime: u64, modulus: u64 },
    #[error("obfuscation prime {prime} is not coprime with modulus {modulus}")]
    NotCoprime { prime: u64, modulus: u64 },
    #[error("modulus {modulus} does not fit in {code_length} base62 digits (capacity {capacity})")]
    ModulusExceedsCodeSpace {
        modulus: u64,
        code_length: usize,
        capacity: u128,
    },
    #[error("code length must be at least one")]
    ZeroCodeLength,
    #[error("code length {code_length} exceeds the maximum of {max}")]
    CodeLengthTooLong { code_length: usize, max: usize },
    #[error("segment step must be at least one")]
    ZeroStep,
    #[error("business key must not be empty")]
    EmptyBusinessKey,
    #[error("business key is {len} characters, the maximum is {max}")]
    BusinessKeyTooLong { len: usize, max: usize },
}

/// Errors returned when decoding a short code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid base62 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("value {value} does not fit in {code_length} base62 digits")]
    OutOfRange { value: u128, code_length: usize },
}
