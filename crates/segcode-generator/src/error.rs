use segcode_core::{CodecError, ConfigError, StorageError};
use thiserror::Error;

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// A segment could not be carved out of the store.
///
/// The allocator never retries; whoever waits on the allocation decides
/// whether the failure is fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to allocate segment for '{key}': {source}")]
pub struct AllocationError {
    pub key: String,
    #[source]
    pub source: StorageError,
}

impl AllocationError {
    pub fn new(key: impl Into<String>, source: StorageError) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("invalid short code: {0}")]
    Codec(#[from] CodecError),
    #[error("snowflake generator failed: {0}")]
    Snowflake(#[from] segcode_snowflake::Error),
    #[error("id {id} is outside the obfuscation modulus {modulus}")]
    IdOutOfRange { id: u64, modulus: u64 },
    #[error("background {0} task ended without a result")]
    Aborted(&'static str),
}
