//! Short code generation on top of segment-allocated ids.
//!
//! [`SegmentShortCodeGenerator`] runs the full pipeline: a
//! [`SegmentWindow`] hands out sequential ids, the [`Obfuscator`] scatters
//! them over the code space and the base62 codec renders a fixed-width
//! [`ShortCode`]. [`SnowflakeShortCodeGenerator`] is the store-free
//! alternative.

pub mod allocator;
pub mod error;
pub mod obfuscator;
pub mod segment_code;
pub mod settings;
pub mod snowflake_code;
pub mod window;

#[cfg(test)]
mod testing;

use async_trait::async_trait;
use segcode_core::ShortCode;

pub use allocator::SegmentAllocator;
pub use error::{AllocationError, GeneratorError, Result};
pub use obfuscator::{Obfuscator, ObfuscatorSettings};
pub use segment_code::{SegmentShortCodeGenerator, ShortCodeSettings, DEFAULT_CODE_LENGTH};
pub use settings::{SegmentSettings, StartupPolicy};
pub use snowflake_code::{SnowflakeShortCodeGenerator, SNOWFLAKE_CODE_LENGTH};
pub use window::{SegmentWindow, WindowSnapshot};

/// Trait for generating short codes.
///
/// Implementations differ in where uniqueness comes from: a shared segment
/// store or a per-process Snowflake identity.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Generates a globally unique short code.
    async fn generate(&self) -> Result<ShortCode>;
}
