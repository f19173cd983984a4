//! Core types and traits for the segcode id engine.
//!
//! This crate provides the segment model, the [`SegmentStore`] contract
//! that allocators talk to, and the fixed-width base62 codec that turns
//! numeric ids into [`ShortCode`]s.

pub mod base62;
pub mod error;
pub mod segment;
pub mod shortcode;
pub mod store;

pub use base62::Base62Codec;
pub use error::{CodecError, ConfigError, StorageError};
pub use segment::{CounterRow, Segment};
pub use shortcode::ShortCode;
pub use store::SegmentStore;

/// Business key used when none is configured.
pub const DEFAULT_BUSINESS_KEY: &str = "short_link";

/// Longest business key a store must accept, in characters.
pub const MAX_BUSINESS_KEY_LEN: usize = 64;
