//! Shared data models for the gifclip pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Conversion requests and their validation rules
//! - Source descriptors (remote video or local file)
//! - Quality tiers and dither modes
//! - Size estimation and the derived encoding parameters

pub mod quality;
pub mod request;
pub mod sizing;
pub mod source;

// Re-export common types
pub use quality::{DitherMode, QualityTier};
pub use request::{CachePolicy, ConversionRequest, RequestError, MAX_COLORS, MIN_COLORS};
pub use sizing::{constrain_parameters, estimate_size_mb, EffectiveParameters};
pub use source::{parse_video_source, SourceDescriptor, SourceParseError};
