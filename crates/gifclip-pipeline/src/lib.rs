//! Conversion pipeline and CLI entry point.
//!
//! This crate provides:
//! - Pipeline orchestration from source to final GIF
//! - Runtime configuration from the environment
//! - Per-run temp tracking and cleanup
//! - The classified error taxonomy surfaced as exit codes

pub mod config;
pub mod error;
pub mod pipeline;
pub mod tracker;

pub use config::PipelineConfig;
pub use error::{ConvertError, ConvertResult};
pub use pipeline::{convert, ConversionOutput};
pub use tracker::ResourceTracker;
