//! Remote source plumbing: metadata resolution, rendition selection,
//! segment caching and segment acquisition.

pub mod acquire;
pub mod cache;
pub mod error;
pub mod format;
pub mod metadata;
pub mod retry;

pub use acquire::acquire_segment;
pub use cache::{segment_cache_key, SegmentCache, DEFAULT_MAX_AGE, DEFAULT_MAX_BYTES};
pub use error::{classify_fetch_failure, SourceError, SourceResult};
pub use format::select_rendition;
pub use metadata::{resolve_metadata, RemoteMetadata, Rendition};
pub use retry::{retry, retry_with_observer, RetryPolicy};
