//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use gifclip_source::{RetryPolicy, SegmentCache};

/// Pipeline configuration, environment-driven with hard defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the segment/metadata cache.
    pub cache_dir: PathBuf,
    /// Maximum cache entry age.
    pub cache_max_age: Duration,
    /// Aggregate size cap for cached segments.
    pub cache_max_bytes: u64,
    /// Scratch root; each run creates its own subdirectory inside it.
    pub work_dir: PathBuf,
    /// Metadata resolution retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Delay before the first metadata retry.
    pub retry_base_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/tmp/gifclip/cache"),
            cache_max_age: Duration::from_secs(24 * 3600),
            cache_max_bytes: 512 * 1024 * 1024,
            work_dir: PathBuf::from("/tmp/gifclip"),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            cache_dir: std::env::var("GIFCLIP_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/gifclip/cache")),
            cache_max_age: Duration::from_secs(
                std::env::var("GIFCLIP_CACHE_MAX_AGE_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(24)
                    * 3600,
            ),
            cache_max_bytes: std::env::var("GIFCLIP_CACHE_MAX_MB")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(512)
                * 1024
                * 1024,
            work_dir: std::env::var("GIFCLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/gifclip")),
            max_retries: std::env::var("GIFCLIP_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_base_delay: Duration::from_millis(
                std::env::var("GIFCLIP_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
        }
    }

    /// The segment cache described by this config.
    pub fn segment_cache(&self) -> SegmentCache {
        SegmentCache::new(&self.cache_dir)
            .with_max_age(self.cache_max_age)
            .with_max_bytes(self.cache_max_bytes)
    }

    /// The retry policy for metadata resolution.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new("resolve_metadata")
            .with_max_retries(self.max_retries)
            .with_base_delay(self.retry_base_delay)
    }
}
