//! Segment cache.
//!
//! Content-addressed disk store for extracted video segments, keyed by
//! (remote id, start, duration). Avoids re-fetching and re-cutting the
//! same window of the same video across runs.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::SourceResult;

/// Default maximum entry age before it is considered stale (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default aggregate size cap for the segment directory (512 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Compute the cache key for a segment window.
///
/// Start and duration are fixed to millisecond precision so float
/// formatting noise cannot split equivalent windows across keys. The key
/// deliberately ignores quality tier and target width: extraction is a
/// container-level copy and the encoder rescales downstream, so one
/// cached segment serves any output size.
pub fn segment_cache_key(remote_id: &str, start_secs: f64, duration_secs: f64) -> String {
    let digest = Sha256::digest(
        format!("{}:{:.3}:{:.3}", remote_id, start_secs, duration_secs).as_bytes(),
    );
    format!("{:x}", digest)
}

/// Disk-backed segment cache.
///
/// Layout under the root:
/// - `segments/<key>.mp4` — extracted raw segments
/// - `metadata/<id>.json` — resolved remote metadata (see [`crate::metadata`])
///
/// Single-writer-per-run: no locking, last write wins on key collision.
#[derive(Debug, Clone)]
pub struct SegmentCache {
    root: PathBuf,
    max_age: Duration,
    max_bytes: u64,
}

impl SegmentCache {
    /// Create a cache rooted at the given directory with default limits.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: DEFAULT_MAX_AGE,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Set the maximum entry age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the aggregate size cap for stored segments.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Maximum entry age, shared with the metadata cache.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Directory holding cached segments.
    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    /// Directory holding cached remote metadata.
    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.segments_dir().join(format!("{}.mp4", key))
    }

    /// Look up a cached segment.
    ///
    /// Returns the entry path on a hit. Any I/O problem is treated as a
    /// miss; a broken cache must never fail a conversion.
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        self.purge();

        let path = self.entry_path(key);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => {
                debug!(key = key, path = ?path, "segment cache hit");
                Some(path)
            }
            Ok(_) => {
                debug!(key = key, "segment cache miss (empty entry)");
                let _ = std::fs::remove_file(&path);
                None
            }
            Err(_) => {
                debug!(key = key, "segment cache miss");
                None
            }
        }
    }

    /// Store a segment under the given key.
    ///
    /// Copies, never moves: the caller keeps ownership of `source`.
    pub fn put(&self, key: &str, source: &Path) -> SourceResult<PathBuf> {
        let dir = self.segments_dir();
        std::fs::create_dir_all(&dir)?;

        let dest = self.entry_path(key);
        std::fs::copy(source, &dest)?;
        debug!(key = key, dest = ?dest, "stored segment in cache");

        self.purge();
        Ok(dest)
    }

    /// Drop expired and empty entries, then evict oldest-by-mtime entries
    /// until the aggregate size is back under the cap. Runs on every get
    /// and put. Maintenance problems are logged and swallowed.
    fn purge(&self) {
        let dir = self.segments_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // Nothing cached yet
            Err(_) => return,
        };

        let now = SystemTime::now();
        let mut live: Vec<(PathBuf, u64, SystemTime)> = Vec::new();

        for entry in entries.flatten() {
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            if !meta.is_file() {
                continue;
            }

            let path = entry.path();
            let mtime = meta.modified().unwrap_or(now);
            let age = now.duration_since(mtime).unwrap_or_default();

            if meta.len() == 0 || age > self.max_age {
                debug!(path = ?path, "purging stale cache entry");
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = ?path, error = %e, "failed to purge cache entry");
                }
                continue;
            }

            live.push((path, meta.len(), mtime));
        }

        let mut total: u64 = live.iter().map(|(_, size, _)| *size).sum();
        if total <= self.max_bytes {
            return;
        }

        live.sort_by_key(|(_, _, mtime)| *mtime);
        for (path, size, _) in live {
            if total <= self.max_bytes {
                break;
            }
            debug!(path = ?path, size = size, "evicting cache entry over size cap");
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = ?path, error = %e, "failed to evict cache entry");
                continue;
            }
            total = total.saturating_sub(size);
        }
    }
}
