//! Remote metadata resolution via yt-dlp.
//!
//! `yt-dlp -J` dumps a JSON document describing the video and every
//! rendition it can serve; this module parses that into the small shape
//! the rest of the pipeline needs and caches it on disk so a warm run
//! skips the network round-trip entirely.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{classify_fetch_failure, SourceError, SourceResult};
use crate::retry::{retry_with_observer, RetryPolicy};

/// One fetchable resolution/container combination of a remote video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendition {
    pub format_id: String,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub container: String,
}

/// Resolved remote video metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMetadata {
    pub id: String,
    pub title: String,
    pub duration_secs: f64,
    pub renditions: Vec<Rendition>,
    pub fetched_at: DateTime<Utc>,
}

/// Subset of the `yt-dlp -J` document we care about.
#[derive(Debug, Deserialize)]
struct YtDlpProbe {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    width: Option<u32>,
    height: Option<u32>,
    vcodec: Option<String>,
    acodec: Option<String>,
    ext: Option<String>,
}

/// Canonical watch URL for a remote video id.
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Resolve metadata for a remote video with a single yt-dlp invocation.
pub async fn resolve_metadata(id: &str) -> SourceResult<RemoteMetadata> {
    which::which("yt-dlp").map_err(|_| SourceError::YtDlpNotFound)?;

    let url = watch_url(id);
    debug!(id = id, "resolving remote metadata with yt-dlp");

    let output = Command::new("yt-dlp")
        .args(["-J", "--no-warnings", "--no-playlist"])
        .arg(&url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(id = id, "yt-dlp -J stderr: {}", stderr);
        return Err(classify_fetch_failure(id, &stderr));
    }

    let probe: YtDlpProbe = serde_json::from_slice(&output.stdout)?;
    let renditions = renditions_from_formats(probe.formats);

    let metadata = RemoteMetadata {
        id: probe.id.unwrap_or_else(|| id.to_string()),
        title: probe.title.unwrap_or_default(),
        duration_secs: probe.duration.unwrap_or(0.0),
        renditions,
        fetched_at: Utc::now(),
    };

    info!(
        id = metadata.id.as_str(),
        title = metadata.title.as_str(),
        duration_secs = metadata.duration_secs,
        renditions = metadata.renditions.len(),
        "resolved remote metadata"
    );
    Ok(metadata)
}

/// Keep formats that actually carry a video stream with known dimensions.
/// Drops audio-only formats and storyboard pseudo-formats (vcodec "none").
fn renditions_from_formats(formats: Vec<YtDlpFormat>) -> Vec<Rendition> {
    formats
        .into_iter()
        .filter_map(|f| {
            let vcodec = f.vcodec.as_deref().unwrap_or("none");
            if vcodec == "none" {
                return None;
            }
            let (width, height) = match (f.width, f.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
                _ => return None,
            };
            let has_audio = f.acodec.as_deref().map(|a| a != "none").unwrap_or(false);
            Some(Rendition {
                format_id: f.format_id,
                width,
                height,
                has_audio,
                container: f.ext.unwrap_or_else(|| "mp4".to_string()),
            })
        })
        .collect()
}

/// Path of the cached metadata document for a video id.
pub fn metadata_cache_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", id))
}

/// Load cached metadata if present and fresh.
///
/// Any read or parse problem is a miss; stale or corrupt entries are
/// removed on the way out.
pub fn load_cached_metadata(dir: &Path, id: &str, max_age: Duration) -> Option<RemoteMetadata> {
    let path = metadata_cache_path(dir, id);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(_) => {
            debug!(id = id, "metadata cache miss");
            return None;
        }
    };

    let metadata: RemoteMetadata = match serde_json::from_slice(&data) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!(id = id, error = %e, "metadata cache miss (corrupt entry)");
            let _ = std::fs::remove_file(&path);
            return None;
        }
    };

    let age = Utc::now().signed_duration_since(metadata.fetched_at);
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    if age > max_age {
        debug!(id = id, "metadata cache miss (stale entry)");
        let _ = std::fs::remove_file(&path);
        return None;
    }

    debug!(id = id, "metadata cache hit");
    Some(metadata)
}

/// Persist resolved metadata for future runs.
pub fn store_cached_metadata(dir: &Path, metadata: &RemoteMetadata) -> SourceResult<()> {
    std::fs::create_dir_all(dir)?;
    let path = metadata_cache_path(dir, &metadata.id);
    let data = serde_json::to_vec_pretty(metadata)?;
    std::fs::write(&path, data)?;
    debug!(id = metadata.id.as_str(), path = ?path, "stored metadata in cache");
    Ok(())
}

/// Resolve metadata through the disk cache, hitting the network (with
/// retries) only on a miss. Cache write failures are non-fatal.
pub async fn resolve_metadata_cached(
    id: &str,
    metadata_dir: &Path,
    max_age: Duration,
    policy: &RetryPolicy,
) -> SourceResult<RemoteMetadata> {
    if let Some(cached) = load_cached_metadata(metadata_dir, id, max_age) {
        return Ok(cached);
    }

    let metadata = retry_with_observer(
        policy,
        |error: &SourceError, attempt, max_attempts| {
            warn!(
                id = id,
                attempt = attempt,
                max_attempts = max_attempts,
                error = %error,
                "metadata resolution failed, will retry"
            );
        },
        || resolve_metadata(id),
    )
    .await?;

    if let Err(e) = store_cached_metadata(metadata_dir, &metadata) {
        warn!(id = id, error = %e, "failed to store metadata cache entry");
    }
    Ok(metadata)
}
