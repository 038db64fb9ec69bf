//! Segment acquisition.
//!
//! Turns a source descriptor plus a [start, start+duration] window into a
//! local media file. Remote sources only expose whole-asset transfer, so
//! the acquirer downloads the chosen rendition once, cuts the window out
//! of it, and caches the cut so later runs skip the transfer entirely.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use gifclip_media::extract_window;
use gifclip_models::{ConversionRequest, SourceDescriptor};

use crate::cache::{segment_cache_key, SegmentCache};
use crate::error::{classify_fetch_failure, SourceError, SourceResult};
use crate::format::select_rendition;
use crate::metadata::{resolve_metadata, resolve_metadata_cached, watch_url};
use crate::retry::{retry, RetryPolicy};

/// Produce a local file covering the requested window.
///
/// The returned path lives inside `work_dir` and belongs to the caller.
pub async fn acquire_segment(
    request: &ConversionRequest,
    cache: &SegmentCache,
    policy: &RetryPolicy,
    work_dir: &Path,
) -> SourceResult<PathBuf> {
    match &request.source {
        SourceDescriptor::Local { path } => acquire_local(request, path, work_dir).await,
        SourceDescriptor::Remote { id } => {
            acquire_remote(request, id, cache, policy, work_dir).await
        }
    }
}

/// Local files need no transfer or caching; cut the window directly.
async fn acquire_local(
    request: &ConversionRequest,
    source: &Path,
    work_dir: &Path,
) -> SourceResult<PathBuf> {
    if !source.exists() {
        return Err(SourceError::FileNotFound(source.to_path_buf()));
    }

    let segment = work_dir.join("segment.mp4");
    extract_window(source, &segment, request.start_secs, request.duration_secs).await?;
    Ok(segment)
}

async fn acquire_remote(
    request: &ConversionRequest,
    id: &str,
    cache: &SegmentCache,
    policy: &RetryPolicy,
    work_dir: &Path,
) -> SourceResult<PathBuf> {
    let key = segment_cache_key(id, request.start_secs, request.duration_secs);
    let segment = work_dir.join("segment.mp4");

    if request.cache.is_enabled() {
        if let Some(cached) = cache.get(&key) {
            info!(id = id, key = key.as_str(), "using cached segment");
            tokio::fs::copy(&cached, &segment).await?;
            return Ok(segment);
        }
    }

    let metadata = if request.cache.is_enabled() {
        resolve_metadata_cached(id, &cache.metadata_dir(), cache.max_age(), policy).await?
    } else {
        retry(policy, || resolve_metadata(id)).await?
    };

    let rendition = select_rendition(&metadata.renditions, request.quality, request.width)?;
    info!(
        id = id,
        format_id = rendition.format_id.as_str(),
        width = rendition.width,
        height = rendition.height,
        "fetching source rendition"
    );

    let rendition_file = work_dir.join(format!("rendition.{}", rendition.container));
    let result = match fetch_rendition(id, &rendition.format_id, &rendition_file).await {
        Ok(()) => extract_and_store(request, &rendition_file, &segment, cache, &key).await,
        Err(e) => Err(e),
    };

    // The whole-asset temp is the big one; drop it however acquisition ended.
    if rendition_file.exists() {
        if let Err(e) = tokio::fs::remove_file(&rendition_file).await {
            warn!(path = ?rendition_file, error = %e, "failed to remove rendition temp file");
        }
    }

    result?;
    Ok(segment)
}

async fn extract_and_store(
    request: &ConversionRequest,
    rendition_file: &Path,
    segment: &Path,
    cache: &SegmentCache,
    key: &str,
) -> SourceResult<()> {
    extract_window(
        rendition_file,
        segment,
        request.start_secs,
        request.duration_secs,
    )
    .await?;

    if request.cache.is_enabled() {
        if let Err(e) = cache.put(key, segment) {
            warn!(key = key, error = %e, "failed to store segment in cache");
        }
    }
    Ok(())
}

/// Download one whole rendition with yt-dlp.
///
/// Transfer failures are classified for the operator and not retried
/// here; a failed multi-hundred-megabyte download is rarely transient.
async fn fetch_rendition(id: &str, format_id: &str, dest: &Path) -> SourceResult<()> {
    which::which("yt-dlp").map_err(|_| SourceError::YtDlpNotFound)?;

    let url = watch_url(id);
    debug!(id = id, format_id = format_id, dest = ?dest, "downloading rendition with yt-dlp");

    let output = Command::new("yt-dlp")
        .args([
            "--no-warnings",
            "--no-playlist",
            "--no-progress",
            "-f",
            format_id,
            "-o",
        ])
        .arg(dest)
        .arg(&url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(id = id, "yt-dlp stderr: {}", stderr);
        return Err(classify_fetch_failure(id, &stderr));
    }

    let meta = tokio::fs::metadata(dest).await.map_err(|_| {
        SourceError::download_failed(id, "yt-dlp reported success but produced no output file")
    })?;
    if meta.len() == 0 {
        return Err(SourceError::download_failed(
            id,
            "yt-dlp produced an empty file",
        ));
    }

    info!(
        id = id,
        format_id = format_id,
        size_mb = meta.len() as f64 / 1_048_576.0,
        "downloaded rendition"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifclip_models::SourceDescriptor;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_missing_file_fails_fast() {
        let work = TempDir::new().unwrap();
        let request =
            ConversionRequest::new(SourceDescriptor::local("/no/such/file.mp4")).with_window(
                0.0, 5.0,
            );
        let cache = SegmentCache::new(work.path().join("cache"));

        let result = acquire_segment(
            &request,
            &cache,
            &RetryPolicy::new("test"),
            work.path(),
        )
        .await;

        assert!(matches!(result, Err(SourceError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_remote_cache_hit_copies_into_work_dir() {
        let root = TempDir::new().unwrap();
        let work = root.path().join("work");
        std::fs::create_dir_all(&work).unwrap();

        let request = ConversionRequest::new(SourceDescriptor::remote("dQw4w9WgXcQ"))
            .with_window(10.0, 5.0);
        let cache = SegmentCache::new(root.path().join("cache"));

        // Warm the cache under the exact key the acquirer will compute
        let seed = root.path().join("seed.mp4");
        std::fs::write(&seed, b"cached segment bytes").unwrap();
        let key = segment_cache_key("dQw4w9WgXcQ", 10.0, 5.0);
        cache.put(&key, &seed).unwrap();

        let segment = acquire_segment(&request, &cache, &RetryPolicy::new("test"), &work)
            .await
            .unwrap();

        assert_eq!(segment, work.join("segment.mp4"));
        assert_eq!(std::fs::read(&segment).unwrap(), b"cached segment bytes");
        // The cache keeps its own copy
        assert!(cache.get(&key).is_some());
    }
}
