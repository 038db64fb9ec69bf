//! Segment window extraction.

use std::path::Path;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Cut `[start, start+duration]` out of `input` into `output`.
///
/// Tries a container-level stream copy first, which is fast and keeps the
/// source encoding. Some containers produce nothing usable that way
/// (keyframe alignment, odd stream layouts), so an empty or failed copy
/// falls back to a full transcode of the window.
pub async fn extract_window(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    duration_secs: f64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!(
        input = %input.display(),
        start = start_secs,
        duration = duration_secs,
        "extracting segment window"
    );

    let copy = FfmpegCommand::new(input, output)
        .seek(start_secs)
        .duration(duration_secs)
        .codec_copy();

    let runner = FfmpegRunner::new();
    match runner.run(&copy).await {
        Ok(()) => return Ok(()),
        Err(e @ (MediaError::EmptyOutput(_) | MediaError::FfmpegFailed { .. })) => {
            warn!(error = %e, "container copy produced nothing, re-encoding the window");
        }
        Err(e) => return Err(e),
    }

    let transcode = FfmpegCommand::new(input, output)
        .seek(start_secs)
        .duration(duration_secs)
        .video_codec("libx264")
        .preset("fast")
        .crf(18)
        .audio_codec("aac");

    runner.run(&transcode).await
}
