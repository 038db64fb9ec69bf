//! End-to-end conversion: acquire a segment, remap speed, optionally
//! synthesize a seamless loop, encode the GIF and compress it.
//!
//! Every intermediate lives inside a per-run directory owned by a
//! [`ResourceTracker`]; only the final artifact is moved out before the
//! run directory is swept.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use gifclip_media::{
    adjust_speed, encode_gif, move_file, post_compress, synthesize_loop, GifEncodeSpec, MediaError,
};
use gifclip_models::{constrain_parameters, estimate_size_mb, ConversionRequest, EffectiveParameters};
use gifclip_source::acquire_segment;

use crate::config::PipelineConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::tracker::ResourceTracker;

/// Final artifact of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Run the full pipeline for `request`, writing the GIF to `destination`.
///
/// The destination is the only file that survives the run; everything the
/// stages produce along the way is deleted when the run directory is swept,
/// whether the conversion succeeded or not.
pub async fn convert(
    request: &ConversionRequest,
    config: &PipelineConfig,
    destination: &Path,
) -> ConvertResult<ConversionOutput> {
    request.validate()?;

    info!(source = %request.source, "starting conversion");

    let mut tracker = ResourceTracker::create(&config.work_dir)?;
    run_stages(request, config, destination, &mut tracker).await
}

async fn run_stages(
    request: &ConversionRequest,
    config: &PipelineConfig,
    destination: &Path,
    tracker: &mut ResourceTracker,
) -> ConvertResult<ConversionOutput> {
    let work_dir = tracker.run_dir().to_path_buf();

    // Acquire the trimmed segment, from cache or by fetching the source
    let cache = config.segment_cache();
    let policy = config.retry_policy();
    let segment = acquire_segment(request, &cache, &policy, &work_dir).await?;
    tracker.register(&segment);

    // Speed remap; on fallback the original segment comes straight back
    let speeded = work_dir.join("speeded.mp4");
    let clip = adjust_speed(&segment, &speeded, request.speed).await;
    if clip != segment {
        tracker.register(&clip);
        tracker.release(&segment);
    }

    let params = effective_parameters(request);

    // Seamless loop
    let encoder_input = if request.wants_loop() {
        let looped = work_dir.join("looped.mp4");
        synthesize_loop(&clip, &looped, request.crossfade_secs)
            .await
            .map_err(loop_error)?;
        tracker.register(&looped);
        tracker.release(&clip);
        looped
    } else {
        clip
    };

    // Encode through the tier cascade
    let gif = work_dir.join("output.gif");
    let spec = GifEncodeSpec {
        width: params.width,
        fps: params.fps,
        colors: request.colors,
        loop_count: request.loop_count,
        threads: request.threads,
    };
    encode_gif(&encoder_input, &gif, &spec)
        .await
        .map_err(ConvertError::ConversionFailed)?;
    tracker.register(&gif);
    tracker.release(&encoder_input);

    // Best-effort compression pass; the GIF is already valid without it
    post_compress(&gif, request.colors, request.lossy, request.dither).await;

    // Move the artifact out before the run directory is swept
    move_file(&gif, destination).await.map_err(|e| match e {
        MediaError::Io(io) => ConvertError::Io(io),
        other => ConvertError::ConversionFailed(other),
    })?;

    let size_bytes = tokio::fs::metadata(destination).await?.len();
    info!(
        path = %destination.display(),
        size_mb = format!("{:.2}", size_bytes as f64 / 1_048_576.0),
        "conversion complete"
    );

    Ok(ConversionOutput {
        path: destination.to_path_buf(),
        size_bytes,
    })
}

/// Constrain the requested geometry to the size ceiling, warning when the
/// estimate forces a reduction.
fn effective_parameters(request: &ConversionRequest) -> EffectiveParameters {
    let duration = request.playback_duration_secs();
    let estimate = estimate_size_mb(request.width, request.fps, duration);
    let params = constrain_parameters(request.width, request.fps, duration, request.max_size_mb);

    if params.width != request.width || params.fps != request.fps {
        warn!(
            estimated_mb = format!("{:.1}", estimate),
            max_mb = request.max_size_mb,
            width = params.width,
            fps = params.fps,
            "estimated size exceeds the ceiling, reducing output parameters"
        );
    } else {
        debug!(
            estimated_mb = format!("{:.1}", estimate),
            "estimated output size within ceiling"
        );
    }

    params
}

/// A crossfade that cannot fit the clip is the operator's mistake, not an
/// engine failure; keep the two distinguishable.
fn loop_error(err: MediaError) -> ConvertError {
    match err {
        MediaError::CrossfadeTooLong { crossfade, duration } => {
            ConvertError::LoopPrecondition { crossfade, duration }
        }
        other => ConvertError::ConversionFailed(other),
    }
}
