//! Playback speed preprocessing.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::filters;
use crate::probe::probe_video;

/// Remap `input` to the requested playback speed, writing to `output`.
///
/// Returns the path later stages should read: `output` when the remap
/// succeeded, `input` when speed is 1.0 or the engine failed. Speed is a
/// best-effort stage; a failure warns and keeps the original timing
/// rather than aborting the run.
pub async fn adjust_speed(input: &Path, output: &Path, speed: f64) -> PathBuf {
    if (speed - 1.0).abs() < f64::EPSILON {
        debug!("speed is 1.0, skipping remap");
        return input.to_path_buf();
    }

    info!(speed, "remapping playback speed");

    match run_speed_remap(input, output, speed).await {
        Ok(()) => output.to_path_buf(),
        Err(e) => {
            warn!(error = %e, "speed remap failed, continuing with original timing");
            input.to_path_buf()
        }
    }
}

async fn run_speed_remap(
    input: &Path,
    output: &Path,
    speed: f64,
) -> crate::error::MediaResult<()> {
    // Audio gets a tempo chain only when the input actually carries audio;
    // an atempo branch against a missing stream fails the whole command.
    let has_audio = probe_video(input).await?.has_audio;

    let cmd = if has_audio {
        FfmpegCommand::new(input, output)
            .filter_complex(format!(
                "[0:v]{}[v];[0:a]{}[a]",
                filters::speed_video(speed),
                filters::speed_audio(speed)
            ))
            .output_args(["-map", "[v]", "-map", "[a]"])
            .video_codec("libx264")
            .preset("fast")
            .crf(18)
            .audio_codec("aac")
    } else {
        FfmpegCommand::new(input, output)
            .video_filter(filters::speed_video(speed))
            .video_codec("libx264")
            .preset("fast")
            .crf(18)
    };

    FfmpegRunner::new().run(&cmd).await
}
