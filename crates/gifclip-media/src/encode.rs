//! Tiered GIF encoding.
//!
//! Palette quality degrades tier by tier, never the other way around: the
//! single-pass palette graph is tried first, then the two-pass variant
//! (more robust on filter-graph quirks since each pass is simpler), then a
//! plain scale with the engine's default palette, and finally a raw
//! hand-assembled command that sidesteps the builder entirely.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::{check_ffmpeg, verify_output, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters;

/// Parameters for one GIF encode, already size-constrained.
#[derive(Debug, Clone)]
pub struct GifEncodeSpec {
    pub width: u32,
    pub fps: u32,
    pub colors: u16,
    /// GIF container loop count (0 = forever).
    pub loop_count: i32,
    /// Encoder threads (0 = engine default).
    pub threads: u32,
}

/// One strategy in the fallback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeTier {
    /// Palette generation and application in a single invocation.
    SinglePassPalette,
    /// Separate palette pass writing an intermediate palette image.
    TwoPassPalette,
    /// Scale and frame rate only, engine default palette.
    Basic,
    /// Hand-assembled command bypassing the builder.
    RawCommand,
}

impl EncodeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodeTier::SinglePassPalette => "single-pass-palette",
            EncodeTier::TwoPassPalette => "two-pass-palette",
            EncodeTier::Basic => "basic",
            EncodeTier::RawCommand => "raw-command",
        }
    }
}

/// The fallback sequence, in the order attempted.
pub const ENCODE_CASCADE: [EncodeTier; 4] = [
    EncodeTier::SinglePassPalette,
    EncodeTier::TwoPassPalette,
    EncodeTier::Basic,
    EncodeTier::RawCommand,
];

/// Encode `input` to a GIF at `output`, walking the cascade until one tier
/// produces a non-empty file. The last engine error surfaces when every
/// tier fails.
pub async fn encode_gif(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &GifEncodeSpec,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut last_error: Option<MediaError> = None;

    for tier in ENCODE_CASCADE {
        debug!(tier = tier.as_str(), "attempting GIF encode");

        let result = match tier {
            EncodeTier::SinglePassPalette => encode_single_pass(input, output, spec).await,
            EncodeTier::TwoPassPalette => encode_two_pass(input, output, spec).await,
            EncodeTier::Basic => encode_basic(input, output, spec).await,
            EncodeTier::RawCommand => encode_raw(input, output, spec).await,
        };

        match result {
            Ok(()) => {
                info!(tier = tier.as_str(), output = %output.display(), "GIF encoded");
                return Ok(());
            }
            Err(e) => {
                warn!(tier = tier.as_str(), error = %e, "encode tier failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| MediaError::ffmpeg_failed("no encode tier was attempted", None, None)))
}

async fn encode_single_pass(input: &Path, output: &Path, spec: &GifEncodeSpec) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(input, output)
        .video_filter(filters::palette_single_pass(
            spec.width, spec.fps, spec.colors,
        ))
        .gif_loop(spec.loop_count)
        .threads(spec.threads);

    FfmpegRunner::new().run(&cmd).await
}

async fn encode_two_pass(input: &Path, output: &Path, spec: &GifEncodeSpec) -> MediaResult<()> {
    // The palette image lives only as long as this attempt
    let palette = tempfile::Builder::new()
        .prefix("gifclip-palette-")
        .suffix(".png")
        .tempfile()?
        .into_temp_path();

    let generate = FfmpegCommand::new(input, &palette)
        .video_filter(filters::palette_generation(
            spec.width, spec.fps, spec.colors,
        ))
        .output_args(["-update", "1"]);
    FfmpegRunner::new().run(&generate).await?;

    let apply = FfmpegCommand::new(input, output)
        .input(&palette)
        .filter_complex(filters::palette_application(spec.width, spec.fps))
        .gif_loop(spec.loop_count)
        .threads(spec.threads);
    FfmpegRunner::new().run(&apply).await
}

async fn encode_basic(input: &Path, output: &Path, spec: &GifEncodeSpec) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(input, output)
        .video_filter(filters::scale_fps(spec.width, spec.fps))
        .gif_loop(spec.loop_count)
        .threads(spec.threads);

    FfmpegRunner::new().run(&cmd).await
}

/// Last resort: skip the builder and hand ffmpeg a bare argument list,
/// trying the palette filter first and a plain scale second.
async fn encode_raw(input: &Path, output: &Path, spec: &GifEncodeSpec) -> MediaResult<()> {
    let attempts = [
        filters::palette_single_pass(spec.width, spec.fps, spec.colors),
        filters::scale_fps(spec.width, spec.fps),
    ];

    let mut last_error: Option<MediaError> = None;
    for filter in attempts {
        match run_raw(input, output, &filter, spec.loop_count).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!(error = %e, "raw command attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| MediaError::ffmpeg_failed("no raw attempt was made", None, None)))
}

async fn run_raw(input: &Path, output: &Path, filter: &str, loop_count: i32) -> MediaResult<()> {
    check_ffmpeg()?;

    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(input)
        .arg("-vf")
        .arg(filter)
        .arg("-loop")
        .arg(loop_count.to_string())
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "raw GIF command failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }

    verify_output(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order_degrades() {
        assert_eq!(ENCODE_CASCADE[0], EncodeTier::SinglePassPalette);
        assert_eq!(ENCODE_CASCADE[1], EncodeTier::TwoPassPalette);
        assert_eq!(ENCODE_CASCADE[2], EncodeTier::Basic);
        assert_eq!(ENCODE_CASCADE[3], EncodeTier::RawCommand);
    }

    #[test]
    fn test_tier_names() {
        assert_eq!(EncodeTier::SinglePassPalette.as_str(), "single-pass-palette");
        assert_eq!(EncodeTier::RawCommand.as_str(), "raw-command");
    }
}
