//! Seamless loop synthesis.
//!
//! A clip loops seamlessly when its tail blends into its head. The graph
//! built here splits the input into three windows: the body, the last
//! `crossfade` seconds fading out, and the first `crossfade` seconds
//! fading in. Overlaying the fading head on the fading tail yields the
//! transition, and body + transition plays back as an endless loop.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{self, FilterGraph};
use crate::probe::probe_video;

/// Output label of the loop graph, mapped into the output file.
pub const LOOP_OUTPUT_LABEL: &str = "looped";

/// Build the crossfade loop graph for a clip of `total_secs`.
///
/// Windows, with `T = total_secs` and `X = crossfade_secs`:
/// body `[X, T-X]`, fade-out tail `[T-X, T]`, fade-in head `[0, X]`.
/// Callers must ensure `0 < X < T`.
pub fn loop_filter_graph(total_secs: f64, crossfade_secs: f64) -> FilterGraph {
    let body_end = total_secs - crossfade_secs;

    FilterGraph::new()
        .stage(filters::trim_reset("0:v", crossfade_secs, body_end, "body"))
        .stage(filters::trim_fade("0:v", body_end, total_secs, "out", "tail"))
        .stage(filters::trim_fade("0:v", 0.0, crossfade_secs, "in", "head"))
        .stage(filters::overlay("tail", "head", "transition"))
        .stage(filters::concat_pair("body", "transition", LOOP_OUTPUT_LABEL))
}

/// Rewrite `input` into `output` so that it loops seamlessly.
///
/// The crossfade must be strictly shorter than the clip; an engine failure
/// here is terminal because the operator explicitly asked for the loop.
pub async fn synthesize_loop(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    crossfade_secs: f64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let total_secs = probe_video(input).await?.duration;
    if crossfade_secs >= total_secs {
        return Err(MediaError::CrossfadeTooLong {
            crossfade: crossfade_secs,
            duration: total_secs,
        });
    }

    info!(
        total = total_secs,
        crossfade = crossfade_secs,
        "synthesizing seamless loop"
    );

    let graph = loop_filter_graph(total_secs, crossfade_secs);
    let cmd = FfmpegCommand::new(input, output)
        .filter_complex(graph.render())
        .output_args(["-map", &format!("[{LOOP_OUTPUT_LABEL}]")])
        .video_codec("libx264")
        .preset("fast")
        .crf(18)
        .output_arg("-an");

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_windows_for_ten_second_clip() {
        let rendered = loop_filter_graph(10.0, 2.0).render();

        // body spans [X, T-X]
        assert!(rendered.contains("trim=start=2.000:end=8.000"));
        // fading tail spans [T-X, T]
        assert!(rendered.contains("trim=start=8.000:end=10.000"));
        // fading head spans [0, X]
        assert!(rendered.contains("trim=start=0.000:end=2.000"));
        // both fades run the full crossfade length
        assert!(rendered.contains("fade=t=out:st=0:d=2.000"));
        assert!(rendered.contains("fade=t=in:st=0:d=2.000"));
    }

    #[test]
    fn test_graph_composites_then_concatenates() {
        let rendered = loop_filter_graph(6.0, 1.5).render();

        let overlay_pos = rendered.find("[tail][head]overlay[transition]").unwrap();
        let concat_pos = rendered
            .find("[body][transition]concat=n=2:v=1:a=0[looped]")
            .unwrap();
        assert!(overlay_pos < concat_pos, "transition must exist before concat");
    }

    #[test]
    fn test_graph_stage_count() {
        let graph = loop_filter_graph(10.0, 2.0);
        assert_eq!(graph.stage_count(), 5);
    }

    #[test]
    fn test_subsecond_crossfade_formatting() {
        let rendered = loop_filter_graph(3.0, 0.25).render();
        assert!(rendered.contains("trim=start=0.250:end=2.750"));
        assert!(rendered.contains("d=0.250"));
    }
}
