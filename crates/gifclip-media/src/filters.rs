//! Filter graph construction for the encoding engine.
//!
//! Stages are collected as rendered expressions and joined with `;` into
//! the textual form ffmpeg consumes. Keeping the graph declarative until
//! invocation makes the loop-synthesis and palette graphs testable without
//! spawning the engine.

/// Dither algorithm applied by `paletteuse`.
pub const PALETTE_DITHER: &str = "sierra2_4a";

/// A filter graph assembled stage by stage.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    stages: Vec<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stage expression.
    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Render to the engine's textual form.
    pub fn render(&self) -> String {
        self.stages.join(";")
    }
}

/// Frame rate and lanczos width scaling, the base of every GIF encode.
pub fn scale_fps(width: u32, fps: u32) -> String {
    format!("fps={fps},scale={width}:-1:flags=lanczos")
}

/// Single-invocation palette graph: split the scaled stream, feed one leg
/// to `palettegen` and apply the result to the other.
pub fn palette_single_pass(width: u32, fps: u32, colors: u16) -> String {
    format!(
        "{},split[s0][s1];[s0]palettegen=max_colors={colors}[p];[s1][p]paletteuse=dither={PALETTE_DITHER}",
        scale_fps(width, fps)
    )
}

/// First pass of the two-pass encode: write a palette image.
pub fn palette_generation(width: u32, fps: u32, colors: u16) -> String {
    format!("{},palettegen=max_colors={colors}", scale_fps(width, fps))
}

/// Second pass of the two-pass encode: apply a palette supplied as the
/// second input.
pub fn palette_application(width: u32, fps: u32) -> String {
    format!(
        "{}[x];[x][1:v]paletteuse=dither={PALETTE_DITHER}",
        scale_fps(width, fps)
    )
}

/// Trim `[label_in]` to `[start, end)` and reset its timestamps.
pub fn trim_reset(label_in: &str, start: f64, end: f64, label_out: &str) -> String {
    format!("[{label_in}]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS[{label_out}]")
}

/// Trim plus an alpha fade spanning the whole trimmed window.
///
/// `fade_kind` is the engine's `t` parameter, `in` or `out`.
pub fn trim_fade(label_in: &str, start: f64, end: f64, fade_kind: &str, label_out: &str) -> String {
    let length = end - start;
    format!(
        "[{label_in}]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS,\
         format=pix_fmts=yuva420p,fade=t={fade_kind}:st=0:d={length:.3}:alpha=1[{label_out}]"
    )
}

/// Composite `[top]` over `[base]`.
pub fn overlay(base: &str, top: &str, label_out: &str) -> String {
    format!("[{base}][{top}]overlay[{label_out}]")
}

/// Concatenate two video-only segments.
pub fn concat_pair(first: &str, second: &str, label_out: &str) -> String {
    format!("[{first}][{second}]concat=n=2:v=1:a=0[{label_out}]")
}

/// Video timestamp scaling for speed adjustment.
pub fn speed_video(speed: f64) -> String {
    format!("setpts=PTS/{speed}")
}

/// Audio tempo chain for speed adjustment.
///
/// `atempo` only accepts factors in [0.5, 2.0], so larger adjustments are
/// expressed as a chain of links inside that range.
pub fn speed_audio(speed: f64) -> String {
    atempo_factors(speed)
        .into_iter()
        .map(|f| format!("atempo={f}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn atempo_factors(speed: f64) -> Vec<f64> {
    // The halving/doubling walk below only terminates for finite positive
    // speeds; anything else maps to the identity chain.
    if !speed.is_finite() || speed <= 0.0 {
        return vec![1.0];
    }

    let mut factors = Vec::new();
    let mut remaining = speed;

    while remaining > 2.0 {
        factors.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        factors.push(0.5);
        remaining *= 2.0;
    }
    factors.push(remaining);

    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_fps_shape() {
        let filter = scale_fps(480, 15);
        assert!(filter.contains("fps=15"));
        assert!(filter.contains("scale=480:-1"));
        assert!(filter.contains("lanczos"));
    }

    #[test]
    fn test_single_pass_palette_graph() {
        let filter = palette_single_pass(320, 12, 128);
        assert!(filter.contains("split[s0][s1]"));
        assert!(filter.contains("palettegen=max_colors=128"));
        assert!(filter.contains("paletteuse=dither=sierra2_4a"));
    }

    #[test]
    fn test_two_pass_halves() {
        assert!(palette_generation(480, 15, 64).ends_with("palettegen=max_colors=64"));
        assert!(palette_application(480, 15).contains("[x];[x][1:v]paletteuse"));
    }

    #[test]
    fn test_trim_formats_milliseconds() {
        let stage = trim_reset("0:v", 1.5, 8.25, "main");
        assert_eq!(
            stage,
            "[0:v]trim=start=1.500:end=8.250,setpts=PTS-STARTPTS[main]"
        );
    }

    #[test]
    fn test_trim_fade_spans_window() {
        let stage = trim_fade("0:v", 8.0, 10.0, "out", "tail");
        assert!(stage.contains("trim=start=8.000:end=10.000"));
        assert!(stage.contains("fade=t=out:st=0:d=2.000:alpha=1"));
        assert!(stage.contains("yuva420p"));
    }

    #[test]
    fn test_graph_renders_with_semicolons() {
        let graph = FilterGraph::new()
            .stage(trim_reset("0:v", 0.0, 1.0, "a"))
            .stage(trim_reset("0:v", 1.0, 2.0, "b"))
            .stage(concat_pair("a", "b", "out"));
        let rendered = graph.render();
        assert_eq!(rendered.matches(';').count(), 2);
        assert!(rendered.ends_with("concat=n=2:v=1:a=0[out]"));
    }

    #[test]
    fn test_atempo_chain_decomposition() {
        assert_eq!(speed_audio(1.5), "atempo=1.5");
        assert_eq!(speed_audio(4.0), "atempo=2,atempo=2");
        assert_eq!(speed_audio(0.25), "atempo=0.5,atempo=0.5");
        assert_eq!(speed_audio(5.0), "atempo=2,atempo=2,atempo=1.25");
    }

    #[test]
    fn test_atempo_chain_identity_for_unusable_speeds() {
        assert_eq!(speed_audio(f64::INFINITY), "atempo=1");
        assert_eq!(speed_audio(f64::NEG_INFINITY), "atempo=1");
        assert_eq!(speed_audio(f64::NAN), "atempo=1");
        assert_eq!(speed_audio(-2.0), "atempo=1");
        assert_eq!(speed_audio(0.0), "atempo=1");
    }

    #[test]
    fn test_speed_video_divides_pts() {
        assert_eq!(speed_video(2.0), "setpts=PTS/2");
        assert_eq!(speed_video(0.5), "setpts=PTS/0.5");
    }
}
