//! Output size estimation and parameter constraint.
//!
//! The estimate models an uncompressed quantized frame sequence with an
//! empirical 0.56 packing factor. Accuracy is not the point; the point is a
//! stable, monotonic heuristic that pulls width and frame rate down before
//! encoding when the operator's size budget would clearly be blown.

use serde::Serialize;

/// Frame rate is never reduced below this, however tight the budget.
pub const FPS_FLOOR: u32 = 10;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Width and frame rate actually handed to the encoder.
///
/// Derived once from the request; the request itself stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveParameters {
    pub width: u32,
    pub fps: u32,
}

/// Estimated output size in megabytes for the given geometry.
pub fn estimate_size_mb(width: u32, fps: u32, duration_secs: f64) -> f64 {
    let frames = fps as f64 * duration_secs;
    let bits_per_frame = (width as f64) * (width as f64) * 0.56 * 3.0;
    frames * bits_per_frame / (8.0 * BYTES_PER_MB)
}

/// Constrain width and frame rate to the size budget.
///
/// When the estimate exceeds `max_size_mb`, width shrinks by the square
/// root of the overshoot and frame rate by a softened factor of the same,
/// floored at [`FPS_FLOOR`]. Advisory only: the actual output is never
/// measured against the budget afterwards.
pub fn constrain_parameters(
    width: u32,
    fps: u32,
    duration_secs: f64,
    max_size_mb: f64,
) -> EffectiveParameters {
    let estimate = estimate_size_mb(width, fps, duration_secs);
    if estimate <= max_size_mb {
        return EffectiveParameters { width, fps };
    }

    let reduction = (estimate / max_size_mb).sqrt();
    let width = (width as f64 / reduction).floor() as u32;
    let fps = ((fps as f64 / (reduction * 0.7)).floor() as u32).max(FPS_FLOOR);

    EffectiveParameters { width, fps }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_exact_arithmetic() {
        // 480 px, 30 fps, 5 s:
        // frames = 150, bits/frame = 480^2 * 0.56 * 3 = 387072,
        // 150 * 387072 / (8 * 1048576) = 6.9213867...
        let mb = estimate_size_mb(480, 30, 5.0);
        assert!((mb - 6.921_386_718_75).abs() < 1e-9);
    }

    #[test]
    fn test_within_budget_is_untouched() {
        let params = constrain_parameters(480, 30, 5.0, 50.0);
        assert_eq!(params, EffectiveParameters { width: 480, fps: 30 });
    }

    #[test]
    fn test_over_budget_reduces_both_axes() {
        // 1920 px, 30 fps, 10 s estimates 221.484375 MB against a 50 MB
        // budget: reduction = sqrt(4.4296875) = 2.10468..., so width
        // floors to 912 and fps to 20.
        let estimate = estimate_size_mb(1920, 30, 10.0);
        assert!((estimate - 221.484_375).abs() < 1e-9);

        let params = constrain_parameters(1920, 30, 10.0, 50.0);
        assert_eq!(params, EffectiveParameters { width: 912, fps: 20 });
    }

    #[test]
    fn test_fps_floor_holds() {
        // A tiny budget would push fps far below 10 without the floor.
        let params = constrain_parameters(1920, 24, 30.0, 0.5);
        assert_eq!(params.fps, FPS_FLOOR);
        assert!(params.width < 1920);
    }

    #[test]
    fn test_estimate_monotonic_in_each_axis() {
        let base = estimate_size_mb(480, 15, 5.0);
        assert!(estimate_size_mb(960, 15, 5.0) > base);
        assert!(estimate_size_mb(480, 30, 5.0) > base);
        assert!(estimate_size_mb(480, 15, 10.0) > base);
    }
}
