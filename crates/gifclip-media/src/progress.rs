//! FFmpeg progress reporting.

use serde::Serialize;

/// Snapshot of FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Current encoding rate in frames per second
    pub fps: f64,
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (1.5 = 1.5x)
    pub speed: f64,
    /// Set once the final progress record arrives
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_duration_ms` already written, clamped to 100.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}
