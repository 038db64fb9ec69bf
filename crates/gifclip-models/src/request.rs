//! Conversion request model and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quality::{DitherMode, QualityTier};
use crate::source::SourceDescriptor;

/// Default output width in pixels
pub const DEFAULT_WIDTH: u32 = 480;
/// Default output frame rate
pub const DEFAULT_FPS: u32 = 15;
/// Default segment length in seconds
pub const DEFAULT_DURATION_SECS: f64 = 5.0;
/// Default palette size (engine maximum)
pub const DEFAULT_COLORS: u16 = 256;
/// Default output size budget in megabytes
pub const DEFAULT_MAX_SIZE_MB: f64 = 50.0;

/// Smallest palette the engine accepts
pub const MIN_COLORS: u16 = 2;
/// Largest palette the GIF format supports
pub const MAX_COLORS: u16 = 256;

/// Whether the segment cache participates in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Read from and write to the segment cache.
    #[default]
    Use,
    /// Ignore the cache entirely for this run.
    Bypass,
}

impl CachePolicy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, CachePolicy::Use)
    }
}

/// Everything needed to turn one video segment into one GIF.
///
/// Immutable once built: later stages derive adjusted values (see
/// [`crate::sizing::EffectiveParameters`]) instead of mutating the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Input video, remote or local.
    pub source: SourceDescriptor,

    /// Segment start offset in seconds.
    #[serde(default)]
    pub start_secs: f64,

    /// Segment length in seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: f64,

    /// Output width in pixels (height follows the aspect ratio).
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// GIF loop count written into the container (0 = loop forever).
    #[serde(default)]
    pub loop_count: i32,

    /// Crossfade length in seconds; greater than zero enables seamless
    /// loop synthesis.
    #[serde(default)]
    pub crossfade_secs: f64,

    /// Playback speed multiplier (1.0 = unchanged).
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Palette size, 2..=256 colors.
    #[serde(default = "default_colors")]
    pub colors: u16,

    /// Lossy compression level for the post-compression pass (0 = off).
    #[serde(default)]
    pub lossy: u32,

    /// Dithering mode for the post-compression pass.
    #[serde(default)]
    pub dither: DitherMode,

    /// Advisory output size budget in megabytes.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: f64,

    /// Rendition quality tier for remote sources.
    #[serde(default)]
    pub quality: QualityTier,

    /// Encoder thread count (0 = all available cores).
    #[serde(default)]
    pub threads: u32,

    /// Segment cache participation.
    #[serde(default)]
    pub cache: CachePolicy,
}

fn default_duration() -> f64 {
    DEFAULT_DURATION_SECS
}
fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_speed() -> f64 {
    1.0
}
fn default_colors() -> u16 {
    DEFAULT_COLORS
}
fn default_max_size_mb() -> f64 {
    DEFAULT_MAX_SIZE_MB
}

/// Validation failures detected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("start offset {0} must be finite and non-negative")]
    NegativeStart(f64),
    #[error("duration {0} must be finite and greater than zero")]
    InvalidDuration(f64),
    #[error("crossfade {crossfade} must satisfy 0 <= crossfade < duration ({duration})")]
    InvalidCrossfade { crossfade: f64, duration: f64 },
    #[error("speed {0} must be finite and greater than zero")]
    InvalidSpeed(f64),
    #[error("palette size {0} must be between {MIN_COLORS} and {MAX_COLORS}")]
    InvalidColors(u16),
    #[error("width {0} must be greater than zero")]
    InvalidWidth(u32),
    #[error("frame rate {0} must be greater than zero")]
    InvalidFps(u32),
    #[error("size budget {0} must be finite and greater than zero")]
    InvalidMaxSize(f64),
}

impl ConversionRequest {
    /// Create a request for `source` with default parameters.
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            start_secs: 0.0,
            duration_secs: DEFAULT_DURATION_SECS,
            width: DEFAULT_WIDTH,
            fps: DEFAULT_FPS,
            loop_count: 0,
            crossfade_secs: 0.0,
            speed: 1.0,
            colors: DEFAULT_COLORS,
            lossy: 0,
            dither: DitherMode::default(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            quality: QualityTier::default(),
            threads: 0,
            cache: CachePolicy::default(),
        }
    }

    /// Returns the request with an updated segment window.
    pub fn with_window(mut self, start_secs: f64, duration_secs: f64) -> Self {
        self.start_secs = start_secs;
        self.duration_secs = duration_secs;
        self
    }

    /// Returns the request with updated output geometry.
    pub fn with_output(mut self, width: u32, fps: u32) -> Self {
        self.width = width;
        self.fps = fps;
        self
    }

    /// Returns the request with seamless looping enabled.
    pub fn with_crossfade(mut self, crossfade_secs: f64) -> Self {
        self.crossfade_secs = crossfade_secs;
        self
    }

    /// Returns the request with an updated playback speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// True when loop synthesis was requested.
    pub fn wants_loop(&self) -> bool {
        self.crossfade_secs > 0.0
    }

    /// Segment length after speed adjustment, which is what the encoder
    /// actually sees.
    pub fn playback_duration_secs(&self) -> f64 {
        self.duration_secs / self.speed
    }

    /// Check every invariant that can be checked without touching I/O.
    ///
    /// Every float field must be finite: infinities and NaN parse fine on
    /// the command line but have no meaning downstream.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !self.start_secs.is_finite() || self.start_secs < 0.0 {
            return Err(RequestError::NegativeStart(self.start_secs));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(RequestError::InvalidDuration(self.duration_secs));
        }
        if !self.crossfade_secs.is_finite()
            || self.crossfade_secs < 0.0
            || self.crossfade_secs >= self.duration_secs
        {
            return Err(RequestError::InvalidCrossfade {
                crossfade: self.crossfade_secs,
                duration: self.duration_secs,
            });
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(RequestError::InvalidSpeed(self.speed));
        }
        if self.colors < MIN_COLORS || self.colors > MAX_COLORS {
            return Err(RequestError::InvalidColors(self.colors));
        }
        if self.width == 0 {
            return Err(RequestError::InvalidWidth(self.width));
        }
        if self.fps == 0 {
            return Err(RequestError::InvalidFps(self.fps));
        }
        if !self.max_size_mb.is_finite() || self.max_size_mb <= 0.0 {
            return Err(RequestError::InvalidMaxSize(self.max_size_mb));
        }
        Ok(())
    }
}
