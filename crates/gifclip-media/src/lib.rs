#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for GIF conversion.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress parsing
//! - Video probing via ffprobe
//! - Segment window extraction (container copy with transcode fallback)
//! - Speed preprocessing and seamless-loop synthesis filter graphs
//! - The tiered GIF encoding cascade
//! - Optional gifsicle post-compression
//!
//! Everything here shells out to external tools; nothing decodes media
//! in-process.

pub mod command;
pub mod compress;
pub mod encode;
pub mod error;
pub mod extract;
pub mod filters;
pub mod fs_utils;
pub mod loop_synth;
pub mod probe;
pub mod progress;
pub mod speed;

pub use command::{check_ffmpeg, check_ffprobe, check_gifsicle, FfmpegCommand, FfmpegRunner};
pub use compress::post_compress;
pub use encode::{encode_gif, EncodeTier, GifEncodeSpec, ENCODE_CASCADE};
pub use error::{MediaError, MediaResult};
pub use extract::extract_window;
pub use filters::FilterGraph;
pub use fs_utils::move_file;
pub use loop_synth::{loop_filter_graph, synthesize_loop};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use speed::adjust_speed;
