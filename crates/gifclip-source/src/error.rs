//! Source-layer error types.

use std::path::PathBuf;

use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("no suitable rendition: {reason}")]
    NoSuitableFormat { reason: String },

    #[error("download failed for {id}: {message}")]
    DownloadFailed { id: String, message: String },

    #[error(
        "access to {id} is restricted ({message}); \
         the video may be private, age-restricted or region-locked"
    )]
    AccessRestricted { id: String, message: String },

    #[error(
        "rate limited while fetching {id} ({message}); \
         wait a few minutes before trying again"
    )]
    RateLimited { id: String, message: String },

    #[error("source file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("media error: {0}")]
    Media(#[from] gifclip_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    pub fn no_suitable_format(reason: impl Into<String>) -> Self {
        Self::NoSuitableFormat {
            reason: reason.into(),
        }
    }

    pub fn download_failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Classify a yt-dlp failure from its stderr.
///
/// Access walls (403, private, age or region restrictions) and rate
/// limiting (429, sign-in bot checks) get dedicated variants so the
/// operator sees remediation text instead of a raw tool dump. Everything
/// else becomes a plain download failure carrying the last stderr line.
pub fn classify_fetch_failure(id: &str, stderr: &str) -> SourceError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("unknown error")
        .trim()
        .to_string();
    let lower = stderr.to_lowercase();

    let age_restricted =
        lower.contains("age") && (lower.contains("restrict") || lower.contains("confirm your age"));

    if age_restricted
        || stderr.contains("403")
        || lower.contains("forbidden")
        || lower.contains("private video")
        || lower.contains("not available in your country")
    {
        return SourceError::AccessRestricted {
            id: id.to_string(),
            message,
        };
    }

    if stderr.contains("429")
        || lower.contains("too many requests")
        || lower.contains("rate limit")
        || lower.contains("sign in to confirm")
    {
        return SourceError::RateLimited {
            id: id.to_string(),
            message,
        };
    }

    SourceError::DownloadFailed {
        id: id.to_string(),
        message,
    }
}
