//! Source descriptors and remote-source parsing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the input video comes from. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A remote video identified by its platform id.
    Remote { id: String },
    /// A video file already on local disk.
    Local { path: PathBuf },
}

impl SourceDescriptor {
    pub fn remote(id: impl Into<String>) -> Self {
        SourceDescriptor::Remote { id: id.into() }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::Local { path: path.into() }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceDescriptor::Remote { .. })
    }

    /// Short human-readable form for log fields.
    pub fn describe(&self) -> String {
        match self {
            SourceDescriptor::Remote { id } => format!("remote:{id}"),
            SourceDescriptor::Local { path } => format!("local:{}", path.display()),
        }
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Errors from parsing a remote source argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceParseError {
    #[error("not a recognized video URL or id: {0}")]
    NotAVideoUrl(String),
    #[error("no video id found in URL: {0}")]
    IdNotFound(String),
    #[error("malformed video id '{0}': expected 11 URL-safe characters")]
    MalformedId(String),
}

/// Video ids are exactly 11 characters drawn from [A-Za-z0-9_-].
const ID_LEN: usize = 11;

/// Path markers whose following segment carries the video id.
const PATH_MARKERS: [&str; 4] = ["youtu.be/", "/embed/", "/shorts/", "/v/"];

/// Parse a remote source argument into a video id.
///
/// Accepts a bare 11-character id or any of the common URL shapes:
/// `watch?v=ID`, `youtu.be/ID`, `/embed/ID`, `/v/ID`, `/shorts/ID`,
/// with or without trailing query parameters and fragments.
pub fn parse_video_source(input: &str) -> Result<String, SourceParseError> {
    let input = input.trim();

    if is_well_formed_id(input) {
        return Ok(input.to_string());
    }

    let lowered = input.to_ascii_lowercase();
    if !lowered.contains("youtube.com") && !lowered.contains("youtu.be") {
        return Err(SourceParseError::NotAVideoUrl(input.to_string()));
    }

    if let Some(raw) = query_parameter(input, "v=") {
        return check_id(raw);
    }

    for marker in PATH_MARKERS {
        if let Some(raw) = segment_after(input, marker) {
            return check_id(raw);
        }
    }

    Err(SourceParseError::IdNotFound(input.to_string()))
}

/// Value of `?v=` / `&v=` up to the next delimiter, if present.
fn query_parameter<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    for prefix in ['?', '&'] {
        let needle = format!("{prefix}{key}");
        if let Some(pos) = url.find(&needle) {
            return Some(clip_segment(&url[pos + needle.len()..]));
        }
    }
    None
}

/// Path segment following `marker`, up to the next delimiter, if non-empty.
fn segment_after<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    let pos = url.find(marker)?;
    let rest = clip_segment(&url[pos + marker.len()..]);
    (!rest.is_empty()).then_some(rest)
}

/// Cut a candidate segment at the first URL delimiter.
fn clip_segment(segment: &str) -> &str {
    let end = segment
        .find(|c| matches!(c, '&' | '#' | '?' | '/'))
        .unwrap_or(segment.len());
    &segment[..end]
}

fn is_well_formed_id(candidate: &str) -> bool {
    candidate.len() == ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_id(candidate: &str) -> Result<String, SourceParseError> {
    if is_well_formed_id(candidate) {
        Ok(candidate.to_string())
    } else {
        Err(SourceParseError::MalformedId(candidate.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_shapes() {
        for url in [
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "  https://youtube.com/watch?v=dQw4w9WgXcQ  ",
        ] {
            assert_eq!(parse_video_source(url).unwrap(), "dQw4w9WgXcQ", "url: {url}");
        }
    }

    #[test]
    fn test_parse_bare_id() {
        assert_eq!(parse_video_source("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(parse_video_source("abc-DEF_123").unwrap(), "abc-DEF_123");
    }

    #[test]
    fn test_parse_rejects_foreign_urls() {
        assert!(matches!(
            parse_video_source("https://vimeo.com/123456"),
            Err(SourceParseError::NotAVideoUrl(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_id() {
        assert!(matches!(
            parse_video_source("https://youtube.com"),
            Err(SourceParseError::IdNotFound(_))
        ));
        assert!(matches!(
            parse_video_source("https://youtu.be/"),
            Err(SourceParseError::IdNotFound(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        // too short
        assert!(matches!(
            parse_video_source("https://youtube.com/watch?v=abc123"),
            Err(SourceParseError::MalformedId(_))
        ));
        // too long
        assert!(matches!(
            parse_video_source("https://youtu.be/abc123def4567890"),
            Err(SourceParseError::MalformedId(_))
        ));
        // bad characters
        assert!(matches!(
            parse_video_source("https://youtube.com/watch?v=abc!23def45"),
            Err(SourceParseError::MalformedId(_))
        ));
    }

    #[test]
    fn test_descriptor_describe() {
        assert_eq!(SourceDescriptor::remote("dQw4w9WgXcQ").describe(), "remote:dQw4w9WgXcQ");
        assert!(SourceDescriptor::local("/tmp/in.mp4").describe().starts_with("local:"));
        assert!(SourceDescriptor::remote("x").is_remote());
        assert!(!SourceDescriptor::local("x.mp4").is_remote());
    }
}
