//! Pipeline error taxonomy.
//!
//! Lower layers keep their own error enums; everything funnels into
//! [`ConvertError`] at the pipeline boundary so the operator sees one
//! classified failure with a stable exit code.

use thiserror::Error;

use gifclip_media::MediaError;
use gifclip_models::{RequestError, SourceParseError};
use gifclip_source::SourceError;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("exactly one of a remote URL or a local input file is required")]
    InputConflict,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("no suitable format: {0}")]
    NoSuitableFormat(String),

    #[error("segment extraction failed: {0}")]
    ExtractionFailed(#[source] MediaError),

    #[error("crossfade {crossfade}s must be shorter than the clip ({duration}s)")]
    LoopPrecondition { crossfade: f64, duration: f64 },

    #[error("conversion failed: {0}")]
    ConversionFailed(#[source] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Per-class process exit code, for scripting against the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::InputConflict
            | ConvertError::InvalidParameter(_)
            | ConvertError::LoopPrecondition { .. } => 2,
            ConvertError::SourceUnavailable(_) => 3,
            ConvertError::NoSuitableFormat(_) => 4,
            ConvertError::ExtractionFailed(_) => 5,
            ConvertError::ConversionFailed(_) => 6,
            ConvertError::Io(_) => 1,
        }
    }
}

impl From<RequestError> for ConvertError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::InvalidCrossfade {
                crossfade,
                duration,
            } => ConvertError::LoopPrecondition {
                crossfade,
                duration,
            },
            other => ConvertError::InvalidParameter(other.to_string()),
        }
    }
}

impl From<SourceParseError> for ConvertError {
    fn from(e: SourceParseError) -> Self {
        ConvertError::InvalidParameter(e.to_string())
    }
}

impl From<SourceError> for ConvertError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NoSuitableFormat { reason } => ConvertError::NoSuitableFormat(reason),
            SourceError::Media(media) => ConvertError::ExtractionFailed(media),
            other => ConvertError::SourceUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossfade_violation_maps_to_loop_precondition() {
        let err: ConvertError = RequestError::InvalidCrossfade {
            crossfade: 5.0,
            duration: 5.0,
        }
        .into();
        assert!(matches!(err, ConvertError::LoopPrecondition { .. }));

        let err: ConvertError = RequestError::InvalidSpeed(0.0).into();
        assert!(matches!(err, ConvertError::InvalidParameter(_)));
    }

    #[test]
    fn test_source_error_classification() {
        let err: ConvertError = SourceError::no_suitable_format("empty set").into();
        assert!(matches!(err, ConvertError::NoSuitableFormat(_)));

        let err: ConvertError = SourceError::download_failed("vid", "boom").into();
        assert!(matches!(err, ConvertError::SourceUnavailable(_)));
    }

    #[test]
    fn test_exit_codes_are_stable() {
        assert_eq!(ConvertError::InputConflict.exit_code(), 2);
        assert_eq!(
            ConvertError::invalid_parameter("bad").exit_code(),
            2
        );
        assert_eq!(
            ConvertError::SourceUnavailable(SourceError::download_failed("v", "x")).exit_code(),
            3
        );
        assert_eq!(ConvertError::NoSuitableFormat("none".into()).exit_code(), 4);
        assert_eq!(
            ConvertError::LoopPrecondition {
                crossfade: 5.0,
                duration: 5.0
            }
            .exit_code(),
            2
        );
    }
}
