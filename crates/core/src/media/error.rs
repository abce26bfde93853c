//! Error types for probing and transcoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::ErrorCode;

/// Errors from the media layer.
///
/// Probe failures are distinct from transcode failures: without metadata no
/// plan can be computed, so a probe failure short-circuits evaluation.
#[derive(Debug, Error)]
pub enum MediaError {
    /// ffmpeg binary not found.
    #[error("ffmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// ffprobe binary not found.
    #[error("ffprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The file probed but carries no video stream.
    #[error("no video stream in file: {path}")]
    NoVideoStream { path: PathBuf },

    /// Probe process failed.
    #[error("failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse probe output.
    #[error("failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// Transcode process failed.
    #[error("transcode failed: {reason}")]
    TranscodeFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Transcode exceeded the configured time limit.
    #[error("transcode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    pub fn transcode_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TranscodeFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// The stable error code recorded on the job when this error surfaces.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::FfprobeNotFound { .. }
            | Self::InputNotFound { .. }
            | Self::NoVideoStream { .. }
            | Self::ProbeFailed { .. }
            | Self::ParseError { .. } => ErrorCode::ProbeError,
            Self::FfmpegNotFound { .. }
            | Self::TranscodeFailed { .. }
            | Self::Timeout { .. }
            | Self::Io(_) => ErrorCode::TranscodeError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_errors_map_to_probe_code() {
        let err = MediaError::NoVideoStream {
            path: PathBuf::from("/a.mp3"),
        };
        assert_eq!(err.error_code(), ErrorCode::ProbeError);
        assert_eq!(
            MediaError::probe_failed("bad stream").error_code(),
            ErrorCode::ProbeError
        );
    }

    #[test]
    fn test_transcode_errors_map_to_transcode_code() {
        let err = MediaError::transcode_failed("exit 1", Some("stderr".into()));
        assert_eq!(err.error_code(), ErrorCode::TranscodeError);
        assert_eq!(
            MediaError::Timeout { timeout_secs: 60 }.error_code(),
            ErrorCode::TranscodeError
        );
    }
}
