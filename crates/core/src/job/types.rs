//! Core job data types.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-supplied request to publish one video to a set of networks.
///
/// Immutable once accepted; the job carries it verbatim for every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Path to the source media file.
    pub media_path: PathBuf,
    /// Title to publish under.
    pub title: String,
    /// Optional description/caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target network identifiers (e.g. "youtube", "tiktok"). Must be non-empty.
    pub networks: Vec<String>,
    /// Optional future publish time. Absent means publish as soon as possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl PublishRequest {
    /// Validates the request before acceptance.
    pub fn validate(&self) -> Result<(), String> {
        if self.networks.is_empty() {
            return Err("at least one target network is required".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

/// Lifecycle status of a job.
///
/// `Queued → Processing → {Published | Queued (retry) | Failed}`.
/// `Canceled` is only ever set by external intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Published,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Stable string form, also used as the SQL column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Terminal jobs are never re-enqueued automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Failed | Self::Canceled)
    }

    /// Whether a job in this status may be canceled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProbeError,
    TranscodeError,
    UnsupportedRatio,
    UnsupportedDuration,
    FileTooLarge,
    MissingPublisherCredentials,
    PublisherNetworkError,
    PublisherRejected,
    UploadFailed,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbeError => "probe_error",
            Self::TranscodeError => "transcode_error",
            Self::UnsupportedRatio => "unsupported_ratio",
            Self::UnsupportedDuration => "unsupported_duration",
            Self::FileTooLarge => "file_too_large",
            Self::MissingPublisherCredentials => "missing_publisher_credentials",
            Self::PublisherNetworkError => "publisher_network_error",
            Self::PublisherRejected => "publisher_rejected",
            Self::UploadFailed => "upload_failed",
            Self::UnknownError => "unknown_error",
        }
    }
}

/// A structured failure record: stable code, human message, optional details.
///
/// Used both as the job-level error and as per-network publish errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The durable unit of work: one publish request tracked through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job id (UUID v4).
    pub id: String,
    /// The originating request payload.
    pub request: PublishRequest,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time; bumped by every store write.
    pub updated_at: DateTime<Utc>,
    /// Not eligible for dispatch before this time. Absent means due immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    /// When the most recent attempt started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    /// Most recent failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Network → published identifier/URL, populated only on full success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_urls: Option<HashMap<String, String>>,
}
