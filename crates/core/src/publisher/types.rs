//! Types for per-network publishing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::job::{ErrorCode, ErrorDetail};

/// Payload for one publish attempt, scoped to exactly one target network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    /// The (possibly transcoded) media file to upload.
    pub media_path: PathBuf,
    /// Title to publish under.
    pub title: String,
    /// Optional description/caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The single network this attempt targets.
    pub network: String,
}

/// Per-network result of a publish attempt. Ephemeral; aggregated into the
/// job's `published_urls`/`error` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// The network the attempt targeted.
    pub network: String,
    /// Whether the publish succeeded.
    pub success: bool,
    /// Published identifier/URL on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_id: Option<String>,
    /// Structured error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl PublishOutcome {
    /// A successful outcome.
    pub fn ok(network: impl Into<String>, published_id: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            success: true,
            published_id: Some(published_id.into()),
            error: None,
        }
    }

    /// A failed outcome.
    pub fn failed(network: impl Into<String>, error: ErrorDetail) -> Self {
        Self {
            network: network.into(),
            success: false,
            published_id: None,
            error: Some(error),
        }
    }

    /// The error to surface for this outcome, defaulting when a failed
    /// outcome arrived without detail.
    pub fn error_or_unknown(&self) -> ErrorDetail {
        self.error.clone().unwrap_or_else(|| {
            ErrorDetail::new(ErrorCode::UnknownError, "publish failed without detail")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_outcome() {
        let outcome = PublishOutcome::ok("youtube", "yt-123");
        assert!(outcome.success);
        assert_eq!(outcome.published_id.as_deref(), Some("yt-123"));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failed_outcome_carries_error() {
        let outcome = PublishOutcome::failed(
            "tiktok",
            ErrorDetail::new(ErrorCode::PublisherRejected, "rejected"),
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_ref().map(|e| e.code),
            Some(ErrorCode::PublisherRejected)
        );
    }
}
