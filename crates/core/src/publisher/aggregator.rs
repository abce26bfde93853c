//! Generic aggregator-backed publisher.
//!
//! Uploads media to a third-party aggregation service that relays the post to
//! the requested network. Used as the registry fallback for networks without
//! a native integration.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::AggregatorConfig;
use super::traits::Publisher;
use super::types::{PublishOutcome, PublishPayload};
use crate::job::{ErrorCode, ErrorDetail};

/// Publisher backed by a generic upload aggregator API.
pub struct AggregatorPublisher {
    config: AggregatorConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AggregatorResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl AggregatorPublisher {
    pub fn new(config: AggregatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    async fn upload(&self, payload: &PublishPayload) -> Result<String, ErrorDetail> {
        // Stream the file rather than buffering it; uploads can be multiple
        // gigabytes.
        let file = tokio::fs::File::open(&payload.media_path).await.map_err(|e| {
            ErrorDetail::new(
                ErrorCode::UploadFailed,
                format!("failed to read media file: {}", e),
            )
        })?;
        let file_len = file
            .metadata()
            .await
            .map_err(|e| {
                ErrorDetail::new(
                    ErrorCode::UploadFailed,
                    format!("failed to read media file: {}", e),
                )
            })?
            .len();

        let file_name = payload
            .media_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::stream_with_length(reqwest::Body::from(file), file_len)
                    .file_name(file_name)
                    .mime_str("video/mp4")
                    .map_err(|e| {
                        ErrorDetail::new(ErrorCode::UploadFailed, format!("bad mime type: {}", e))
                    })?,
            )
            .text("title", payload.title.clone())
            .text("network", payload.network.clone());

        if let Some(ref description) = payload.description {
            form = form.text("description", description.clone());
        }

        let url = format!("{}/v1/publish", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                ErrorDetail::new(
                    ErrorCode::PublisherNetworkError,
                    format!("aggregator unreachable: {}", e),
                )
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorDetail::new(
                ErrorCode::PublisherRejected,
                format!("aggregator rejected upload ({}): {}", status, truncate(&body)),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorDetail::new(
                ErrorCode::UploadFailed,
                format!("aggregator upload failed ({}): {}", status, truncate(&body)),
            ));
        }

        let parsed: AggregatorResponse = response.json().await.map_err(|e| {
            ErrorDetail::new(
                ErrorCode::UploadFailed,
                format!("invalid aggregator response: {}", e),
            )
        })?;

        parsed.url.or(parsed.id).ok_or_else(|| {
            ErrorDetail::new(
                ErrorCode::UploadFailed,
                "aggregator response missing published id",
            )
        })
    }
}

fn truncate(body: &str) -> &str {
    let limit = 200;
    if body.len() <= limit {
        body
    } else {
        // Stay on a char boundary.
        let mut end = limit;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        &body[..end]
    }
}

#[async_trait]
impl Publisher for AggregatorPublisher {
    fn name(&self) -> &str {
        "aggregator"
    }

    async fn publish(&self, payload: &PublishPayload) -> PublishOutcome {
        if self.config.api_key.is_empty() {
            return PublishOutcome::failed(
                &payload.network,
                ErrorDetail::new(
                    ErrorCode::MissingPublisherCredentials,
                    "aggregator API key is not configured",
                ),
            );
        }

        debug!(network = %payload.network, path = %payload.media_path.display(), "uploading to aggregator");

        match self.upload(payload).await {
            Ok(published_id) => PublishOutcome::ok(&payload.network, published_id),
            Err(error) => {
                warn!(network = %payload.network, code = error.code.as_str(), "aggregator publish failed: {}", error.message);
                PublishOutcome::failed(&payload.network, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn payload() -> PublishPayload {
        PublishPayload {
            media_path: PathBuf::from("/media/clip.mp4"),
            title: "Clip".to_string(),
            description: None,
            network: "tiktok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuits() {
        let publisher =
            AggregatorPublisher::new(AggregatorConfig::new("https://agg.example.com", ""));
        let outcome = publisher.publish(&payload()).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.map(|e| e.code),
            Some(ErrorCode::MissingPublisherCredentials)
        );
    }

    #[tokio::test]
    async fn test_unreadable_media_fails_upload() {
        let publisher =
            AggregatorPublisher::new(AggregatorConfig::new("https://agg.example.com", "key"));
        let outcome = publisher.publish(&payload()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.map(|e| e.code), Some(ErrorCode::UploadFailed));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let body = "é".repeat(300);
        let cut = truncate(&body);
        assert!(cut.len() <= 200);
        assert!(body.starts_with(cut));
    }
}
