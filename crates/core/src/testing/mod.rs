//! Testing utilities and mock implementations for end-to-end tests.
//!
//! Mock implementations of the external capability traits, allowing full
//! orchestrator tests without ffmpeg or live network integrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use relaypost_core::testing::{MockPublisher, MockTranscoder};
//!
//! let transcoder = MockTranscoder::compliant(1920, 1080, 60.0, 10 * 1024 * 1024);
//! let publisher = MockPublisher::succeeding("yt");
//!
//! // Wire into a PublisherRegistry / JobOrchestrator...
//! ```

mod mock_publisher;
mod mock_transcoder;

pub use mock_publisher::MockPublisher;
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::job::PublishRequest;
    use crate::media::{AspectRatio, ConstraintTable, MediaProbe, NetworkConstraint};

    /// A publish request targeting the given networks.
    pub fn publish_request(networks: &[&str]) -> PublishRequest {
        PublishRequest {
            media_path: PathBuf::from("/media/clip.mp4"),
            title: "Test clip".to_string(),
            description: Some("A test clip".to_string()),
            networks: networks.iter().map(|n| n.to_string()).collect(),
            scheduled_for: None,
        }
    }

    /// A 1080p landscape probe of moderate size.
    pub fn landscape_probe() -> MediaProbe {
        MediaProbe {
            path: PathBuf::from("/media/clip.mp4"),
            width: 1920,
            height: 1080,
            duration_secs: 60.0,
            size_bytes: 50 * 1024 * 1024,
        }
    }

    /// A single-network constraint table accepting only 16:9 landscape.
    pub fn landscape_only_table(network: &str) -> ConstraintTable {
        let mut table = ConstraintTable::new();
        table.insert(
            network,
            NetworkConstraint {
                max_duration_secs: Some(600.0),
                min_duration_secs: None,
                max_size_mb: Some(512),
                supported_ratios: vec![AspectRatio::new(16, 9)],
                preferred_width: 1920,
            },
        );
        table
    }
}
