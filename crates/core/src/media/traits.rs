//! Trait definition for the transcoding capability.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::MediaError;
use super::types::{MediaProbe, TranscodePlan};

/// A transcoder that can probe video files and execute transcode plans.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Probes a video file for its dimensions, duration, and size.
    ///
    /// Fails with a probe-class error if the file is missing, unreadable, or
    /// carries no video stream.
    async fn probe(&self, path: &Path) -> Result<MediaProbe, MediaError>;

    /// Executes a transcode plan, writing the result to `output`.
    ///
    /// Returns the output path on success.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &TranscodePlan,
    ) -> Result<PathBuf, MediaError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), MediaError>;
}
