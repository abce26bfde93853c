//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::media::{MediaError, MediaProbe, Transcoder, TranscodePlan};

/// Mock implementation of the `Transcoder` trait.
///
/// Probes report a fixed configured shape; transcoded outputs can report a
/// different shape so compliance re-checks observe the "fixed" artifact.
/// Nothing touches the filesystem.
pub struct MockTranscoder {
    width: u32,
    height: u32,
    duration_secs: f64,
    size_bytes: u64,
    /// Shape reported when probing a path this mock has transcoded.
    transcode_result: Option<(u32, u32)>,
    fail_probe: bool,
    fail_transcode: bool,
    transcoded_paths: Mutex<HashSet<PathBuf>>,
    probe_count: AtomicUsize,
    transcode_count: AtomicUsize,
}

impl MockTranscoder {
    /// A transcoder whose probes always report the given shape.
    pub fn compliant(width: u32, height: u32, duration_secs: f64, size_bytes: u64) -> Self {
        Self {
            width,
            height,
            duration_secs,
            size_bytes,
            transcode_result: None,
            fail_probe: false,
            fail_transcode: false,
            transcoded_paths: Mutex::new(HashSet::new()),
            probe_count: AtomicUsize::new(0),
            transcode_count: AtomicUsize::new(0),
        }
    }

    /// A transcoder whose probes always fail.
    pub fn failing_probe() -> Self {
        let mut mock = Self::compliant(0, 0, 0.0, 0);
        mock.fail_probe = true;
        mock
    }

    /// A transcoder whose transcodes always fail.
    pub fn failing_transcode(width: u32, height: u32, duration_secs: f64, size_bytes: u64) -> Self {
        let mut mock = Self::compliant(width, height, duration_secs, size_bytes);
        mock.fail_transcode = true;
        mock
    }

    /// Probes of transcoded outputs report this shape instead of the base one.
    pub fn with_transcode_result(mut self, width: u32, height: u32) -> Self {
        self.transcode_result = Some((width, height));
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn transcode_count(&self) -> usize {
        self.transcode_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, MediaError> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_probe {
            return Err(MediaError::probe_failed("mock probe failure"));
        }

        let transcoded = self
            .transcoded_paths
            .lock()
            .unwrap()
            .contains(&path.to_path_buf());

        let (width, height) = match (transcoded, self.transcode_result) {
            (true, Some(shape)) => shape,
            _ => (self.width, self.height),
        };

        Ok(MediaProbe {
            path: path.to_path_buf(),
            width,
            height,
            duration_secs: self.duration_secs,
            size_bytes: self.size_bytes,
        })
    }

    async fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        _plan: &TranscodePlan,
    ) -> Result<PathBuf, MediaError> {
        self.transcode_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_transcode {
            return Err(MediaError::transcode_failed(
                "mock transcode failure",
                Some("mock stderr".to_string()),
            ));
        }

        self.transcoded_paths
            .lock()
            .unwrap()
            .insert(output.to_path_buf());
        Ok(output.to_path_buf())
    }

    async fn validate(&self) -> Result<(), MediaError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transcoded_paths_report_new_shape() {
        let mock = MockTranscoder::compliant(1920, 1080, 60.0, 1024).with_transcode_result(608, 1080);

        let before = mock.probe(Path::new("/in.mp4")).await.unwrap();
        assert_eq!((before.width, before.height), (1920, 1080));

        mock.transcode(Path::new("/in.mp4"), Path::new("/out.mp4"), &TranscodePlan::new())
            .await
            .unwrap();

        let after = mock.probe(Path::new("/out.mp4")).await.unwrap();
        assert_eq!((after.width, after.height), (608, 1080));
        assert_eq!(mock.transcode_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_probe() {
        let mock = MockTranscoder::failing_probe();
        assert!(mock.probe(Path::new("/in.mp4")).await.is_err());
    }
}
