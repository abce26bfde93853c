//! Mock publisher for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::job::{ErrorCode, ErrorDetail};
use crate::publisher::{PublishOutcome, PublishPayload, Publisher};

/// Mock implementation of the `Publisher` trait.
///
/// Records every payload it sees and answers with a configured outcome.
pub struct MockPublisher {
    mode: Mode,
    calls: AtomicUsize,
    last_payload: Mutex<Option<PublishPayload>>,
}

enum Mode {
    /// Succeed with ids "{prefix}-1", "{prefix}-2", ...
    Succeed { prefix: String },
    /// Fail every publish with the given error.
    Fail { code: ErrorCode, message: String },
}

impl MockPublisher {
    /// A publisher that always succeeds.
    pub fn succeeding(prefix: impl Into<String>) -> Self {
        Self {
            mode: Mode::Succeed {
                prefix: prefix.into(),
            },
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }

    /// A publisher that always fails with the given error.
    pub fn failing(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fail {
                code,
                message: message.into(),
            },
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }

    /// How many publish attempts this mock received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Media path of the most recent publish attempt.
    pub fn last_media_path(&self) -> Option<PathBuf> {
        self.last_payload
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.media_path.clone())
    }

    /// Payload of the most recent publish attempt.
    pub fn last_payload(&self) -> Option<PublishPayload> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, payload: &PublishPayload) -> PublishOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_payload.lock().unwrap() = Some(payload.clone());

        match &self.mode {
            Mode::Succeed { prefix } => {
                PublishOutcome::ok(&payload.network, format!("{}-{}", prefix, call))
            }
            Mode::Fail { code, message } => {
                PublishOutcome::failed(&payload.network, ErrorDetail::new(*code, message.clone()))
            }
        }
    }
}
