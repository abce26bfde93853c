//! Trait definition for the publishing capability.

use async_trait::async_trait;

use super::types::{PublishOutcome, PublishPayload};

/// A publishing capability for one network (or a generic aggregator).
///
/// `publish` never fails at the type level: every failure mode is folded into
/// the returned outcome so fan-out stays additive across networks.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Publishes the payload to its single target network.
    async fn publish(&self, payload: &PublishPayload) -> PublishOutcome;
}
