//! Lookup of network id → publishing capability.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::Publisher;

/// Maps a network identifier to a publisher, with an optional generic
/// fallback for networks without a native integration.
#[derive(Default)]
pub struct PublisherRegistry {
    publishers: HashMap<String, Arc<dyn Publisher>>,
    fallback: Option<Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a publisher for a specific network.
    pub fn register(&mut self, network: impl Into<String>, publisher: Arc<dyn Publisher>) {
        self.publishers.insert(network.into(), publisher);
    }

    /// Sets the fallback used for networks with no registered publisher.
    pub fn set_fallback(&mut self, publisher: Arc<dyn Publisher>) {
        self.fallback = Some(publisher);
    }

    /// Resolves a publisher for the network, falling back to the generic one.
    ///
    /// `None` means no publisher is configured at all; the caller synthesizes
    /// a failure outcome rather than aborting the fan-out.
    pub fn resolve(&self, network: &str) -> Option<Arc<dyn Publisher>> {
        self.publishers
            .get(network)
            .cloned()
            .or_else(|| self.fallback.clone())
    }

    /// Networks with a native (non-fallback) publisher.
    pub fn registered_networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.publishers.keys().cloned().collect();
        networks.sort();
        networks
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::types::{PublishOutcome, PublishPayload};
    use async_trait::async_trait;

    struct NamedPublisher(&'static str);

    #[async_trait]
    impl Publisher for NamedPublisher {
        fn name(&self) -> &str {
            self.0
        }

        async fn publish(&self, payload: &PublishPayload) -> PublishOutcome {
            PublishOutcome::ok(&payload.network, format!("{}-id", self.0))
        }
    }

    #[test]
    fn test_resolve_registered() {
        let mut registry = PublisherRegistry::new();
        registry.register("youtube", Arc::new(NamedPublisher("native-youtube")));

        let publisher = registry.resolve("youtube").unwrap();
        assert_eq!(publisher.name(), "native-youtube");
    }

    #[test]
    fn test_resolve_falls_back() {
        let mut registry = PublisherRegistry::new();
        registry.register("youtube", Arc::new(NamedPublisher("native-youtube")));
        registry.set_fallback(Arc::new(NamedPublisher("aggregator")));

        let publisher = registry.resolve("tiktok").unwrap();
        assert_eq!(publisher.name(), "aggregator");
    }

    #[test]
    fn test_resolve_none_without_fallback() {
        let registry = PublisherRegistry::new();
        assert!(registry.resolve("tiktok").is_none());
        assert!(!registry.has_fallback());
    }

    #[test]
    fn test_registered_networks_sorted() {
        let mut registry = PublisherRegistry::new();
        registry.register("tiktok", Arc::new(NamedPublisher("t")));
        registry.register("instagram", Arc::new(NamedPublisher("i")));
        assert_eq!(registry.registered_networks(), vec!["instagram", "tiktok"]);
    }
}
