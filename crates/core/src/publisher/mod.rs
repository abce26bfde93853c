//! Per-network publishing capabilities and their registry.

pub mod aggregator;
pub mod config;
pub mod registry;
pub mod traits;
pub mod types;

pub use aggregator::AggregatorPublisher;
pub use config::AggregatorConfig;
pub use registry::PublisherRegistry;
pub use traits::Publisher;
pub use types::{PublishOutcome, PublishPayload};
