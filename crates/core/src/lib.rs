pub mod config;
pub mod job;
pub mod media;
pub mod orchestrator;
pub mod publisher;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use job::{
    ErrorCode, ErrorDetail, Job, JobFilter, JobPatch, JobStatus, JobStore, JobStoreError,
    PublishRequest, SqliteJobStore,
};
pub use media::{
    AspectRatio, CompatibilityAdvisor, ConstraintTable, Evaluation, FfmpegTranscoder, MediaError,
    MediaProbe, NetworkConstraint, TranscodePlan, Transcoder, TranscoderConfig,
};
pub use orchestrator::{ActiveJob, JobOrchestrator, OrchestratorConfig, OrchestratorStatus};
pub use publisher::{
    AggregatorConfig, AggregatorPublisher, Publisher, PublisherRegistry, PublishOutcome,
    PublishPayload,
};
