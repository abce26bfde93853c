//! Media probing, compatibility evaluation, and transcoding.
//!
//! The advisor decides whether a file satisfies a network's constraints and
//! computes the transcode plan when it does not; the transcoder executes
//! plans against ffmpeg.

pub mod advisor;
pub mod config;
pub mod constraints;
pub mod error;
pub mod ffmpeg;
pub mod traits;
pub mod types;

pub use advisor::CompatibilityAdvisor;
pub use config::TranscoderConfig;
pub use constraints::{AspectRatio, ConstraintTable, NetworkConstraint};
pub use error::MediaError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{ConstraintViolation, Evaluation, MediaProbe, PlanStep, TranscodePlan};
