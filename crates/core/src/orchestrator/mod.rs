//! Job orchestrator: polling dispatch, per-job processing, retry policy.
//!
//! One dispatch loop claims due jobs oldest-first; each claimed job runs as
//! its own task through preprocessing, publish fan-out, and finalization.
//! The in-memory claimed-set is the sole same-process duplicate-dispatch
//! guard; the job store remains the source of truth across restarts.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{ActiveJob, OrchestratorStatus};
