//! Durable publish jobs: data types, storage trait, and the SQLite backend.

pub mod sqlite_store;
pub mod store;
pub mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{JobFilter, JobPatch, JobStore, JobStoreError};
pub use types::{ErrorCode, ErrorDetail, Job, JobStatus, PublishRequest};
