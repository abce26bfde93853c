//! SQLite-backed job store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use super::store::{JobFilter, JobPatch, JobStore, JobStoreError};
use super::types::{ErrorDetail, Job, JobStatus, PublishRequest};

const JOB_COLUMNS: &str = "id, created_at, updated_at, status, request, scheduled_for, \
                           retry_count, last_attempt, error, published_urls";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamp so string comparison in SQL matches time order.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteJobStore {
    /// Creates a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                status TEXT NOT NULL,
                request TEXT NOT NULL,
                scheduled_for TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_attempt TEXT,
                error TEXT,
                published_urls TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            "#,
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let id: String = row.get(0)?;
        let created_at_str: String = row.get(1)?;
        let updated_at_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let request_json: String = row.get(4)?;
        let scheduled_for_str: Option<String> = row.get(5)?;
        let retry_count: u32 = row.get(6)?;
        let last_attempt_str: Option<String> = row.get(7)?;
        let error_json: Option<String> = row.get(8)?;
        let published_urls_json: Option<String> = row.get(9)?;

        let request: PublishRequest = serde_json::from_str(&request_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let status = JobStatus::parse(&status_str).unwrap_or(JobStatus::Queued);

        let error: Option<ErrorDetail> =
            error_json.and_then(|json| serde_json::from_str(&json).ok());

        let published_urls: Option<HashMap<String, String>> =
            published_urls_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(Job {
            id,
            request,
            status,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
            scheduled_for: scheduled_for_str.as_deref().map(parse_ts),
            retry_count,
            last_attempt: last_attempt_str.as_deref().map(parse_ts),
            error,
            published_urls,
        })
    }

    fn fetch_job(conn: &Connection, id: &str) -> Result<Job, JobStoreError> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_job) {
            Ok(job) => Ok(job),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(JobStoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(JobStoreError::Database(e.to_string())),
        }
    }

    /// Applies patch fields to the row, bumping `updated_at`. Optionally sets
    /// the status. The caller is responsible for transition checks.
    fn apply_patch(
        conn: &Connection,
        id: &str,
        status: Option<JobStatus>,
        patch: &JobPatch,
        now: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        let mut sets: Vec<String> = vec!["updated_at = ?".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(fmt_ts(now))];

        if let Some(status) = status {
            sets.push("status = ?".to_string());
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(count) = patch.retry_count {
            sets.push("retry_count = ?".to_string());
            values.push(Box::new(count));
        }
        if let Some(ref scheduled_for) = patch.scheduled_for {
            sets.push("scheduled_for = ?".to_string());
            values.push(Box::new(scheduled_for.map(fmt_ts)));
        }
        if let Some(last_attempt) = patch.last_attempt {
            sets.push("last_attempt = ?".to_string());
            values.push(Box::new(fmt_ts(last_attempt)));
        }
        if let Some(ref error) = patch.error {
            let json = error
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| JobStoreError::Database(e.to_string()))?;
            sets.push("error = ?".to_string());
            values.push(Box::new(json));
        }
        if let Some(ref urls) = patch.published_urls {
            let json =
                serde_json::to_string(urls).map_err(|e| JobStoreError::Database(e.to_string()))?;
            sets.push("published_urls = ?".to_string());
            values.push(Box::new(json));
        }

        let sql = format!("UPDATE jobs SET {} WHERE id = ?", sets.join(", "));
        values.push(Box::new(id.to_string()));

        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, value_refs.as_slice())
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: PublishRequest) -> Result<Job, JobStoreError> {
        request.validate().map_err(JobStoreError::InvalidRequest)?;

        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        // Truncate to stored precision so the returned Job matches what `get` yields.
        let now = parse_ts(&fmt_ts(Utc::now()));
        let request_json =
            serde_json::to_string(&request).map_err(|e| JobStoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs (id, created_at, updated_at, status, request, scheduled_for, retry_count) \
             VALUES (?, ?, ?, ?, ?, ?, 0)",
            params![
                id,
                fmt_ts(now),
                fmt_ts(now),
                JobStatus::Queued.as_str(),
                request_json,
                request.scheduled_for.map(fmt_ts),
            ],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(Job {
            id,
            scheduled_for: request.scheduled_for,
            request,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            retry_count: 0,
            last_attempt: None,
            error: None,
            published_urls: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        match Self::fetch_job(&conn, id) {
            Ok(job) => Ok(Some(job)),
            Err(JobStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, status_param) = match filter.status {
            Some(status) => ("WHERE status = ?".to_string(), Some(status.as_str())),
            None => (String::new(), None),
        };

        let sql = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            JOB_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(status) = status_param {
            values.push(Box::new(status.to_string()));
        }
        values.push(Box::new(filter.limit));
        values.push(Box::new(filter.offset));

        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt
            .query_map(value_refs.as_slice(), Self::row_to_job)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(|e| JobStoreError::Database(e.to_string()))?);
        }
        Ok(jobs)
    }

    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let count = match filter.status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE status = ?",
                params![status.as_str()],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0)),
        };

        count.map_err(|e| JobStoreError::Database(e.to_string()))
    }

    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        patch: JobPatch,
    ) -> Result<Job, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch_job(&conn, id)?;

        // Terminal jobs are immutable, except manual retry of a failed job.
        let manual_retry =
            current.status == JobStatus::Failed && status == JobStatus::Queued;
        if current.status.is_terminal() && current.status != status && !manual_retry {
            return Err(JobStoreError::InvalidTransition {
                job_id: id.to_string(),
                current_status: current.status.as_str().to_string(),
                operation: format!("transition to {}", status),
            });
        }

        let now = Utc::now();
        Self::apply_patch(&conn, id, Some(status), &patch, now)?;
        Self::fetch_job(&conn, id)
    }

    fn update(&self, id: &str, patch: JobPatch) -> Result<Job, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        // Ensure the job exists before writing.
        Self::fetch_job(&conn, id)?;
        Self::apply_patch(&conn, id, None, &patch, Utc::now())?;
        Self::fetch_job(&conn, id)
    }

    fn find_by_status_in(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, JobStoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM jobs WHERE status IN ({}) ORDER BY created_at ASC",
            JOB_COLUMNS, placeholders
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let values: Vec<Box<dyn rusqlite::ToSql>> = statuses
            .iter()
            .map(|s| Box::new(s.as_str().to_string()) as Box<dyn rusqlite::ToSql>)
            .collect();
        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let rows = stmt
            .query_map(value_refs.as_slice(), Self::row_to_job)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(|e| JobStoreError::Database(e.to_string()))?);
        }
        Ok(jobs)
    }

    fn find_due_queued(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM jobs \
             WHERE status = ? AND (scheduled_for IS NULL OR scheduled_for <= ?) \
             ORDER BY created_at ASC LIMIT ?",
            JOB_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![JobStatus::Queued.as_str(), fmt_ts(now), limit],
                Self::row_to_job,
            )
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(|e| JobStoreError::Database(e.to_string()))?);
        }
        Ok(jobs)
    }
}
