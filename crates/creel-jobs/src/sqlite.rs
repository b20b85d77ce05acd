//! `SQLite`-backed job store.
//!
//! Jobs and their message logs live in two tables created by the embedded
//! migrations. Output files are stored inline as blobs.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use creel_core::{JobId, JobKind};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{JobError, Result};
use crate::job::{FileSlot, Job, JobStatus, JobSummary};
use crate::store::{check_transition, JobStore};

type JobRow = (String, String, String, String, Option<Vec<u8>>, Option<Vec<u8>>);
type SummaryRow = (String, String, String, String);

/// Job store persisted in a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open (creating if missing) a database at `path` and apply migrations.
    ///
    /// `:memory:` opens a private in-memory database held by a single
    /// connection.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";

        let options = if in_memory {
            SqliteConnectOptions::from_str(":memory:")
                .map_err(|e| JobError::Open(format!("invalid connection string: {e}")))?
        } else {
            SqliteConnectOptions::new().filename(path)
        }
        .create_if_missing(true)
        .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| JobError::Open(format!("{}: {e}", path.display())))?;

        let store = Self::from_pool(pool);
        store.run_migrations().await?;
        tracing::info!("Job database ready at {}", path.display());
        Ok(store)
    }

    /// Wrap an existing pool without running migrations.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| JobError::Migration(format!("migration execution failed: {e}")))?;
        Ok(())
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn require(&self, id: &JobId) -> Result<JobStatus> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match status {
            Some(status) => parse_status(&status),
            None => Err(JobError::NotFound(id.clone())),
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_status(raw: &str) -> Result<JobStatus> {
    raw.parse()
        .map_err(|e| JobError::Decode(format!("invalid status '{raw}': {e}")))
}

fn parse_summary((id, kind, status, created_at): SummaryRow) -> Result<JobSummary> {
    let id = JobId::new(id).map_err(|e| JobError::Decode(e.to_string()))?;
    let kind: JobKind = kind
        .parse()
        .map_err(|e| JobError::Decode(format!("invalid kind '{kind}': {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| JobError::Decode(format!("invalid timestamp '{created_at}': {e}")))?
        .with_timezone(&Utc);
    Ok(JobSummary {
        id,
        kind,
        status: parse_status(&status)?,
        created_at,
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, kind: JobKind) -> Result<Job> {
        let job = Job::new(kind);
        sqlx::query("INSERT INTO jobs (id, kind, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(job.id.as_str())
            .bind(kind.as_str())
            .bind(job.status.as_str())
            .bind(timestamp(job.created_at))
            .execute(&self.pool)
            .await?;
        tracing::debug!("Created {} job {}", kind, job.id);
        Ok(job)
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, kind, status, created_at, primary_file, secondary_file
             FROM jobs WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((row_id, kind, status, created_at, primary_file, secondary_file)) = row else {
            return Ok(None);
        };
        let summary = parse_summary((row_id, kind, status, created_at))?;

        let messages: Vec<String> =
            sqlx::query_scalar("SELECT message FROM job_messages WHERE job_id = ? ORDER BY id")
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(Job {
            id: summary.id,
            kind: summary.kind,
            status: summary.status,
            created_at: summary.created_at,
            messages,
            primary_file,
            secondary_file,
        }))
    }

    async fn status(&self, id: &JobId) -> Result<JobStatus> {
        self.require(id).await
    }

    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_str())
            .bind(id.as_str())
            .bind(JobStatus::InProgress.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            let current = self.require(id).await?;
            check_transition(id, current, status)?;
        }
        Ok(())
    }

    async fn append_message(&self, id: &JobId, message: &str) -> Result<()> {
        self.require(id).await?;
        sqlx::query("INSERT INTO job_messages (job_id, message, created_at) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(message)
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_last_message(&self, id: &JobId, message: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE job_messages SET message = ?
             WHERE id = (SELECT MAX(id) FROM job_messages WHERE job_id = ?)",
        )
        .bind(message)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.append_message(id, message).await?;
        }
        Ok(())
    }

    async fn attach_file(&self, id: &JobId, slot: FileSlot, bytes: Vec<u8>) -> Result<()> {
        let sql = match slot {
            FileSlot::Primary => "UPDATE jobs SET primary_file = ? WHERE id = ?",
            FileSlot::Secondary => "UPDATE jobs SET secondary_file = ? WHERE id = ?",
        };
        let result = sqlx::query(sql)
            .bind(bytes)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(JobError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<JobSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, kind, status, created_at FROM jobs ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_summary).collect()
    }

    async fn delete(&self, id: &JobId) -> Result<bool> {
        sqlx::query("DELETE FROM job_messages WHERE job_id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
