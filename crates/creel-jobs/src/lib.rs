//! Creel Jobs
//!
//! Job records and the machinery around them: a storage seam with in-memory
//! and `SQLite` implementations, the [`Task`] facade pipelines use to report
//! progress and observe cancellation, and lifecycle operations (cancel, poll,
//! retention cleanup).
//!
//! # Example
//!
//! ```ignore
//! use creel_jobs::{JobStore, SqliteJobStore, Task};
//!
//! let store = Arc::new(SqliteJobStore::open("creel.db").await?);
//! let job = store.create(JobKind::FishTales).await?;
//! let task = Task::new(store.clone(), job.id);
//! task.add_message("Found 3 sites to scrape!").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod job;
pub mod lifecycle;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod task;

// Re-export commonly used types
pub use error::{Cancellable, JobError, Result};
pub use job::{FileSlot, Job, JobFile, JobStatus, JobSummary, JobUpdate};
pub use lifecycle::{cancel_job, cleanup_jobs, job_updates, CleanupReport};
pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;
pub use store::JobStore;
pub use task::{Progress, Task};
pub use tokio_util::sync::CancellationToken;
