//! Job records: status, message log, and output files.

use chrono::{DateTime, Utc};
use creel_core::{CreelError, JobId, JobKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a job.
///
/// `InProgress` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Pipeline is running
    InProgress,
    /// Pipeline finished and attached its outputs
    Completed,
    /// Canceled by the user
    Canceled,
    /// Pipeline hit an unrecoverable error
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Stable storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" => Ok(Self::Canceled),
            "FAILED" => Ok(Self::Failed),
            other => Err(CreelError::Validation(format!("unknown job status '{other}'"))),
        }
    }
}

/// One of the two output blobs a job may carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileSlot {
    /// Main pipeline output
    Primary,
    /// Auxiliary output (cache rows, crawl listing)
    Secondary,
}

impl FileSlot {
    /// Download name for a slot, which depends on the pipeline that filled it.
    #[must_use]
    pub fn file_name(self, kind: JobKind) -> &'static str {
        match (kind, self) {
            (JobKind::FishTales, Self::Primary) => "report_summary.txt",
            (JobKind::FishTales, Self::Secondary) => "site_list.txt",
            (JobKind::ShopReel, Self::Primary) => "shops.csv",
            (JobKind::ShopReel, Self::Secondary) => "shop_cache.csv",
            (JobKind::SiteScout, Self::Primary) => "fish_tales_sites.csv",
            (JobKind::SiteScout, Self::Secondary) => "site_scout_extra.csv",
        }
    }
}

/// A tracked pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier
    pub id: JobId,
    /// Pipeline this job runs
    pub kind: JobKind,
    /// Current status
    pub status: JobStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Ordered message log
    pub messages: Vec<String>,
    /// Primary output file
    pub primary_file: Option<Vec<u8>>,
    /// Secondary output file
    pub secondary_file: Option<Vec<u8>>,
}

impl Job {
    /// Create a fresh in-progress job.
    #[must_use]
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: JobId::generate(),
            kind,
            status: JobStatus::InProgress,
            created_at: Utc::now(),
            messages: Vec::new(),
            primary_file: None,
            secondary_file: None,
        }
    }

    /// Contents of a file slot.
    #[must_use]
    pub fn file(&self, slot: FileSlot) -> Option<&[u8]> {
        match slot {
            FileSlot::Primary => self.primary_file.as_deref(),
            FileSlot::Secondary => self.secondary_file.as_deref(),
        }
    }

    /// Named files currently attached, primary first.
    #[must_use]
    pub fn files(&self) -> Vec<JobFile> {
        [FileSlot::Primary, FileSlot::Secondary]
            .into_iter()
            .filter_map(|slot| {
                self.file(slot).map(|bytes| JobFile {
                    slot,
                    name: slot.file_name(self.kind).to_string(),
                    bytes: bytes.to_vec(),
                })
            })
            .collect()
    }
}

/// A named output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFile {
    /// Slot the file came from
    pub slot: FileSlot,
    /// Download name
    pub name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Lightweight listing entry used by retention cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Unique identifier
    pub id: JobId,
    /// Pipeline this job runs
    pub kind: JobKind,
    /// Current status
    pub status: JobStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

/// Polling view of a job: status, joined message log, and files.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    /// Current status
    pub status: JobStatus,
    /// Messages joined by newlines, oldest first
    pub message: String,
    /// Attached files
    pub files: Vec<JobFile>,
}

impl From<&Job> for JobUpdate {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            message: job.messages.join("\n"),
            files: job.files(),
        }
    }
}
