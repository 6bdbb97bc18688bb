use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{JobHandle, JobStatusUpdate};
use crate::submission::Submission;

/// Remote lifecycle status of a generation job.
///
/// Anything the backend reports that is not one of the four known values,
/// including a missing or `null` status, is read as `Queued`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }
}

impl From<Option<String>> for JobStatus {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map(JobStatus::parse).unwrap_or_default()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single generation request tracked from submission until the user
/// discards it.
///
/// Identity and parameter fields are fixed at submission. Only
/// [`Job::merge`] changes the remote-owned fields afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub model: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt: String,
    pub duration: u32,
    pub resolution: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl Job {
    /// Build the record for a job the backend just accepted.
    pub fn from_submission(
        handle: JobHandle,
        submission: &Submission,
        model_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: handle.job_id,
            model: submission.model.clone(),
            model_name,
            status: handle.status,
            progress: None,
            error: None,
            prompt: submission.request.prompt.clone(),
            duration: submission.request.duration,
            resolution: submission.request.resolution.clone(),
            created_at,
            queue_position: handle.queue_position,
            estimated_time_seconds: handle.estimated_time_seconds,
            output_path: None,
        }
    }

    /// Overwrite the remote-owned fields with a fresh status report.
    ///
    /// `status` and `output_path` are replaced as reported. `progress` is kept
    /// only while processing and `error` only when failed; a value the
    /// backend sends in any other state is dropped. Identity and parameter
    /// fields are never touched.
    pub fn merge(&mut self, update: &JobStatusUpdate) {
        self.status = update.status;
        self.progress = match update.status {
            JobStatus::Processing => update.progress,
            _ => None,
        };
        self.error = match update.status {
            JobStatus::Failed => update.error.clone(),
            _ => None,
        };
        self.output_path = update.output_path.clone();
    }

    /// Progress worth showing, `0` included.
    pub fn visible_progress(&self) -> Option<u8> {
        match self.status {
            JobStatus::Processing => self.progress,
            _ => None,
        }
    }
}
