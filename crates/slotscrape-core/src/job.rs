use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{env_or, env_positive};
use crate::error::AppError;
use crate::models::{ExtractedGame, SavedGame};

/// Status of a scrape job.
///
/// Transitions are one-directional: `pending → processing → completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// The chat platform (or API) a job was submitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    Telegram,
    Api,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Discord => "discord",
            Platform::Telegram => "telegram",
            Platform::Api => "api",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discord" => Ok(Platform::Discord),
            "telegram" => Ok(Platform::Telegram),
            "api" => Ok(Platform::Api),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Structured payload stored on a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub games_found: usize,
    pub game: ExtractedGame,
    pub saved: SavedGame,
    pub strategy: String,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listed_names: Vec<String>,
}

/// Terminal outcome of a job. Exactly one of result/error exists by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobResult),
    Failed(String),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
        }
    }
}

/// A scrape job as persisted in the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub platform: Platform,
    pub callback_channel: Option<String>,
    pub callback_token: Option<String>,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result_payload: Option<JobResult>,
}

impl ScrapeJob {
    /// Reconstruct the terminal outcome, if the job has one.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self.status {
            JobStatus::Completed => self.result_payload.clone().map(JobOutcome::Completed),
            JobStatus::Failed => Some(JobOutcome::Failed(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )),
            _ => None,
        }
    }

    /// Apply a terminal outcome in memory, mirroring what the store persists.
    pub fn with_outcome(mut self, outcome: JobOutcome, at: DateTime<Utc>) -> Self {
        self.status = outcome.status();
        self.completed_at = Some(at);
        match outcome {
            JobOutcome::Completed(result) => {
                self.result_payload = Some(result);
                self.error_message = None;
            }
            JobOutcome::Failed(error) => {
                self.error_message = Some(error);
                self.result_payload = None;
            }
        }
        self
    }
}

/// Request to create a new scrape job.
#[derive(Debug, Clone)]
pub struct CreateScrapeJobRequest {
    pub url: String,
    pub platform: Platform,
    pub callback_channel: Option<String>,
    pub callback_token: Option<String>,
    pub requested_by: Option<String>,
}

impl CreateScrapeJobRequest {
    pub fn new(url: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            platform,
            callback_channel: None,
            callback_token: None,
            requested_by: None,
        }
    }

    pub fn with_callback(
        mut self,
        channel: Option<String>,
        token: Option<String>,
    ) -> Self {
        self.callback_channel = channel;
        self.callback_token = token;
        self
    }

    pub fn with_requested_by(mut self, requester: impl Into<String>) -> Self {
        self.requested_by = Some(requester.into());
        self
    }
}

/// Configuration for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: Duration,
    pub max_concurrent_jobs: usize,
    pub job_timeout: Duration,
    /// `processing` jobs older than this are failed as abandoned at startup.
    pub abandoned_after: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", &Uuid::new_v4().to_string()[..8]),
            poll_interval: Duration::from_secs(5),
            max_concurrent_jobs: 3,
            job_timeout: Duration::from_secs(300),
            abandoned_after: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SLOTSCRAPE_POLL_INTERVAL_SECS` (default 5)
    /// - `SLOTSCRAPE_MAX_CONCURRENT_JOBS` (default 3)
    /// - `SLOTSCRAPE_JOB_TIMEOUT_SECS` (default 300)
    /// - `SLOTSCRAPE_ABANDONED_AFTER_SECS` (default twice the job timeout)
    pub fn from_env() -> Result<Self, AppError> {
        let poll = env_positive("SLOTSCRAPE_POLL_INTERVAL_SECS", 5)?;
        let max_jobs = env_positive("SLOTSCRAPE_MAX_CONCURRENT_JOBS", 3)?;
        let timeout = env_positive("SLOTSCRAPE_JOB_TIMEOUT_SECS", 300)?;
        let abandoned = env_or("SLOTSCRAPE_ABANDONED_AFTER_SECS", timeout * 2)?;

        Self::default()
            .with_poll_interval(Duration::from_secs(poll))
            .with_max_concurrent_jobs(max_jobs as usize)
            .with_job_timeout(Duration::from_secs(timeout))
            .with_abandoned_after(Duration::from_secs(abandoned))
            .validated()
    }

    /// Reject an abandonment age shorter than the job timeout; such a worker
    /// would fail jobs that other workers are still running.
    pub fn validated(self) -> Result<Self, AppError> {
        if self.abandoned_after < self.job_timeout {
            return Err(AppError::ConfigError(format!(
                "SLOTSCRAPE_ABANDONED_AFTER_SECS ({}) must be at least the job timeout ({})",
                self.abandoned_after.as_secs(),
                self.job_timeout.as_secs()
            )));
        }
        Ok(self)
    }

    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_abandoned_after(mut self, age: Duration) -> Self {
        self.abandoned_after = age;
        self
    }
}
