use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{CreateScrapeJobRequest, JobOutcome, JobStatus, ScrapeJob};

/// Durable store of scrape jobs.
///
/// `claim_pending` is the only synchronization point of the pipeline:
/// implementations must guarantee a job is handed to at most one caller
/// (e.g. `SELECT ... FOR UPDATE SKIP LOCKED`).
pub trait JobStore: Send + Sync + Clone {
    /// Persist a new job with status `pending`.
    fn create_job(
        &self,
        request: CreateScrapeJobRequest,
    ) -> impl Future<Output = Result<ScrapeJob, AppError>> + Send;

    /// Atomically claim up to `limit` pending jobs, oldest first, moving them
    /// to `processing` with `started_at` set.
    fn claim_pending(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ScrapeJob>, AppError>> + Send;

    /// Record the terminal outcome of a `processing` job.
    ///
    /// Returns `false` when the job was not in `processing` (already finished,
    /// never claimed, or missing); no row is changed in that case.
    fn finish(
        &self,
        job_id: Uuid,
        outcome: &JobOutcome,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn get_job(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Option<ScrapeJob>, AppError>> + Send;

    /// Newest first.
    fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ScrapeJob>, AppError>> + Send;

    fn count_by_status(
        &self,
        status: JobStatus,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Fail `processing` jobs whose `started_at` is before `started_before`.
    fn fail_abandoned(
        &self,
        started_before: DateTime<Utc>,
        error: &str,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// Delete terminal jobs completed before `completed_before`.
    fn purge_finished(
        &self,
        completed_before: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}
