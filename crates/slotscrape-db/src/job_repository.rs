use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use slotscrape_core::error::AppError;
use slotscrape_core::job::{CreateScrapeJobRequest, JobOutcome, JobResult, JobStatus, ScrapeJob};
use slotscrape_core::job_store::JobStore;

/// PostgreSQL-backed job store using `SELECT FOR UPDATE SKIP LOCKED`.
#[derive(Clone)]
pub struct ScrapeJobRepository {
    pool: Pool<Postgres>,
}

impl ScrapeJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ScrapeJobRow {
    id: Uuid,
    url: String,
    status: String,
    platform: String,
    callback_channel: Option<String>,
    callback_token: Option<String>,
    requested_by: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    result_payload: Option<serde_json::Value>,
}

impl TryFrom<ScrapeJobRow> for ScrapeJob {
    type Error = AppError;

    fn try_from(row: ScrapeJobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(AppError::DatabaseError)?;
        let platform = row.platform.parse().map_err(AppError::DatabaseError)?;
        let result_payload = row
            .result_payload
            .map(serde_json::from_value::<JobResult>)
            .transpose()?;

        Ok(ScrapeJob {
            id: row.id,
            url: row.url,
            status,
            platform,
            callback_channel: row.callback_channel,
            callback_token: row.callback_token,
            requested_by: row.requested_by,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            result_payload,
        })
    }
}

fn into_jobs(rows: Vec<ScrapeJobRow>) -> Result<Vec<ScrapeJob>, AppError> {
    rows.into_iter().map(ScrapeJob::try_from).collect()
}

impl JobStore for ScrapeJobRepository {
    async fn create_job(&self, request: CreateScrapeJobRequest) -> Result<ScrapeJob, AppError> {
        let row = sqlx::query_as::<_, ScrapeJobRow>(
            r#"
            INSERT INTO scrape_jobs (url, platform, callback_channel, callback_token, requested_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.url)
        .bind(request.platform.as_str())
        .bind(&request.callback_channel)
        .bind(&request.callback_token)
        .bind(&request.requested_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.try_into()
    }

    async fn claim_pending(&self, limit: usize) -> Result<Vec<ScrapeJob>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // RETURNING does not preserve the subquery order.
        let rows = sqlx::query_as::<_, ScrapeJobRow>(
            r#"
            UPDATE scrape_jobs
            SET status = 'processing', started_at = GREATEST(NOW(), created_at)
            WHERE id IN (
                SELECT id FROM scrape_jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut jobs = into_jobs(rows)?;
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    async fn finish(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<bool, AppError> {
        let query = match outcome {
            JobOutcome::Completed(result) => sqlx::query(
                r#"
                UPDATE scrape_jobs
                SET status = 'completed', completed_at = GREATEST(NOW(), started_at),
                    result_payload = $2, error_message = NULL
                WHERE id = $1 AND status = 'processing'
                "#,
            )
            .bind(job_id)
            .bind(serde_json::to_value(result)?),
            JobOutcome::Failed(error) => sqlx::query(
                r#"
                UPDATE scrape_jobs
                SET status = 'failed', completed_at = GREATEST(NOW(), started_at),
                    error_message = $2, result_payload = NULL
                WHERE id = $1 AND status = 'processing'
                "#,
            )
            .bind(job_id)
            .bind(error.as_str()),
        };

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>, AppError> {
        let row = sqlx::query_as::<_, ScrapeJobRow>(r#"SELECT * FROM scrape_jobs WHERE id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(ScrapeJob::try_from).transpose()
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<ScrapeJob>, AppError> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, ScrapeJobRow>(
                r#"
                SELECT * FROM scrape_jobs
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(status.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ScrapeJobRow>(
                r#"
                SELECT * FROM scrape_jobs
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        into_jobs(rows)
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM scrape_jobs WHERE status = $1"#)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    async fn fail_abandoned(
        &self,
        started_before: DateTime<Utc>,
        error: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'failed', completed_at = GREATEST(NOW(), started_at),
                error_message = $2, result_payload = NULL
            WHERE status = 'processing' AND started_at < $1
            "#,
        )
        .bind(started_before)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn purge_finished(&self, completed_before: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM scrape_jobs
            WHERE status IN ('completed', 'failed') AND completed_at < $1
            "#,
        )
        .bind(completed_before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
