use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use uuid::Uuid;

use slotscrape_core::error::AppError;
use slotscrape_core::job::{CreateScrapeJobRequest, JobStatus, Platform};
use slotscrape_core::job_store::JobStore;

use crate::auth::require_api_key;
use crate::dto::{
    CreateJobRequest, CreateJobResponse, HealthResponse, JobListResponse, JobResponse,
    ListJobsQuery, StatsResponse,
};
use crate::error::ApiError;
use crate::intake;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::webhooks::{discord, telegram};

/// Webhook payloads are small JSON documents.
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/jobs", post(create_job).get(list_jobs))
        .route("/v1/jobs/{id}", get(get_job))
        .route("/v1/stats", get(stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let webhooks = Router::new()
        .route("/webhooks/discord", post(discord::interactions))
        .route("/webhooks/telegram", post(telegram::updates))
        .layer(RequestBodyLimitLayer::new(MAX_WEBHOOK_BODY));

    let public = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json));

    public.merge(webhooks).merge(api).with_state(state)
}

async fn openapi_json() -> impl IntoResponse {
    axum::Json(ApiDoc::openapi())
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = CreateJobResponse),
        (status = 400, description = "Invalid URL", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many submissions", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = CreateScrapeJobRequest::new(body.url, Platform::Api);
    if let Some(requester) = body.requested_by {
        request = request.with_requested_by(requester);
    }

    let job = intake::enqueue(&state, request).await?;

    let response = CreateJobResponse {
        job_id: job.id,
        status: job.status.to_string(),
        message: format!("Scrape started for {}", job.url),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/jobs",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Jobs, newest first", body = JobListResponse),
        (status = 400, description = "Unknown status", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = query
        .status
        .map(|s| s.parse::<JobStatus>().map_err(AppError::Generic))
        .transpose()?;

    let limit = query.limit.unwrap_or(20).min(100);
    let jobs = state.db.job_repo().list_jobs(status_filter, limit).await?;
    let total = jobs.len();

    let response = JobListResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.job_repo().get_job(id).await? {
        Some(job) => Ok(axum::Json(JobResponse::from(job)).into_response()),
        None => Ok(ApiError::not_found(format!("Job not found: {id}"))),
    }
}

#[utoipa::path(
    get,
    path = "/v1/stats",
    responses(
        (status = 200, description = "Job counts per status", body = StatsResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let repo = state.db.job_repo();
    let response = StatsResponse {
        pending: repo.count_by_status(JobStatus::Pending).await?,
        processing: repo.count_by_status(JobStatus::Processing).await?,
        completed: repo.count_by_status(JobStatus::Completed).await?,
        failed: repo.count_by_status(JobStatus::Failed).await?,
    };
    Ok(axum::Json(response))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(HealthResponse {
                status: "healthy",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(HealthResponse {
                    status: "unhealthy",
                    database: "error",
                }),
            )
        }
    }
}
