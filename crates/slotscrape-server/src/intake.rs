//! Shared enqueue path for every ingress (Discord, Telegram, JSON API).

use slotscrape_core::error::AppError;
use slotscrape_core::job::{CreateScrapeJobRequest, ScrapeJob};
use slotscrape_core::job_store::JobStore;
use slotscrape_core::util::validate_target_url;

use crate::state::AppState;

/// Validate, rate-limit and persist a scrape request, then wake the worker.
///
/// The insert is the only await on the database; extraction never runs here.
/// An invalid URL or an exhausted budget creates no job.
pub async fn enqueue(
    state: &AppState,
    mut request: CreateScrapeJobRequest,
) -> Result<ScrapeJob, AppError> {
    let url = validate_target_url(&request.url)?;
    request.url = url.to_string();

    let requester = request.requested_by.as_deref().unwrap_or("anonymous");
    state.limiter.check(request.platform, requester).await?;

    let job = state.db.job_repo().create_job(request).await?;
    state.waker.wake();

    tracing::info!(
        job_id = %job.id,
        url = %job.url,
        platform = %job.platform,
        "Scrape job enqueued"
    );
    Ok(job)
}
