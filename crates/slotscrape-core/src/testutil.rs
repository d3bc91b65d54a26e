//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{CreateScrapeJobRequest, JobOutcome, JobStatus, Platform, ScrapeJob};
use crate::job_store::JobStore;
use crate::models::{ExtractedGame, SavedGame};
use crate::strategy::Strategy;
use crate::traits::{GameStore, Notifier, PageFetcher};
use crate::worker::{WorkerEvent, WorkerReporter};

/// A canned page: `Ok(html)` or `Err(http error message)`.
pub type MockPage = Result<&'static str, &'static str>;

fn to_result(page: MockPage) -> Result<String, AppError> {
    page.map(str::to_string)
        .map_err(|msg| AppError::HttpError(msg.to_string()))
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher with per-strategy responses.
///
/// Lookup order for a call: the strategy's queued sequence, then its fixed
/// response, then the default response.
#[derive(Clone)]
pub struct MockFetcher {
    default: MockPage,
    fixed: Arc<Mutex<HashMap<String, MockPage>>>,
    sequences: Arc<Mutex<HashMap<String, VecDeque<MockPage>>>>,
    latency: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    fn with_default(default: MockPage) -> Self {
        Self {
            default,
            fixed: Arc::new(Mutex::new(HashMap::new())),
            sequences: Arc::new(Mutex::new(HashMap::new())),
            latency: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every strategy receives `html`.
    pub fn serving(html: &'static str) -> Self {
        Self::with_default(Ok(html))
    }

    /// Every strategy fails with `HttpError(message)`.
    pub fn failing(message: &'static str) -> Self {
        Self::with_default(Err(message))
    }

    pub fn on_strategy(self, name: &str, page: MockPage) -> Self {
        self.fixed.lock().unwrap().insert(name.to_string(), page);
        self
    }

    /// Responses returned one per call for `name` before falling back.
    pub fn with_sequence(self, name: &str, pages: Vec<MockPage>) -> Self {
        self.sequences
            .lock()
            .unwrap()
            .insert(name.to_string(), pages.into());
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Strategy names, one per fetch call, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch(&self, _url: &str, strategy: &Strategy) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(strategy.name.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self
            .sequences
            .lock()
            .unwrap()
            .get_mut(&strategy.name)
            .and_then(VecDeque::pop_front);
        let page = queued
            .or_else(|| self.fixed.lock().unwrap().get(&strategy.name).copied())
            .unwrap_or(self.default);
        to_result(page)
    }
}

// ---------------------------------------------------------------------------
// MockGameStore
// ---------------------------------------------------------------------------

/// In-memory game store keyed by slug.
#[derive(Clone, Default)]
pub struct MockGameStore {
    games: Arc<Mutex<HashMap<String, Uuid>>>,
    sources: Arc<Mutex<Vec<String>>>,
    save_error: Arc<Mutex<Option<String>>>,
}

impl MockGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next save fails with `DatabaseError(message)`.
    pub fn with_save_error(message: &str) -> Self {
        let store = Self::default();
        *store.save_error.lock().unwrap() = Some(message.to_string());
        store
    }

    pub fn game_count(&self) -> usize {
        self.games.lock().unwrap().len()
    }

    /// Source URLs of every save call.
    pub fn saved_sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

impl GameStore for MockGameStore {
    async fn save_game(&self, game: &ExtractedGame, source_url: &str) -> Result<SavedGame, AppError> {
        if let Some(message) = self.save_error.lock().unwrap().take() {
            return Err(AppError::DatabaseError(message));
        }
        self.sources.lock().unwrap().push(source_url.to_string());

        let slug = game.slug();
        let mut games = self.games.lock().unwrap();
        let created = !games.contains_key(&slug);
        let id = *games.entry(slug.clone()).or_insert_with(Uuid::new_v4);
        Ok(SavedGame { id, slug, created })
    }
}

// ---------------------------------------------------------------------------
// MockJobStore
// ---------------------------------------------------------------------------

/// In-memory job store. Claims happen under one lock, so they are atomic.
#[derive(Clone, Default)]
pub struct MockJobStore {
    jobs: Arc<Mutex<Vec<ScrapeJob>>>,
    claim_error: Arc<Mutex<Option<String>>>,
    max_claim_limit: Arc<Mutex<usize>>,
    peak_processing: Arc<Mutex<usize>>,
}

impl MockJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `claim_pending` fails with `DatabaseError(message)`.
    pub fn fail_next_claim(self, message: &str) -> Self {
        *self.claim_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn insert_pending(&self, url: &str) -> ScrapeJob {
        let mut job = make_test_job();
        job.url = url.to_string();
        self.jobs.lock().unwrap().push(job.clone());
        job
    }

    /// A job stuck in `processing` since `age` ago.
    pub fn insert_processing(&self, url: &str, age: Duration) -> ScrapeJob {
        let mut job = make_test_job();
        job.url = url.to_string();
        job.status = JobStatus::Processing;
        let started = Utc::now() - chrono::Duration::from_std(age).unwrap();
        job.created_at = started;
        job.started_at = Some(started);
        self.jobs.lock().unwrap().push(job.clone());
        job
    }

    pub fn job(&self, id: Uuid) -> Option<ScrapeJob> {
        self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned()
    }

    pub fn status_of(&self, id: Uuid) -> Option<JobStatus> {
        self.job(id).map(|j| j.status)
    }

    pub fn all_jobs(&self) -> Vec<ScrapeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.status == status)
            .count()
    }

    /// Largest `limit` ever passed to `claim_pending`.
    pub fn max_claim_limit(&self) -> usize {
        *self.max_claim_limit.lock().unwrap()
    }

    /// Most jobs ever observed in `processing` right after a claim.
    pub fn peak_processing(&self) -> usize {
        *self.peak_processing.lock().unwrap()
    }
}

impl JobStore for MockJobStore {
    async fn create_job(&self, request: CreateScrapeJobRequest) -> Result<ScrapeJob, AppError> {
        let job = ScrapeJob {
            id: Uuid::new_v4(),
            url: request.url,
            status: JobStatus::Pending,
            platform: request.platform,
            callback_channel: request.callback_channel,
            callback_token: request.callback_token,
            requested_by: request.requested_by,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            result_payload: None,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn claim_pending(&self, limit: usize) -> Result<Vec<ScrapeJob>, AppError> {
        if let Some(message) = self.claim_error.lock().unwrap().take() {
            return Err(AppError::DatabaseError(message));
        }
        {
            let mut max = self.max_claim_limit.lock().unwrap();
            *max = (*max).max(limit);
        }

        let mut jobs = self.jobs.lock().unwrap();
        let mut pending: Vec<usize> = jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.status == JobStatus::Pending)
            .map(|(i, _)| i)
            .collect();
        pending.sort_by_key(|i| jobs[*i].created_at);

        let now = Utc::now();
        let claimed: Vec<ScrapeJob> = pending
            .into_iter()
            .take(limit)
            .map(|i| {
                jobs[i].status = JobStatus::Processing;
                jobs[i].started_at = Some(now);
                jobs[i].clone()
            })
            .collect();

        let processing = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Processing)
            .count();
        let mut peak = self.peak_processing.lock().unwrap();
        *peak = (*peak).max(processing);

        Ok(claimed)
    }

    async fn finish(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<bool, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Processing)
        else {
            return Ok(false);
        };
        *job = job.clone().with_outcome(outcome.clone(), Utc::now());
        Ok(true)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>, AppError> {
        Ok(self.job(job_id))
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<ScrapeJob>, AppError> {
        let mut jobs: Vec<ScrapeJob> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, AppError> {
        Ok(self.count(status) as i64)
    }

    async fn fail_abandoned(
        &self,
        started_before: DateTime<Utc>,
        error: &str,
    ) -> Result<u64, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();
        let mut count = 0;
        for job in jobs.iter_mut() {
            let stale = job.status == JobStatus::Processing
                && job.started_at.is_some_and(|t| t < started_before);
            if stale {
                *job = job
                    .clone()
                    .with_outcome(JobOutcome::Failed(error.to_string()), now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn purge_finished(&self, completed_before: DateTime<Utc>) -> Result<u64, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|j| {
            !(j.status.is_terminal() && j.completed_at.is_some_and(|t| t < completed_before))
        });
        Ok((before - jobs.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// MockNotifier
// ---------------------------------------------------------------------------

/// Records every notified job; optionally fails every delivery.
#[derive(Clone, Default)]
pub struct MockNotifier {
    notified: Arc<Mutex<Vec<ScrapeJob>>>,
    error: Option<String>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            notified: Arc::new(Mutex::new(Vec::new())),
            error: Some(message.to_string()),
        }
    }

    pub fn notified(&self) -> Vec<ScrapeJob> {
        self.notified.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    async fn notify(&self, job: &ScrapeJob) -> Result<(), AppError> {
        self.notified.lock().unwrap().push(job.clone());
        match &self.error {
            Some(message) => Err(AppError::NotificationError(message.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl WorkerReporter for MockReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let label = match &event {
            WorkerEvent::Started { .. } => "Started",
            WorkerEvent::AbandonedJobsFailed { .. } => "AbandonedJobsFailed",
            WorkerEvent::Polling { .. } => "Polling",
            WorkerEvent::JobClaimed { .. } => "JobClaimed",
            WorkerEvent::JobCompleted { .. } => "JobCompleted",
            WorkerEvent::JobFailed { .. } => "JobFailed",
            WorkerEvent::JobPanicked { .. } => "JobPanicked",
            WorkerEvent::FinishIgnored { .. } => "FinishIgnored",
            WorkerEvent::NotificationFailed { .. } => "NotificationFailed",
            WorkerEvent::StoreError { .. } => "StoreError",
            WorkerEvent::ShuttingDown { .. } => "ShuttingDown",
            WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a dummy pending ScrapeJob for testing.
pub fn make_test_job() -> ScrapeJob {
    ScrapeJob {
        id: Uuid::new_v4(),
        url: "https://example.com/games/sweet-bonanza".to_string(),
        status: JobStatus::Pending,
        platform: Platform::Discord,
        callback_channel: Some("channel-1".to_string()),
        callback_token: Some("interaction-token".to_string()),
        requested_by: Some("user-1".to_string()),
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        error_message: None,
        result_payload: None,
    }
}
