use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{JobOutcome, ScrapeJob, WorkerConfig};
use crate::job_store::JobStore;
use crate::scrape::ScrapeService;
use crate::traits::{GameStore, Notifier, PageFetcher};

const ABANDONED_ERROR: &str = "Abandoned: the worker processing this job stopped before it finished";

/// Wakes a worker as soon as a job is enqueued, instead of waiting for the
/// next poll. Wakes sent while the worker is busy are kept (one permit).
#[derive(Debug, Clone, Default)]
pub struct JobWaker(Arc<Notify>);

impl JobWaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake(&self) {
        self.0.notify_one();
    }

    /// Resolves once a wake is pending, consuming it.
    pub async fn notified(&self) {
        self.0.notified().await;
    }
}

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: &'a str,
    },
    AbandonedJobsFailed {
        count: u64,
    },
    Polling {
        free_slots: usize,
    },
    JobClaimed {
        job: &'a ScrapeJob,
    },
    JobCompleted {
        job_id: Uuid,
        game: &'a str,
        created: bool,
        strategy: &'a str,
    },
    JobFailed {
        job_id: Uuid,
        error: &'a str,
    },
    JobPanicked {
        job_id: Uuid,
    },
    /// `finish` changed nothing: the job was no longer `processing`.
    FinishIgnored {
        job_id: Uuid,
    },
    NotificationFailed {
        job_id: Uuid,
        error: &'a str,
    },
    StoreError {
        operation: &'static str,
        error: &'a str,
    },
    ShuttingDown {
        worker_id: &'a str,
        in_flight: usize,
    },
    Stopped {
        worker_id: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::AbandonedJobsFailed { count } => {
                tracing::warn!(%count, "Failed abandoned processing jobs");
            }
            WorkerEvent::Polling { free_slots } => {
                tracing::debug!(%free_slots, "Polling for jobs");
            }
            WorkerEvent::JobClaimed { job } => {
                tracing::info!(job_id = %job.id, url = %job.url, platform = %job.platform, "Job claimed");
            }
            WorkerEvent::JobCompleted {
                job_id,
                game,
                created,
                strategy,
            } => {
                tracing::info!(%job_id, %game, %created, %strategy, "Job completed");
            }
            WorkerEvent::JobFailed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Job failed");
            }
            WorkerEvent::JobPanicked { job_id } => {
                tracing::error!(%job_id, "Job task panicked");
            }
            WorkerEvent::FinishIgnored { job_id } => {
                tracing::warn!(%job_id, "Job was no longer processing; outcome not recorded");
            }
            WorkerEvent::NotificationFailed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Notification delivery failed");
            }
            WorkerEvent::StoreError { operation, error } => {
                tracing::error!(%operation, %error, "Job store error");
            }
            WorkerEvent::ShuttingDown {
                worker_id,
                in_flight,
            } => {
                tracing::info!(%worker_id, %in_flight, "Worker shutting down, draining in-flight jobs");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// What a job task hands back to the loop.
struct JobReport {
    job_id: Uuid,
    outcome: JobOutcome,
    recorded: Result<bool, AppError>,
    notified: Option<Result<(), AppError>>,
}

/// Worker that polls the job store and runs scrape jobs with bounded concurrency.
pub struct WorkerService<S, F, G, N>
where
    S: JobStore,
    F: PageFetcher,
    G: GameStore,
    N: Notifier,
{
    store: S,
    scraper: ScrapeService<F, G>,
    notifier: N,
    config: WorkerConfig,
    waker: JobWaker,
}

impl<S, F, G, N> WorkerService<S, F, G, N>
where
    S: JobStore + 'static,
    F: PageFetcher + 'static,
    G: GameStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: S, scraper: ScrapeService<F, G>, notifier: N, config: WorkerConfig) -> Self {
        Self {
            store,
            scraper,
            notifier,
            config,
            waker: JobWaker::new(),
        }
    }

    /// Share a waker with the ingress so new jobs are picked up immediately.
    pub fn with_waker(mut self, waker: JobWaker) -> Self {
        self.waker = waker;
        self
    }

    /// Run the worker loop until cancellation, then drain in-flight jobs.
    ///
    /// Claimed jobs always reach a terminal state; nothing is released back
    /// to `pending`.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &WR,
    ) -> Result<(), AppError> {
        reporter.report(WorkerEvent::Started {
            worker_id: &self.config.worker_id,
        });

        self.fail_abandoned(reporter).await;

        let mut tasks: JoinSet<JobReport> = JoinSet::new();
        let mut in_flight: HashMap<task::Id, ScrapeJob> = HashMap::new();

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            let free_slots = self.config.max_concurrent_jobs.saturating_sub(tasks.len());
            if free_slots > 0 {
                reporter.report(WorkerEvent::Polling { free_slots });
                match self.store.claim_pending(free_slots).await {
                    Ok(jobs) => {
                        for job in jobs {
                            reporter.report(WorkerEvent::JobClaimed { job: &job });
                            let handle = tasks.spawn(execute_job(
                                self.store.clone(),
                                self.scraper.clone(),
                                self.notifier.clone(),
                                job.clone(),
                                self.config.job_timeout,
                            ));
                            in_flight.insert(handle.id(), job);
                        }
                    }
                    Err(e) => {
                        let error = e.to_string();
                        reporter.report(WorkerEvent::StoreError {
                            operation: "claim_pending",
                            error: &error,
                        });
                    }
                }
            }

            tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    self.handle_joined(joined, &mut in_flight, reporter).await;
                }
                () = self.waker.notified() => {}
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        reporter.report(WorkerEvent::ShuttingDown {
            worker_id: &self.config.worker_id,
            in_flight: tasks.len(),
        });

        while let Some(joined) = tasks.join_next_with_id().await {
            self.handle_joined(joined, &mut in_flight, reporter).await;
        }

        reporter.report(WorkerEvent::Stopped {
            worker_id: &self.config.worker_id,
        });

        Ok(())
    }

    async fn fail_abandoned<WR: WorkerReporter>(&self, reporter: &WR) {
        let Ok(age) = chrono::Duration::from_std(self.config.abandoned_after) else {
            return;
        };

        match self.store.fail_abandoned(Utc::now() - age, ABANDONED_ERROR).await {
            Ok(0) => {}
            Ok(count) => reporter.report(WorkerEvent::AbandonedJobsFailed { count }),
            Err(e) => {
                let error = e.to_string();
                reporter.report(WorkerEvent::StoreError {
                    operation: "fail_abandoned",
                    error: &error,
                });
            }
        }
    }

    async fn handle_joined<WR: WorkerReporter>(
        &self,
        joined: Result<(task::Id, JobReport), JoinError>,
        in_flight: &mut HashMap<task::Id, ScrapeJob>,
        reporter: &WR,
    ) {
        match joined {
            Ok((id, report)) => {
                in_flight.remove(&id);
                report_job(&report, reporter);
            }
            Err(join_error) => {
                let Some(job) = in_flight.remove(&join_error.id()) else {
                    tracing::error!(error = %join_error, "Unknown job task ended abnormally");
                    return;
                };
                reporter.report(WorkerEvent::JobPanicked { job_id: job.id });

                let outcome = JobOutcome::Failed(format!("Internal error while processing job: {join_error}"));
                let report = record_and_notify(&self.store, &self.notifier, job, outcome).await;
                report_job(&report, reporter);
            }
        }
    }
}

/// Body of one spawned job task.
async fn execute_job<S, F, G, N>(
    store: S,
    scraper: ScrapeService<F, G>,
    notifier: N,
    job: ScrapeJob,
    job_timeout: Duration,
) -> JobReport
where
    S: JobStore,
    F: PageFetcher,
    G: GameStore,
    N: Notifier,
{
    let outcome = match tokio::time::timeout(job_timeout, scraper.scrape(&job.url)).await {
        Ok(Ok(result)) => JobOutcome::Completed(result),
        Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
        Err(_) => JobOutcome::Failed(AppError::JobTimeout(job_timeout.as_secs()).to_string()),
    };

    record_and_notify(&store, &notifier, job, outcome).await
}

async fn record_and_notify<S: JobStore, N: Notifier>(
    store: &S,
    notifier: &N,
    job: ScrapeJob,
    outcome: JobOutcome,
) -> JobReport {
    let job_id = job.id;
    let recorded = store.finish(job_id, &outcome).await;

    let notified = match recorded {
        Ok(true) => {
            let finished = job.with_outcome(outcome.clone(), Utc::now());
            Some(notifier.notify(&finished).await)
        }
        _ => None,
    };

    JobReport {
        job_id,
        outcome,
        recorded,
        notified,
    }
}

fn report_job<WR: WorkerReporter>(report: &JobReport, reporter: &WR) {
    match &report.outcome {
        JobOutcome::Completed(result) => reporter.report(WorkerEvent::JobCompleted {
            job_id: report.job_id,
            game: &result.game.name,
            created: result.saved.created,
            strategy: &result.strategy,
        }),
        JobOutcome::Failed(error) => reporter.report(WorkerEvent::JobFailed {
            job_id: report.job_id,
            error,
        }),
    }

    match &report.recorded {
        Ok(true) => {}
        Ok(false) => reporter.report(WorkerEvent::FinishIgnored {
            job_id: report.job_id,
        }),
        Err(e) => {
            let error = e.to_string();
            reporter.report(WorkerEvent::StoreError {
                operation: "finish",
                error: &error,
            });
        }
    }

    if let Some(Err(e)) = &report.notified {
        let error = e.to_string();
        reporter.report(WorkerEvent::NotificationFailed {
            job_id: report.job_id,
            error: &error,
        });
    }
}
