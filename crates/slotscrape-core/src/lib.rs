//! Core of slotscrape: job model, extraction engine, strategy runner and worker.

pub mod config;
pub mod error;
pub mod extract;
pub mod job;
pub mod job_store;
pub mod models;
pub mod scrape;
pub mod strategy;
pub mod traits;
pub mod util;
pub mod worker;

#[cfg(test)]
pub mod testutil;

pub use config::StrategyConfig;
pub use error::AppError;
pub use extract::{ExtractionEngine, NameRules, extract};
pub use job::{
    CreateScrapeJobRequest, JobOutcome, JobResult, JobStatus, Platform, ScrapeJob, WorkerConfig,
};
pub use job_store::JobStore;
pub use models::{ExtractedGame, Extraction, GameSource, SavedGame, Volatility, game_slug};
pub use scrape::ScrapeService;
pub use strategy::{RunOutcome, Strategy, StrategyAttempt, StrategyRunner, default_strategies};
pub use traits::{GameStore, Notifier, NullGameStore, NullNotifier, PageFetcher};
pub use worker::{JobWaker, TracingWorkerReporter, WorkerEvent, WorkerReporter, WorkerService};
