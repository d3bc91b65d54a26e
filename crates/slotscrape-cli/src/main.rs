use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use slotscrape_client::{PlatformNotifier, ReqwestPageFetcher};
use slotscrape_core::util::validate_target_url;
use slotscrape_core::{
    CreateScrapeJobRequest, GameStore, JobStatus, JobStore, Platform, ScrapeService,
    StrategyConfig, StrategyRunner, TracingWorkerReporter, WorkerConfig, WorkerService,
};
use slotscrape_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "slotscrape", version, about = "Scrape slot game pages into a catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process queued scrape jobs until Ctrl-C
    Worker {
        /// Worker identity used in logs (defaults to a random ID)
        #[arg(long, env = "SLOTSCRAPE_WORKER_ID")]
        worker_id: Option<String>,
    },

    /// Run the fetch strategies against a page once and print the result
    Scrape {
        /// Game page to scrape
        #[arg(short, long)]
        url: String,

        /// Save the extracted game to the database (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Extract a game from a saved HTML file without touching the network
    Extract {
        /// HTML file to read
        #[arg(short, long)]
        file: PathBuf,

        /// URL the page was fetched from (used to resolve relative links)
        #[arg(short, long)]
        url: String,
    },

    /// Queue a scrape job for the worker
    Submit {
        /// Game page to scrape
        #[arg(short, long)]
        url: String,

        /// Requester recorded on the job
        #[arg(long)]
        requested_by: Option<String>,
    },

    /// List jobs, newest first
    Jobs {
        /// Filter by status (pending, processing, completed, failed)
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Number of jobs to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show a single job
    Job {
        /// Job ID
        id: Uuid,
    },

    /// Delete finished jobs older than the given age
    Purge {
        /// Age in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slotscrape=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Worker { worker_id } => cmd_worker(worker_id).await?,
        Commands::Scrape { url, save } => {
            let db = if save { Some(connect_db().await?) } else { None };
            cmd_scrape(&url, db.as_ref()).await?;
        }
        Commands::Extract { file, url } => cmd_extract(&file, &url)?,
        Commands::Submit { url, requested_by } => {
            let db = connect_db().await?;
            cmd_submit(&url, requested_by, &db).await?;
        }
        Commands::Jobs { status, limit } => {
            let db = connect_db().await?;
            let jobs = db.job_repo().list_jobs(status, limit).await?;
            print_json(&jobs)?;
        }
        Commands::Job { id } => {
            let db = connect_db().await?;
            let job = db
                .job_repo()
                .get_job(id)
                .await?
                .with_context(|| format!("Job not found: {id}"))?;
            print_json(&job)?;
        }
        Commands::Purge { days } => {
            let db = connect_db().await?;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
            let deleted = db.job_repo().purge_finished(cutoff).await?;
            tracing::info!(deleted, days, "Purged finished jobs");
            print_json(&json!({ "deleted": deleted }))?;
        }
        Commands::Migrate => {
            connect_db().await?;
            tracing::info!("Migrations applied");
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply pending migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_worker(worker_id: Option<String>) -> Result<()> {
    let db = connect_db().await?;

    let mut config = WorkerConfig::from_env()?;
    if let Some(id) = worker_id {
        config = config.with_worker_id(id);
    }

    let runner = StrategyRunner::with_defaults(
        ReqwestPageFetcher::from_env()?,
        &StrategyConfig::from_env()?,
    );
    let scraper = ScrapeService::new(runner, db.game_repo());
    let worker = WorkerService::new(db.job_repo(), scraper, PlatformNotifier::from_env()?, config);

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, draining in-flight jobs");
                signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });

    worker.run(cancel, &TracingWorkerReporter).await?;
    Ok(())
}

async fn cmd_scrape(url: &str, db: Option<&Database>) -> Result<()> {
    let runner = StrategyRunner::with_defaults(
        ReqwestPageFetcher::from_env()?,
        &StrategyConfig::from_env()?,
    );

    tracing::info!("Scraping {url}");
    let outcome = runner.run(url).await?;

    let saved = match db {
        Some(db) => {
            let saved = db.game_repo().save_game(&outcome.extraction.game, url).await?;
            if saved.created {
                tracing::info!(id = %saved.id, slug = %saved.slug, "Saved new game");
            } else {
                tracing::info!(id = %saved.id, slug = %saved.slug, "Game already exists");
            }
            Some(saved)
        }
        None => None,
    };

    print_json(&json!({
        "game": outcome.extraction.game,
        "listed_names": outcome.extraction.listed_names,
        "strategy": outcome.strategy,
        "elapsed_ms": outcome.elapsed_ms,
        "attempts": outcome.attempts,
        "saved": saved,
    }))
}

fn cmd_extract(file: &Path, url: &str) -> Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;
    let target = validate_target_url(url)?;

    let extraction = slotscrape_core::extract(&html, target.as_str())
        .with_context(|| format!("No game found in {}", file.display()))?;

    tracing::info!(game = %extraction.game.name, source = %extraction.game.source.as_str(), "Extracted");
    print_json(&extraction)
}

async fn cmd_submit(url: &str, requested_by: Option<String>, db: &Database) -> Result<()> {
    let target = validate_target_url(url)?;

    let mut request = CreateScrapeJobRequest::new(target.to_string(), Platform::Api);
    if let Some(requester) = requested_by {
        request = request.with_requested_by(requester);
    }

    let job = db.job_repo().create_job(request).await?;
    tracing::info!(job_id = %job.id, url = %job.url, "Job queued");
    print_json(&job)
}
