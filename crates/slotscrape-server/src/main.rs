use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slotscrape_client::{PlatformNotifier, ReqwestPageFetcher};
use slotscrape_core::config::{env_flag, env_positive};
use slotscrape_core::{
    AppError, JobWaker, ScrapeService, StrategyConfig, StrategyRunner, TracingWorkerReporter,
    WorkerConfig, WorkerService,
};
use slotscrape_db::{Database, DatabaseConfig};
use slotscrape_server::limiter::{LimiterConfig, SubmissionLimiter};
use slotscrape_server::routes;
use slotscrape_server::state::AppState;
use slotscrape_server::webhooks::discord::DiscordIngressConfig;
use slotscrape_server::webhooks::telegram::TelegramIngressConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slotscrape=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("SLOTSCRAPE_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .context("SLOTSCRAPE_API_KEY must be set")?;
    let port = env_positive("SLOTSCRAPE_SERVER_PORT", 3000)?;
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let waker = JobWaker::new();
    let cancel = CancellationToken::new();

    let worker = if env_flag("SLOTSCRAPE_EMBEDDED_WORKER") {
        Some(spawn_worker(&db, waker.clone(), cancel.clone())?)
    } else {
        tracing::info!("Embedded worker disabled; run `slotscrape worker` to process jobs");
        None
    };

    let state = Arc::new(AppState {
        db,
        api_key,
        waker,
        limiter: SubmissionLimiter::new(&LimiterConfig::from_env()?),
        discord: DiscordIngressConfig::from_env()?,
        telegram: TelegramIngressConfig::from_env()?,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // Covers the server stopping for reasons other than Ctrl-C
    cancel.cancel();
    if let Some(worker) = worker {
        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Embedded worker stopped with error"),
            Err(e) => tracing::error!(error = %e, "Embedded worker task failed"),
        }
    }

    Ok(())
}

/// Run the background worker in this process, woken by every enqueue.
fn spawn_worker(
    db: &Database,
    waker: JobWaker,
    cancel: CancellationToken,
) -> Result<JoinHandle<Result<(), AppError>>, AppError> {
    let runner = StrategyRunner::with_defaults(
        ReqwestPageFetcher::from_env()?,
        &StrategyConfig::from_env()?,
    );
    let scraper = ScrapeService::new(runner, db.game_repo());
    let worker = WorkerService::new(
        db.job_repo(),
        scraper,
        PlatformNotifier::from_env()?,
        WorkerConfig::from_env()?,
    )
    .with_waker(waker);

    Ok(tokio::spawn(async move {
        worker.run(cancel, &TracingWorkerReporter).await
    }))
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
