//! Ordered HTTP fetch strategies and the runner that escalates through them.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::StrategyConfig;
use crate::error::AppError;
use crate::extract::ExtractionEngine;
use crate::models::Extraction;
use crate::traits::PageFetcher;
use crate::util::validate_target_url;

const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
const FIREFOX_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0";
const CHROME_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// One fixed fetch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    /// Waited once before the first request.
    pub delay: Duration,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub attempts: u32,
    /// Linear backoff unit: attempt `n` (n ≥ 2) waits `backoff * (n - 1)`.
    pub backoff: Duration,
    /// Send `Referer: <origin of target>`.
    pub referer_origin: bool,
}

impl Strategy {
    pub fn new(name: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            user_agent: user_agent.into(),
            headers: Vec::new(),
            delay: Duration::ZERO,
            timeout,
            attempts: 1,
            backoff: Duration::ZERO,
            referer_origin: false,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn with_referer_origin(mut self) -> Self {
        self.referer_origin = true;
        self
    }

    fn browser_headers(self) -> Self {
        self.header("Accept", ACCEPT_HTML)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
    }
}

/// The five built-in strategies, in the order they are tried.
pub fn default_strategies(config: &StrategyConfig) -> Vec<Strategy> {
    vec![
        Strategy::new("DirectFetch", CHROME_WINDOWS, config.fetch_timeout)
            .browser_headers()
            .header("Cache-Control", "no-cache"),
        Strategy::new("WithRetries", CHROME_MAC, config.retry_timeout)
            .browser_headers()
            .with_retries(config.retry_attempts, config.retry_backoff),
        Strategy::new("MobileUserAgent", SAFARI_IPHONE, config.fetch_timeout)
            .header("Accept", ACCEPT_HTML)
            .header("Accept-Language", "en-US,en;q=0.9"),
        Strategy::new("WithCookies", FIREFOX_WINDOWS, config.fetch_timeout)
            .browser_headers()
            .header("Cookie", "session=visitor; preferences=accepted; region=US")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1"),
        Strategy::new("SlowRequest", CHROME_LINUX, config.slow_timeout)
            .browser_headers()
            .with_delay(config.slow_delay)
            .with_referer_origin(),
    ]
}

/// What happened when one strategy was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    FetchFailed { error: String },
    NoGame { bytes: usize },
    Extracted { bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub tries: u32,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Successful run: the extraction plus provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub extraction: Extraction,
    pub strategy: String,
    pub elapsed_ms: u64,
    pub attempts: Vec<StrategyAttempt>,
}

/// Tries strategies in order until one yields HTML with an extractable game.
#[derive(Clone)]
pub struct StrategyRunner<F: PageFetcher> {
    fetcher: F,
    strategies: Arc<Vec<Strategy>>,
    engine: Arc<ExtractionEngine>,
}

impl<F: PageFetcher> StrategyRunner<F> {
    pub fn new(fetcher: F, strategies: Vec<Strategy>) -> Self {
        Self {
            fetcher,
            strategies: Arc::new(strategies),
            engine: Arc::new(ExtractionEngine::default()),
        }
    }

    pub fn with_defaults(fetcher: F, config: &StrategyConfig) -> Self {
        Self::new(fetcher, default_strategies(config))
    }

    pub fn with_engine(mut self, engine: ExtractionEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub async fn run(&self, url: &str) -> Result<RunOutcome, AppError> {
        let target = validate_target_url(url)?;
        let url = target.as_str();
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut last_error: Option<String> = None;

        for strategy in self.strategies.iter() {
            let strategy_started = Instant::now();
            let (result, tries) = self.fetch_with_retries(url, strategy).await;
            let elapsed_ms = millis(strategy_started);

            let html = match result {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(strategy = %strategy.name, %url, error = %e, "Strategy fetch failed");
                    let error = e.to_string();
                    last_error = Some(format!("{}: {}", strategy.name, error));
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name.clone(),
                        tries,
                        elapsed_ms,
                        outcome: AttemptOutcome::FetchFailed { error },
                    });
                    continue;
                }
            };

            let bytes = html.len();
            match self.engine.extract(&html, url) {
                Some(extraction) => {
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name.clone(),
                        tries,
                        elapsed_ms,
                        outcome: AttemptOutcome::Extracted { bytes },
                    });
                    let elapsed_ms = millis(started);
                    tracing::info!(
                        strategy = %strategy.name,
                        %url,
                        game = %extraction.game.name,
                        elapsed_ms,
                        "Strategy succeeded"
                    );
                    return Ok(RunOutcome {
                        extraction,
                        strategy: strategy.name.clone(),
                        elapsed_ms,
                        attempts,
                    });
                }
                None => {
                    tracing::info!(strategy = %strategy.name, %url, bytes, "Fetched page has no extractable game");
                    last_error = Some(format!("{}: no game found in page", strategy.name));
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name.clone(),
                        tries,
                        elapsed_ms,
                        outcome: AttemptOutcome::NoGame { bytes },
                    });
                }
            }
        }

        Err(AppError::StrategiesExhausted {
            tried: self.strategies.len(),
            last_error,
        })
    }

    /// Returns the final result and the number of requests made.
    async fn fetch_with_retries(&self, url: &str, strategy: &Strategy) -> (Result<String, AppError>, u32) {
        if !strategy.delay.is_zero() {
            tokio::time::sleep(strategy.delay).await;
        }

        let mut tries = 0;
        loop {
            tries += 1;
            let result = match tokio::time::timeout(strategy.timeout, self.fetcher.fetch(url, strategy)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(strategy.timeout.as_secs())),
            };

            match result {
                Err(e) if tries < strategy.attempts && e.is_fetch_error() => {
                    tracing::debug!(strategy = %strategy.name, attempt = tries, error = %e, "Retrying");
                    tokio::time::sleep(strategy.backoff * tries).await;
                }
                other => return (other, tries),
            }
        }
    }
}

fn millis(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
