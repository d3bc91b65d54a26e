use crate::error::AppError;
use crate::job::JobResult;
use crate::strategy::StrategyRunner;
use crate::traits::{GameStore, PageFetcher};

/// Runs one scrape end to end: strategies → extraction → save.
///
/// Generic over the fetcher and game store so the worker and the CLI can
/// share it, and tests can run it without network or database.
#[derive(Clone)]
pub struct ScrapeService<F, G>
where
    F: PageFetcher,
    G: GameStore,
{
    runner: StrategyRunner<F>,
    store: G,
}

impl<F, G> ScrapeService<F, G>
where
    F: PageFetcher,
    G: GameStore,
{
    pub fn new(runner: StrategyRunner<F>, store: G) -> Self {
        Self { runner, store }
    }

    pub fn runner(&self) -> &StrategyRunner<F> {
        &self.runner
    }

    /// Scrape `url` and persist the extracted game.
    ///
    /// A game that already exists is reported with `created = false`, not as an error.
    pub async fn scrape(&self, url: &str) -> Result<JobResult, AppError> {
        let outcome = self.runner.run(url).await?;
        let game = outcome.extraction.game;

        let saved = self.store.save_game(&game, url).await?;
        if saved.created {
            tracing::info!(id = %saved.id, slug = %saved.slug, "Saved new game");
        } else {
            tracing::info!(id = %saved.id, slug = %saved.slug, "Game already exists");
        }

        Ok(JobResult {
            games_found: 1,
            game,
            saved,
            strategy: outcome.strategy,
            elapsed_ms: outcome.elapsed_ms,
            listed_names: outcome.extraction.listed_names,
        })
    }
}
