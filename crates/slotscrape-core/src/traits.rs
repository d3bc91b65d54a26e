use std::future::Future;

use crate::error::AppError;
use crate::job::ScrapeJob;
use crate::models::{ExtractedGame, SavedGame};
use crate::strategy::Strategy;

/// Fetches raw HTML for a URL using one strategy's request profile.
///
/// Implementations apply the strategy's headers and per-attempt timeout.
/// Delays and retries are the runner's job, not the fetcher's.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        url: &str,
        strategy: &Strategy,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Persists extracted games.
pub trait GameStore: Send + Sync + Clone {
    /// Save a game keyed by its slug. Saving a name that already exists is a
    /// success with `created = false`.
    fn save_game(
        &self,
        game: &ExtractedGame,
        source_url: &str,
    ) -> impl Future<Output = Result<SavedGame, AppError>> + Send;
}

/// Delivers a finished job's outcome back to whoever requested it.
pub trait Notifier: Send + Sync + Clone {
    fn notify(&self, job: &ScrapeJob) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A Notifier that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    async fn notify(&self, _job: &ScrapeJob) -> Result<(), AppError> {
        Ok(())
    }
}

/// A GameStore that persists nothing and reports every game as new.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGameStore;

impl GameStore for NullGameStore {
    async fn save_game(&self, game: &ExtractedGame, _source_url: &str) -> Result<SavedGame, AppError> {
        Ok(SavedGame {
            id: uuid::Uuid::nil(),
            slug: game.slug(),
            created: true,
        })
    }
}
