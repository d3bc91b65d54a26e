use slotscrape_core::JobWaker;
use slotscrape_db::Database;

use crate::limiter::SubmissionLimiter;
use crate::webhooks::discord::DiscordIngressConfig;
use crate::webhooks::telegram::TelegramIngressConfig;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    /// Bearer key for `/v1/*`.
    pub api_key: String,
    /// Signalled after every enqueue so an embedded worker claims immediately.
    pub waker: JobWaker,
    pub limiter: SubmissionLimiter,
    pub discord: DiscordIngressConfig,
    pub telegram: TelegramIngressConfig,
}
