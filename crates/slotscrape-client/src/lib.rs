pub mod fetcher;
pub mod messages;
pub mod notifier;

pub use fetcher::ReqwestPageFetcher;
pub use notifier::{DiscordNotifier, PlatformNotifier, TelegramNotifier};
