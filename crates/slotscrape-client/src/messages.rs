//! Human-readable job summaries shared by the chat notifiers.

use slotscrape_core::job::{JobOutcome, JobResult, ScrapeJob};
use slotscrape_core::util::truncate_chars;

/// Discord rejects message content longer than this.
pub const DISCORD_CONTENT_LIMIT: usize = 2000;
/// Telegram rejects message text longer than this.
pub const TELEGRAM_TEXT_LIMIT: usize = 4096;

const FAILURE_HINT: &str = "try a direct game page URL or a different source";

/// Render the terminal outcome of a job as plain (markdown-ish) text.
///
/// Returns `None` for jobs that have not finished.
pub fn job_summary(job: &ScrapeJob) -> Option<String> {
    match job.outcome()? {
        JobOutcome::Completed(result) => Some(success_text(job, &result)),
        JobOutcome::Failed(error) => Some(failure_text(job, &error)),
    }
}

fn success_text(job: &ScrapeJob, result: &JobResult) -> String {
    let game = &result.game;
    let mut lines = vec![
        format!("✅ **Scrape Job #{} Complete**", job.id),
        String::new(),
        format!("🔗 **Source:** {}", job.url),
        format!("🎰 **Game:** {}", game.name),
        format!(
            "🏢 **Provider:** {}",
            game.provider.as_deref().unwrap_or("Unknown")
        ),
    ];

    if let Some(rtp) = &game.rtp {
        lines.push(format!("📊 **RTP:** {rtp}"));
    }
    if let Some(volatility) = game.volatility {
        lines.push(format!("🌡️ **Volatility:** {volatility}"));
    }
    if let Some(max_win) = &game.max_win {
        lines.push(format!("💰 **Max Win:** {max_win}"));
    }

    lines.push(String::new());
    lines.push(if result.saved.created {
        format!("🗄️ Saved as new game `{}`", result.saved.slug)
    } else {
        format!("🗄️ Already in database as `{}`", result.saved.slug)
    });
    lines.push(format!(
        "⚙️ Strategy: {} ({} ms)",
        result.strategy, result.elapsed_ms
    ));

    let others: Vec<&str> = result
        .listed_names
        .iter()
        .map(String::as_str)
        .filter(|name| *name != game.name)
        .collect();
    if !others.is_empty() {
        lines.push(String::new());
        lines.push("**Also listed on this page:**".to_string());
        lines.extend(others.iter().map(|name| format!("• {name}")));
    }

    lines.join("\n")
}

fn failure_text(job: &ScrapeJob, error: &str) -> String {
    [
        format!("❌ **Scrape Job #{} Failed**", job.id),
        String::new(),
        format!("🔗 **Source:** {}", job.url),
        format!("**Error:** {error}"),
        String::new(),
        format!("💡 **Next Steps:** {FAILURE_HINT}."),
    ]
    .join("\n")
}

/// Truncate a summary to a platform's message limit.
pub fn fit_to(text: &str, limit: usize) -> String {
    truncate_chars(text, limit)
}
