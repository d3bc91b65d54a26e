use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use slotscrape_core::error::AppError;
use slotscrape_core::job::{JobStatus, Platform, ScrapeJob};
use slotscrape_core::traits::Notifier;

use crate::messages::{DISCORD_CONTENT_LIMIT, TELEGRAM_TEXT_LIMIT, fit_to, job_summary};

const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Discord only accepts follow-ups on an interaction token for this long.
const DISCORD_TOKEN_WINDOW: Duration = Duration::from_secs(15 * 60);

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_FAILURE: u32 = 0xff0000;

fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(NOTIFY_TIMEOUT)
        .build()
        .map_err(|e| AppError::NotificationError(e.to_string()))
}

async fn post_json<T: Serialize>(
    client: &Client,
    url: &str,
    body: &T,
    platform: Platform,
) -> Result<(), AppError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| AppError::NotificationError(format!("{platform} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::NotificationError(format!(
            "{platform} returned HTTP {}: {}",
            status.as_u16(),
            fit_to(&body, 200)
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct DiscordFollowup {
    pub content: String,
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DiscordEmbed {
    pub color: u32,
    pub timestamp: String,
    pub footer: DiscordFooter,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DiscordFooter {
    pub text: String,
}

/// Build the interaction follow-up message for a finished job.
pub fn discord_followup(job: &ScrapeJob, now: DateTime<Utc>) -> Option<DiscordFollowup> {
    let summary = job_summary(job)?;
    let (color, footer) = if job.status == JobStatus::Completed {
        (COLOR_SUCCESS, "slotscrape worker • processing complete")
    } else {
        (COLOR_FAILURE, "slotscrape worker • processing failed")
    };

    Some(DiscordFollowup {
        content: fit_to(&summary, DISCORD_CONTENT_LIMIT),
        embeds: vec![DiscordEmbed {
            color,
            timestamp: now.to_rfc3339(),
            footer: DiscordFooter {
                text: footer.to_string(),
            },
        }],
    })
}

/// Posts job results as follow-ups on the originating Discord interaction.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    application_id: String,
    api_base: String,
}

impl DiscordNotifier {
    pub fn new(application_id: impl Into<String>) -> Result<Self, AppError> {
        Self::with_api_base(application_id, DEFAULT_DISCORD_API_BASE)
    }

    pub fn with_api_base(
        application_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client()?,
            application_id: application_id.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn webhook_url(&self, token: &str) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.api_base, self.application_id, token
        )
    }
}

impl Notifier for DiscordNotifier {
    async fn notify(&self, job: &ScrapeJob) -> Result<(), AppError> {
        let token = job.callback_token.as_deref().ok_or_else(|| {
            AppError::NotificationError(format!("Job {} has no Discord interaction token", job.id))
        })?;

        let now = Utc::now();
        let age = (now - job.created_at).to_std().unwrap_or_default();
        if age > DISCORD_TOKEN_WINDOW {
            tracing::warn!(
                job_id = %job.id,
                age_secs = age.as_secs(),
                "Discord interaction token is past its 15 minute window; delivery will likely fail"
            );
        }

        let message = discord_followup(job, now).ok_or_else(|| {
            AppError::NotificationError(format!("Job {} has not finished", job.id))
        })?;

        post_json(&self.client, &self.webhook_url(token), &message, Platform::Discord).await?;
        tracing::debug!(job_id = %job.id, "Discord follow-up sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct TelegramMessage {
    pub chat_id: String,
    pub text: String,
}

pub fn telegram_message(job: &ScrapeJob) -> Option<TelegramMessage> {
    let chat_id = job.callback_channel.clone()?;
    let text = job_summary(job)?.replace("**", "");
    Some(TelegramMessage {
        chat_id,
        text: fit_to(&text, TELEGRAM_TEXT_LIMIT),
    })
}

/// Sends job results to the originating Telegram chat via the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>) -> Result<Self, AppError> {
        Self::with_api_base(bot_token, DEFAULT_TELEGRAM_API_BASE)
    }

    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client()?,
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, job: &ScrapeJob) -> Result<(), AppError> {
        if job.callback_channel.is_none() {
            return Err(AppError::NotificationError(format!(
                "Job {} has no Telegram chat id",
                job.id
            )));
        }
        let message = telegram_message(job).ok_or_else(|| {
            AppError::NotificationError(format!("Job {} has not finished", job.id))
        })?;

        post_json(&self.client, &self.send_message_url(), &message, Platform::Telegram).await?;
        tracing::debug!(job_id = %job.id, "Telegram message sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Routes each job to the notifier for the platform it came from.
///
/// API jobs are polled by their caller, so nothing is sent for them.
#[derive(Clone, Default)]
pub struct PlatformNotifier {
    discord: Option<DiscordNotifier>,
    telegram: Option<TelegramNotifier>,
}

impl PlatformNotifier {
    pub fn new(discord: Option<DiscordNotifier>, telegram: Option<TelegramNotifier>) -> Self {
        Self { discord, telegram }
    }

    /// Configure from the environment.
    ///
    /// - `DISCORD_APPLICATION_ID`, `DISCORD_API_BASE` (optional)
    /// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_API_BASE` (optional)
    ///
    /// A platform without credentials is left unconfigured; jobs from it fail
    /// to notify with a `NotificationError` rather than failing startup.
    pub fn from_env() -> Result<Self, AppError> {
        let discord = match non_empty_env("DISCORD_APPLICATION_ID") {
            Some(app_id) => Some(DiscordNotifier::with_api_base(
                app_id,
                non_empty_env("DISCORD_API_BASE")
                    .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            )?),
            None => None,
        };
        let telegram = match non_empty_env("TELEGRAM_BOT_TOKEN") {
            Some(token) => Some(TelegramNotifier::with_api_base(
                token,
                non_empty_env("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            )?),
            None => None,
        };

        if discord.is_none() {
            tracing::info!("DISCORD_APPLICATION_ID not set; Discord notifications disabled");
        }
        if telegram.is_none() {
            tracing::info!("TELEGRAM_BOT_TOKEN not set; Telegram notifications disabled");
        }

        Ok(Self { discord, telegram })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Notifier for PlatformNotifier {
    async fn notify(&self, job: &ScrapeJob) -> Result<(), AppError> {
        match job.platform {
            Platform::Api => Ok(()),
            Platform::Discord => match &self.discord {
                Some(discord) => discord.notify(job).await,
                None => Err(AppError::NotificationError(
                    "Discord notifier is not configured".into(),
                )),
            },
            Platform::Telegram => match &self.telegram {
                Some(telegram) => telegram.notify(job).await,
                None => Err(AppError::NotificationError(
                    "Telegram notifier is not configured".into(),
                )),
            },
        }
    }
}
