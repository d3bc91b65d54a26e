use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use slotscrape_core::error::AppError;
use slotscrape_core::job::{CreateScrapeJobRequest, Platform};

use super::USAGE;
use crate::auth::constant_time_eq;
use crate::error::ApiError;
use crate::intake;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Commands that take a URL argument and enqueue a scrape.
const SCRAPE_COMMANDS: &[&str] = &["/copy", "/scrape", "/import"];

#[derive(Debug, Clone, Default)]
pub struct TelegramIngressConfig {
    /// Only this user may submit; `None` allows everyone.
    pub allowed_user_id: Option<i64>,
    /// Expected value of the secret-token header; `None` skips the check.
    pub webhook_secret: Option<String>,
}

impl TelegramIngressConfig {
    /// - `TELEGRAM_ALLOWED_USER_ID`
    /// - `TELEGRAM_WEBHOOK_SECRET`
    pub fn from_env() -> Result<Self, AppError> {
        let allowed_user_id = match std::env::var("TELEGRAM_ALLOWED_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid TELEGRAM_ALLOWED_USER_ID '{raw}'"))
            })?),
            _ => None,
        };
        let webhook_secret = std::env::var("TELEGRAM_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            allowed_user_id,
            webhook_secret,
        })
    }

    pub fn with_allowed_user(mut self, user_id: i64) -> Self {
        self.allowed_user_id = Some(user_id);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    fn secret_matches(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.webhook_secret else {
            return true;
        };
        headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|given| constant_time_eq(given.as_bytes(), expected.as_bytes()))
    }
}

// -- Update payload (only the fields used) --

#[derive(Debug, Deserialize)]
pub struct Update {
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug)]
pub enum TelegramAction {
    Reply { chat_id: i64, text: String },
    Enqueue(CreateScrapeJobRequest),
    Ignore,
}

/// Webhook response that makes Telegram call `sendMessage` for us.
pub fn send_message(chat_id: i64, text: impl Into<String>) -> Value {
    json!({
        "method": "sendMessage",
        "chat_id": chat_id,
        "text": text.into(),
    })
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Split `/cmd@BotName rest` into (`/cmd`, `rest`).
fn split_command(text: &str) -> (&str, &str) {
    let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let command = head.split('@').next().unwrap_or(head);
    (command, rest.trim())
}

/// Decide the response for an update without touching any I/O.
pub fn route_update(config: &TelegramIngressConfig, update: &Update) -> TelegramAction {
    let Some(message) = &update.message else {
        return TelegramAction::Ignore;
    };
    let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return TelegramAction::Ignore;
    };
    let chat_id = message.chat.id;
    let reply = |text: &str| TelegramAction::Reply {
        chat_id,
        text: text.to_string(),
    };

    let user_id = message.from.as_ref().map(|u| u.id);
    if let Some(allowed) = config.allowed_user_id
        && user_id != Some(allowed)
    {
        return reply("🚫 Access denied. You are not authorized to use this bot.");
    }

    let url = if looks_like_url(text) && !text.contains(char::is_whitespace) {
        text
    } else {
        let (command, argument) = split_command(text);
        match command {
            "/start" | "/help" => return reply(USAGE),
            c if SCRAPE_COMMANDS.contains(&c) => {
                let url = argument.split_whitespace().next().unwrap_or_default();
                if !looks_like_url(url) {
                    return reply(&format!(
                        "❌ Please provide a valid URL.\nExample: {c} https://www.slotcatalog.com/en/slots/sweet-bonanza"
                    ));
                }
                url
            }
            c if c.starts_with('/') => {
                return reply("❓ Unknown command. Send /help for available commands.");
            }
            _ => return TelegramAction::Ignore,
        }
    };

    let mut request = CreateScrapeJobRequest::new(url, Platform::Telegram)
        .with_callback(Some(chat_id.to_string()), None);
    if let Some(user_id) = user_id {
        request = request.with_requested_by(user_id.to_string());
    }
    TelegramAction::Enqueue(request)
}

/// `POST /webhooks/telegram`
pub async fn updates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<Update>,
) -> Result<Response, ApiError> {
    if !state.telegram.secret_matches(&headers) {
        tracing::warn!("Telegram update with missing or wrong secret token");
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    let request = match route_update(&state.telegram, &update) {
        TelegramAction::Ignore => return Ok(StatusCode::OK.into_response()),
        TelegramAction::Reply { chat_id, text } => {
            return Ok(axum::Json(send_message(chat_id, text)).into_response());
        }
        TelegramAction::Enqueue(request) => request,
    };

    let chat_id: i64 = request
        .callback_channel
        .as_deref()
        .and_then(|c| c.parse().ok())
        .unwrap_or_default();

    let text = match intake::enqueue(&state, request).await {
        Ok(job) => format!(
            "🔗 Scraping {}\n⏳ Job #{} started. I'll send the result when it's done.",
            job.url, job.id
        ),
        Err(AppError::InvalidUrl(reason)) => format!("❌ Invalid URL: {reason}"),
        Err(AppError::RateLimitExceeded) => {
            "⏳ Too many requests. Please wait a minute before submitting again.".to_string()
        }
        Err(e) => return Err(e.into()),
    };

    Ok(axum::Json(send_message(chat_id, text)).into_response())
}
