use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, VerifyingKey};
use serde::Deserialize;
use serde_json::{Value, json};
use slotscrape_core::error::AppError;
use slotscrape_core::job::{CreateScrapeJobRequest, Platform};

use super::USAGE;
use crate::error::ApiError;
use crate::intake;
use crate::state::AppState;

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const EPHEMERAL: u32 = 1 << 6;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Discord ingress settings.
#[derive(Debug, Clone, Default)]
pub struct DiscordIngressConfig {
    /// Application public key. Without one every interaction is rejected.
    pub public_key: Option<VerifyingKey>,
    /// Which guilds may use the bot. `None` allows every guild.
    pub allowed_guilds: Option<HashSet<String>>,
}

impl DiscordIngressConfig {
    /// - `DISCORD_PUBLIC_KEY`: hex-encoded Ed25519 key from the developer portal
    /// - `DISCORD_ALLOWED_GUILDS`: comma-separated guild ids
    pub fn from_env() -> Result<Self, AppError> {
        let public_key = match std::env::var("DISCORD_PUBLIC_KEY") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_public_key(raw.trim())?),
            _ => {
                tracing::warn!("DISCORD_PUBLIC_KEY not set; Discord interactions will be rejected");
                None
            }
        };
        let allowed_guilds = std::env::var("DISCORD_ALLOWED_GUILDS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());
        Ok(Self {
            public_key,
            allowed_guilds,
        })
    }

    pub fn with_public_key(mut self, key: VerifyingKey) -> Self {
        self.public_key = Some(key);
        self
    }

    pub fn with_allowed_guilds<I, S>(mut self, guilds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_guilds = Some(guilds.into_iter().map(Into::into).collect());
        self
    }

    /// Check the Ed25519 signature over `timestamp || body`.
    pub fn signature_matches(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(key) = &self.public_key else {
            return false;
        };
        let (Some(signature), Some(timestamp)) = (
            header_str(headers, SIGNATURE_HEADER),
            header_str(headers, TIMESTAMP_HEADER),
        ) else {
            return false;
        };

        let mut raw = [0u8; SIGNATURE_LENGTH];
        if hex::decode_to_slice(signature, &mut raw).is_err() {
            return false;
        }
        let signature = Signature::from_bytes(&raw);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        key.verify_strict(&message, &signature).is_ok()
    }

    fn allows(&self, guild_id: Option<&str>) -> bool {
        match (&self.allowed_guilds, guild_id) {
            (None, _) => true,
            (Some(allowed), Some(id)) => allowed.contains(id),
            (Some(_), None) => false,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_public_key(raw: &str) -> Result<VerifyingKey, AppError> {
    let invalid = || AppError::ConfigError(format!("Invalid DISCORD_PUBLIC_KEY '{raw}'"));
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(raw, &mut bytes).map_err(|_| invalid())?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| invalid())
}

// -- Interaction payload (only the fields used) --

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub data: Option<CommandData>,
    pub member: Option<Member>,
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

impl Interaction {
    /// Guild interactions carry the user under `member`, DMs under `user`.
    fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.as_str())
    }

    fn option_str(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|opt| opt.name == name)?
            .value
            .as_ref()?
            .as_str()
    }
}

/// What to do with an interaction.
#[derive(Debug)]
pub enum DiscordAction {
    Respond(Value),
    Enqueue(CreateScrapeJobRequest),
}

pub fn message(content: impl Into<String>) -> Value {
    json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "data": { "content": content.into() }
    })
}

pub fn ephemeral(content: impl Into<String>) -> Value {
    json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "data": { "content": content.into(), "flags": EPHEMERAL }
    })
}

pub fn started_message(url: &str, job_id: uuid::Uuid) -> Value {
    message(format!(
        "🔄 Scrape started for {url}\nJob #{job_id}\nThe result will be posted here when it finishes."
    ))
}

/// Decide the response for an interaction without touching any I/O.
pub fn route_interaction(
    config: &DiscordIngressConfig,
    interaction: &Interaction,
) -> Result<DiscordAction, AppError> {
    match interaction.kind {
        PING => return Ok(DiscordAction::Respond(json!({ "type": PONG }))),
        APPLICATION_COMMAND => {}
        other => {
            return Err(AppError::Generic(format!(
                "Unsupported interaction type {other}"
            )));
        }
    }

    if !config.allows(interaction.guild_id.as_deref()) {
        return Ok(DiscordAction::Respond(ephemeral(
            "❌ This server is not authorized to use slotscrape commands.",
        )));
    }

    let command = interaction
        .data
        .as_ref()
        .map(|d| d.name.as_str())
        .unwrap_or_default();

    match command {
        "copy" | "scrape" => {
            let Some(url) = interaction.option_str("url").filter(|u| !u.trim().is_empty()) else {
                return Ok(DiscordAction::Respond(ephemeral(
                    "❌ Please provide a URL to scrape.",
                )));
            };
            let mut request = CreateScrapeJobRequest::new(url.trim(), Platform::Discord)
                .with_callback(
                    interaction.channel_id.clone(),
                    interaction.token.clone(),
                );
            if let Some(user_id) = interaction.user_id() {
                request = request.with_requested_by(user_id);
            }
            Ok(DiscordAction::Enqueue(request))
        }
        "help" => Ok(DiscordAction::Respond(message(USAGE))),
        _ => Ok(DiscordAction::Respond(ephemeral(
            "❓ Unknown command. Use `/help` for available commands.",
        ))),
    }
}

/// `POST /webhooks/discord`
pub async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if !state.discord.signature_matches(&headers, &body) {
        tracing::warn!("Discord interaction with missing or invalid signature");
        return Ok((StatusCode::UNAUTHORIZED, "invalid request signature").into_response());
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed Discord interaction");
            return Ok(StatusCode::BAD_REQUEST.into_response());
        }
    };

    let action = match route_interaction(&state.discord, &interaction) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected Discord interaction");
            return Ok((StatusCode::BAD_REQUEST, axum::Json(ephemeral(e.to_string()))).into_response());
        }
    };

    let request = match action {
        DiscordAction::Respond(body) => return Ok(axum::Json(body).into_response()),
        DiscordAction::Enqueue(request) => request,
    };

    match intake::enqueue(&state, request).await {
        Ok(job) => Ok(axum::Json(started_message(&job.url, job.id)).into_response()),
        Err(AppError::InvalidUrl(reason)) => {
            Ok(axum::Json(ephemeral(format!("❌ Invalid URL: {reason}"))).into_response())
        }
        Err(AppError::RateLimitExceeded) => Ok(axum::Json(ephemeral(
            "⏳ Too many requests. Please wait a minute before submitting again.",
        ))
        .into_response()),
        Err(e) => Err(e.into()),
    }
}
