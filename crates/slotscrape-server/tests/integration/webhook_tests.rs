use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};

use slotscrape_core::job::Platform;
use slotscrape_core::job_store::JobStore;
use slotscrape_server::webhooks::discord::DiscordIngressConfig;
use slotscrape_server::webhooks::telegram::SECRET_HEADER;

use ed25519_dalek::SigningKey;

use crate::integration::common::{
    TEST_TELEGRAM_SECRET, TEST_TELEGRAM_USER, body_json, discord_post, discord_post_signed_by,
    json_post, setup_test_app, setup_test_app_with,
};

fn discord_command(name: &str, url: &str, guild: &str) -> Value {
    json!({
        "type": 2,
        "token": "interaction-token",
        "channel_id": "chan-1",
        "guild_id": guild,
        "member": { "user": { "id": "u-77" } },
        "data": {
            "name": name,
            "options": [{ "name": "url", "type": 3, "value": url }]
        }
    })
}

fn telegram_update(text: &str, user_id: i64) -> Value {
    json!({
        "update_id": 10,
        "message": {
            "message_id": 3,
            "chat": { "id": 555, "type": "private" },
            "from": { "id": user_id, "is_bot": false, "first_name": "T" },
            "text": text
        }
    })
}

fn telegram_post(body: &Value, secret: Option<&str>) -> Request<Body> {
    let mut request = json_post("/webhooks/telegram", body);
    if let Some(secret) = secret {
        request
            .headers_mut()
            .insert(SECRET_HEADER, secret.parse().unwrap());
    }
    request
}

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discord_ping_gets_pong() {
    let app = setup_test_app().await;

    let response = app
        .send(discord_post(&json!({ "type": 1 })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "type": 1 }));
}

#[tokio::test]
async fn discord_rejects_unsigned_or_forged_interactions() {
    let app = setup_test_app().await;
    let command = discord_command("copy", "https://casino.test/slots/gates", "g-1");

    let response = app.send(json_post("/webhooks/discord", &command)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forger = SigningKey::from_bytes(&[1u8; 32]);
    let response = app.send(discord_post_signed_by(&forger, &command)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(json_post("/webhooks/discord", &json!({ "type": 1 }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(app.db.job_repo().list_jobs(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn discord_copy_enqueues_job_with_callback() {
    let app = setup_test_app().await;

    let response = app
        .send(discord_post(
            &discord_command("copy", "https://casino.test/slots/gates", "g-1"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["type"], 4);
    assert!(json["data"]["content"].as_str().unwrap().contains("Job #"));

    let jobs = app.db.job_repo().list_jobs(None, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.platform, Platform::Discord);
    assert_eq!(job.callback_channel.as_deref(), Some("chan-1"));
    assert_eq!(job.callback_token.as_deref(), Some("interaction-token"));
    assert_eq!(job.requested_by.as_deref(), Some("u-77"));
}

#[tokio::test]
async fn discord_invalid_url_is_ephemeral() {
    let app = setup_test_app().await;

    let response = app
        .send(discord_post(
            &discord_command("scrape", "ftp://casino.test/x", "g-1"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["flags"], 64);
    assert!(json["data"]["content"].as_str().unwrap().contains("Invalid URL"));
    assert!(app.db.job_repo().list_jobs(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn discord_unauthorized_guild_is_refused() {
    let app =
        setup_test_app_with(DiscordIngressConfig::default().with_allowed_guilds(["g-ok"])).await;

    let response = app
        .send(discord_post(
            &discord_command("copy", "https://casino.test/slots/x", "g-other"),
        ))
        .await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["flags"], 64);
    assert!(json["data"]["content"].as_str().unwrap().contains("not authorized"));
    assert!(app.db.job_repo().list_jobs(None, 10).await.unwrap().is_empty());

    let response = app
        .send(discord_post(
            &discord_command("copy", "https://casino.test/slots/x", "g-ok"),
        ))
        .await;
    assert_eq!(body_json(response).await["type"], 4);
    assert_eq!(app.db.job_repo().list_jobs(None, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn discord_unsupported_interaction_type_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .send(discord_post(&json!({ "type": 3 })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[tokio::test]
async fn telegram_requires_secret_token() {
    let app = setup_test_app().await;
    let update = telegram_update("/copy https://casino.test/slots/x", TEST_TELEGRAM_USER);

    let response = app.send(telegram_post(&update, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(telegram_post(&update, Some("nope"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(app.db.job_repo().list_jobs(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn telegram_copy_enqueues_job_for_chat() {
    let app = setup_test_app().await;

    let response = app
        .send(telegram_post(
            &telegram_update("/copy https://casino.test/slots/x", TEST_TELEGRAM_USER),
            Some(TEST_TELEGRAM_SECRET),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["method"], "sendMessage");
    assert_eq!(json["chat_id"], 555);
    assert!(json["text"].as_str().unwrap().contains("Job #"));

    let jobs = app.db.job_repo().list_jobs(None, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].platform, Platform::Telegram);
    assert_eq!(jobs[0].callback_channel.as_deref(), Some("555"));
    assert!(jobs[0].callback_token.is_none());
    assert_eq!(
        jobs[0].requested_by.as_deref(),
        Some(TEST_TELEGRAM_USER.to_string().as_str())
    );
}

#[tokio::test]
async fn telegram_unauthorized_user_is_denied() {
    let app = setup_test_app().await;

    let response = app
        .send(telegram_post(
            &telegram_update("/copy https://casino.test/slots/x", 4242),
            Some(TEST_TELEGRAM_SECRET),
        ))
        .await;

    let json = body_json(response).await;
    assert!(json["text"].as_str().unwrap().contains("Access denied"));
    assert!(app.db.job_repo().list_jobs(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn telegram_help_and_chatter() {
    let app = setup_test_app().await;

    let response = app
        .send(telegram_post(
            &telegram_update("/help", TEST_TELEGRAM_USER),
            Some(TEST_TELEGRAM_SECRET),
        ))
        .await;
    let json = body_json(response).await;
    assert!(json["text"].as_str().unwrap().contains("/copy"));

    let response = app
        .send(telegram_post(
            &telegram_update("good morning", TEST_TELEGRAM_USER),
            Some(TEST_TELEGRAM_SECRET),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
