use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use ed25519_dalek::{Signer, SigningKey};
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tower::ServiceExt;

use slotscrape_core::JobWaker;
use slotscrape_db::Database;
use slotscrape_server::limiter::{LimiterConfig, SubmissionLimiter};
use slotscrape_server::routes;
use slotscrape_server::state::AppState;
use slotscrape_server::webhooks::discord::{
    DiscordIngressConfig, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use slotscrape_server::webhooks::telegram::TelegramIngressConfig;

pub const TEST_API_KEY: &str = "test-secret-key";
pub const TEST_TELEGRAM_SECRET: &str = "tg-secret";
pub const TEST_TELEGRAM_USER: i64 = 1001;
pub const TEST_SUBMISSIONS_PER_WINDOW: u32 = 3;
pub const TEST_DISCORD_TIMESTAMP: &str = "1700000000";

/// Key the test app's Discord config trusts.
pub fn test_discord_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub waker: JobWaker,
    _container: ContainerAsync<GenericImage>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Spin up a PostgreSQL container and return the test app with migrations applied.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(DiscordIngressConfig::default()).await
}

pub async fn setup_test_app_with(discord: DiscordIngressConfig) -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "slotscrape_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/slotscrape_test");

    let db = Database::from_pool(retry_connect(&url).await);
    db.migrate().await.expect("Failed to run migrations");

    let waker = JobWaker::new();
    let state = Arc::new(AppState {
        db: db.clone(),
        api_key: TEST_API_KEY.to_string(),
        waker: waker.clone(),
        limiter: SubmissionLimiter::new(
            &LimiterConfig::default().with_submissions_per_window(TEST_SUBMISSIONS_PER_WINDOW),
        ),
        discord: discord.with_public_key(test_discord_key().verifying_key()),
        telegram: TelegramIngressConfig::default()
            .with_allowed_user(TEST_TELEGRAM_USER)
            .with_webhook_secret(TEST_TELEGRAM_SECRET),
    });

    TestApp {
        router: routes::router(state),
        db,
        waker,
        _container: container,
    }
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}

pub fn json_post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// A Discord interaction POST signed with `key` over `timestamp || body`.
pub fn discord_post_signed_by(key: &SigningKey, body: &serde_json::Value) -> Request<Body> {
    let payload = serde_json::to_vec(body).unwrap();
    let mut message = TEST_DISCORD_TIMESTAMP.as_bytes().to_vec();
    message.extend_from_slice(&payload);
    let signature = hex::encode(key.sign(&message).to_bytes());

    Request::post("/webhooks/discord")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, TEST_DISCORD_TIMESTAMP)
        .body(Body::from(payload))
        .unwrap()
}

pub fn discord_post(body: &serde_json::Value) -> Request<Body> {
    discord_post_signed_by(&test_discord_key(), body)
}

pub fn authed(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {TEST_API_KEY}").parse().unwrap(),
    );
    request
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
