use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use slotscrape_core::job::{JobStatus, Platform};
use slotscrape_core::job_store::JobStore;

use crate::integration::common::{
    TEST_SUBMISSIONS_PER_WINDOW, authed, body_json, json_post, setup_test_app,
};

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = setup_test_app().await;

    let response = app
        .send(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/v1/jobs"].is_object());
    assert!(json["paths"]["/v1/stats"].is_object());
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .send(Request::get("/v1/jobs").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .send(
            Request::get("/v1/jobs")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn create_and_get_job() {
    let app = setup_test_app().await;

    let response = app
        .send(authed(json_post(
            "/v1/jobs",
            &json!({ "url": "https://casino.test/slots/sweet-bonanza", "requested_by": "ops" }),
        )))
        .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert!(json["message"].as_str().unwrap().contains("started"));
    let job_id = json["job_id"].as_str().unwrap().to_string();

    // Enqueue signals the worker
    tokio::time::timeout(Duration::from_secs(1), app.waker.notified())
        .await
        .expect("enqueue should wake the worker");

    let response = app
        .send(authed(
            Request::get(format!("/v1/jobs/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], job_id);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["platform"], "api");
    assert_eq!(json["requested_by"], "ops");
    assert_eq!(json["url"], "https://casino.test/slots/sweet-bonanza");
    assert!(json.get("callback_token").is_none());
}

#[tokio::test]
async fn invalid_url_is_rejected_without_a_job() {
    let app = setup_test_app().await;

    for url in ["", "not a url", "ftp://casino.test/x", "casino.test/slots/x"] {
        let response = app
            .send(authed(json_post("/v1/jobs", &json!({ "url": url }))))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{url:?}");
        assert_eq!(body_json(response).await["error"], "invalid_url");
    }

    let jobs = app.db.job_repo().list_jobs(None, 10).await.unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn get_missing_job_returns_404() {
    let app = setup_test_app().await;

    let response = app
        .send(authed(
            Request::get(format!("/v1/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn list_jobs_filters_and_validates_status() {
    let app = setup_test_app().await;

    for i in 0..2 {
        let response = app
            .send(authed(json_post(
                "/v1/jobs",
                &json!({ "url": format!("https://casino.test/slots/game-{i}") }),
            )))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
    app.db.job_repo().claim_pending(1).await.unwrap();

    let response = app
        .send(authed(
            Request::get("/v1/jobs?status=pending")
                .body(Body::empty())
                .unwrap(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["jobs"][0]["status"], "pending");

    let response = app
        .send(authed(Request::get("/v1/jobs").body(Body::empty()).unwrap()))
        .await;
    assert_eq!(body_json(response).await["total"], 2);

    let response = app
        .send(authed(
            Request::get("/v1/jobs?status=exploded")
                .body(Body::empty())
                .unwrap(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_counts_jobs_per_status() {
    let app = setup_test_app().await;
    let repo = app.db.job_repo();

    for i in 0..3 {
        app.send(authed(json_post(
            "/v1/jobs",
            &json!({ "url": format!("https://casino.test/slots/game-{i}"), "requested_by": format!("user-{i}") }),
        )))
        .await;
    }
    let claimed = repo.claim_pending(1).await.unwrap();
    repo.finish(
        claimed[0].id,
        &slotscrape_core::JobOutcome::Failed("boom".into()),
    )
    .await
    .unwrap();

    let response = app
        .send(authed(Request::get("/v1/stats").body(Body::empty()).unwrap()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pending"], 2);
    assert_eq!(json["processing"], 0);
    assert_eq!(json["completed"], 0);
    assert_eq!(json["failed"], 1);
}

#[tokio::test]
async fn submissions_over_budget_return_429() {
    let app = setup_test_app().await;

    let submit = || {
        authed(json_post(
            "/v1/jobs",
            &json!({ "url": "https://casino.test/slots/x", "requested_by": "spammer" }),
        ))
    };

    for _ in 0..TEST_SUBMISSIONS_PER_WINDOW {
        assert_eq!(app.send(submit()).await.status(), StatusCode::ACCEPTED);
    }
    let response = app.send(submit()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["error"], "rate_limit_exceeded");

    let pending = app
        .db
        .job_repo()
        .count_by_status(JobStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending, i64::from(TEST_SUBMISSIONS_PER_WINDOW));

    // Other requesters are unaffected
    let other = authed(json_post(
        "/v1/jobs",
        &json!({ "url": "https://casino.test/slots/x", "requested_by": "someone-else" }),
    ));
    assert_eq!(app.send(other).await.status(), StatusCode::ACCEPTED);

    let jobs = app.db.job_repo().list_jobs(None, 10).await.unwrap();
    assert!(jobs.iter().all(|j| j.platform == Platform::Api));
}
