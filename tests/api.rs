//! End-to-end tests driving the router over the in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use cronping::alerting::sweep::SweepService;
use cronping::db::memory::MemoryStore;
use cronping::db::models::MonitorStatus;
use cronping::db::store::MonitorStore;
use cronping::notifications::{AlertNotifier, NotifyError};
use cronping::server::config::{NotifierConfig, ServerConfig};
use cronping::services::{MonitorService, PingService};
use cronping::web::{AppState, create_router};

#[derive(Debug, Clone, PartialEq)]
enum Delivered {
    Down { monitor_name: String, ping_url: String },
    Up { monitor_name: String, downtime: String },
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Delivered>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Delivered> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send_down(
        &self,
        _email: &str,
        monitor_name: &str,
        _last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Delivered::Down {
            monitor_name: monitor_name.to_string(),
            ping_url: ping_url.to_string(),
        });
        Ok(())
    }

    async fn send_up(
        &self,
        _email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Delivered::Up {
            monitor_name: monitor_name.to_string(),
            downtime: downtime.to_string(),
        });
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let store_dyn: Arc<dyn MonitorStore> = store.clone();
    let notifier = Arc::new(RecordingNotifier::default());
    let notifier_dyn: Arc<dyn AlertNotifier> = notifier.clone();

    let config = Arc::new(ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        base_url: "https://cronping.dev".to_string(),
        database_url: None,
        log_dir: "logs".to_string(),
        cron_secret: Some("test-secret".to_string()),
        sweep_interval_seconds: 0,
        notify_timeout_seconds: 5,
        notifier: NotifierConfig::Log,
    });

    let sweep_service = Arc::new(SweepService::new(
        store_dyn.clone(),
        notifier_dyn.clone(),
        config.base_url.clone(),
        config.notify_timeout(),
    ));
    let ping_service = Arc::new(PingService::new(
        store_dyn.clone(),
        notifier_dyn,
        config.notify_timeout(),
    ));
    let monitor_service = Arc::new(MonitorService::new(store_dyn));

    let router = create_router(Arc::new(AppState {
        monitor_service,
        ping_service,
        sweep_service,
        config,
    }));

    TestApp {
        router,
        store,
        notifier,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let value = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("expected a JSON body (status {status}): {e}"));
    (status, value)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn bare_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn create_monitor(router: &Router, name: &str, email: &str) -> Value {
    let (status, body) = send_json(
        router,
        json_request("POST", "/api/monitors", json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app();
    let (status, body) = send(&app.router, bare_request("GET", "/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn create_monitor_applies_defaults() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;

    assert_eq!(created["name"], "db backup");
    assert_eq!(created["email"], "ops@example.com");
    assert_eq!(created["status"], "new");
    assert_eq!(created["gracePeriod"], 300);
    assert!(created["lastPing"].is_null());
    assert_eq!(created["slug"].as_str().unwrap().len(), 12);
}

#[tokio::test]
async fn create_monitor_requires_name_and_email() {
    let app = test_app();
    let (status, body) = send_json(
        &app.router,
        json_request("POST", "/api/monitors", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name and email are required");
}

#[tokio::test]
async fn create_monitor_rejects_non_positive_grace() {
    let app = test_app();
    let (status, body) = send_json(
        &app.router,
        json_request(
            "POST",
            "/api/monitors",
            json!({ "name": "job", "email": "ops@example.com", "gracePeriod": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Grace period"));
}

#[tokio::test]
async fn list_monitors_is_newest_first_with_counts() {
    let app = test_app();
    create_monitor(&app.router, "older", "ops@example.com").await;
    let newer = create_monitor(&app.router, "newer", "ops@example.com").await;
    let newer_slug = newer["slug"].as_str().unwrap();

    // One ping against the newer monitor.
    let (status, _) =
        send(&app.router, bare_request("GET", &format!("/api/ping/{newer_slug}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send_json(&app.router, bare_request("GET", "/api/monitors")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "newer");
    assert_eq!(listed[0]["pingCount"], 1);
    assert_eq!(listed[0]["status"], "up");
    assert_eq!(listed[1]["name"], "older");
    assert_eq!(listed[1]["pingCount"], 0);
    assert_eq!(listed[1]["alertCount"], 0);
}

#[tokio::test]
async fn ping_acknowledges_and_records_the_source() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;
    let slug = created["slug"].as_str().unwrap();
    let id = created["id"].as_str().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/ping/{slug}"))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, ack) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["monitor"], "db backup");
    assert_eq!(ack["recovered"], false);
    assert!(ack["timestamp"].is_string());

    let (status, detail) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "up");
    assert!(detail["lastPing"].is_string());
    let pings = detail["pings"].as_array().unwrap();
    assert_eq!(pings.len(), 1);
    assert_eq!(pings[0]["source"], "203.0.113.9");
    assert_eq!(detail["alerts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn ping_for_unknown_slug_is_not_found() {
    let app = test_app();
    let (status, body) =
        send_json(&app.router, bare_request("GET", "/api/ping/nosuchslug12")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Monitor not found");
}

#[tokio::test]
async fn head_ping_counts_with_an_empty_body() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;
    let slug = created["slug"].as_str().unwrap();
    let id = created["id"].as_str().unwrap();

    let (status, body) =
        send(&app.router, bare_request("HEAD", &format!("/api/ping/{slug}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (_, detail) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(detail["status"], "up");
    assert_eq!(detail["pings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn paused_monitor_drops_pings_on_every_method() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;
    let slug = created["slug"].as_str().unwrap();
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send_json(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/monitors/{id}"),
            json!({ "ownerEmail": "ops@example.com", "status": "paused" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "paused");

    for method in ["GET", "POST"] {
        let (status, ack) =
            send_json(&app.router, bare_request(method, &format!("/api/ping/{slug}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "paused");
        assert_eq!(ack["message"], "Monitor is paused");
    }
    let (status, body) =
        send(&app.router, bare_request("HEAD", &format!("/api/ping/{slug}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (_, detail) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(detail["status"], "paused");
    assert_eq!(detail["pings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn update_requires_the_owner_email() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send_json(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/monitors/{id}"),
            json!({ "ownerEmail": "intruder@example.com", "name": "hijacked" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    let (status, updated) = send_json(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/monitors/{id}"),
            json!({ "ownerEmail": "ops@example.com", "name": "renamed", "gracePeriod": 120 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "renamed");
    assert_eq!(updated["gracePeriod"], 120);
}

#[tokio::test]
async fn delete_requires_the_owner_email() {
    let app = test_app();
    let created = create_monitor(&app.router, "db backup", "ops@example.com").await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send_json(
        &app.router,
        bare_request(
            "DELETE",
            &format!("/api/monitors/{id}?email=intruder@example.com"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    let (status, body) = send_json(
        &app.router,
        bare_request("DELETE", &format!("/api/monitors/{id}?email=ops@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_monitor_detail_is_not_found() {
    let app = test_app();
    let (status, body) = send_json(
        &app.router,
        bare_request(
            "GET",
            "/api/monitors/00000000-0000-0000-0000-000000000000",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Monitor not found");
}

#[tokio::test]
async fn cron_trigger_requires_the_configured_secret() {
    let app = test_app();

    let (status, body) = send_json(&app.router, bare_request("GET", "/api/cron/check")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let request = Request::builder()
        .method("GET")
        .uri("/api/cron/check")
        .header(header::AUTHORIZATION, "Bearer wrong-secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(&app.router, cron_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["checked"], 0);
    assert_eq!(body["alertsSent"], 0);
    assert_eq!(body["errors"], 0);
    assert!(body["timestamp"].is_string());
}

fn cron_request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/cron/check")
        .header(header::AUTHORIZATION, "Bearer test-secret")
        .body(Body::empty())
        .unwrap()
}

/// Drives a monitor through the full lifecycle: healthy, overdue with one
/// down alert, then recovered with one up alert.
#[tokio::test]
async fn full_down_and_recovery_journey() {
    let app = test_app();
    let created = create_monitor(&app.router, "nightly backup", "ops@example.com").await;
    let slug = created["slug"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) =
        send_json(&app.router, bare_request("GET", &format!("/api/ping/{slug}"))).await;
    assert_eq!(status, StatusCode::OK);

    // Age the last ping far past the grace period, as if the job went silent.
    let monitor = app.store.monitor_by_slug(&slug).await.unwrap().unwrap();
    let aged = monitor.last_ping.unwrap() - Duration::seconds(400);
    app.store
        .compare_and_update_status(
            monitor.id,
            monitor.status,
            monitor.last_ping,
            MonitorStatus::Up,
            Some(aged),
            Utc::now(),
        )
        .await
        .unwrap();

    let (status, swept) = send_json(&app.router, cron_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(swept["checked"], 1);
    assert_eq!(swept["alertsSent"], 1);
    assert_eq!(swept["errors"], 0);

    assert_eq!(
        app.notifier.sent(),
        vec![Delivered::Down {
            monitor_name: "nightly backup".to_string(),
            ping_url: format!("https://cronping.dev/api/ping/{slug}"),
        }]
    );

    let (_, detail) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(detail["status"], "down");
    let alerts = detail["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["kind"], "down");

    // A second sweep stays quiet for the same episode.
    let (_, swept_again) = send_json(&app.router, cron_request()).await;
    assert_eq!(swept_again["alertsSent"], 0);
    assert_eq!(swept_again["checked"], 0);
    assert_eq!(app.notifier.sent().len(), 1);

    // The next ping recovers the monitor and alerts exactly once.
    let (status, ack) =
        send_json(&app.router, bare_request("POST", &format!("/api/ping/{slug}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["recovered"], true);

    let delivered = app.notifier.sent();
    assert_eq!(delivered.len(), 2);
    let Delivered::Up {
        monitor_name,
        downtime,
    } = &delivered[1]
    else {
        panic!("expected a recovery alert, got {:?}", delivered[1]);
    };
    assert_eq!(monitor_name, "nightly backup");
    assert!(!downtime.is_empty());

    let (_, detail) =
        send_json(&app.router, bare_request("GET", &format!("/api/monitors/{id}"))).await;
    assert_eq!(detail["status"], "up");
    let alerts = detail["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["kind"], "up");
    assert_eq!(alerts[1]["kind"], "down");
}

#[tokio::test]
async fn resumed_monitor_with_stale_ping_is_swept_promptly() {
    let app = test_app();
    let created = create_monitor(&app.router, "resumable", "ops@example.com").await;
    let slug = created["slug"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) =
        send_json(&app.router, bare_request("GET", &format!("/api/ping/{slug}"))).await;
    assert_eq!(status, StatusCode::OK);

    // Pause, age the last ping, then resume.
    let (status, _) = send_json(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/monitors/{id}"),
            json!({ "ownerEmail": "ops@example.com", "status": "paused" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let monitor = app.store.monitor_by_slug(&slug).await.unwrap().unwrap();
    let aged = monitor.last_ping.unwrap() - Duration::seconds(400);
    app.store
        .compare_and_update_status(
            monitor.id,
            monitor.status,
            monitor.last_ping,
            MonitorStatus::Paused,
            Some(aged),
            Utc::now(),
        )
        .await
        .unwrap();

    // Paused monitors are never swept.
    let (_, swept) = send_json(&app.router, cron_request()).await;
    assert_eq!(swept["checked"], 0);
    assert!(app.notifier.sent().is_empty());

    let (status, _) = send_json(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/monitors/{id}"),
            json!({ "ownerEmail": "ops@example.com", "status": "up" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Once resumed, the stale ping makes it overdue on the next pass.
    let (_, swept) = send_json(&app.router, cron_request()).await;
    assert_eq!(swept["checked"], 1);
    assert_eq!(swept["alertsSent"], 1);
}
