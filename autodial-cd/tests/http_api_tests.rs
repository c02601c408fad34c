//! HTTP API integration tests
//!
//! Drive the router in-process with `oneshot`; calls go through the
//! simulated transport with fixed outcomes.

use autodial_cd::services::transport::SimulatedTransport;
use autodial_cd::services::{
    CampaignOrchestrator, CommandInterpreter, DialerOptions, InMemoryCallLog, NumberListValidator,
};
use autodial_cd::{build_router, AppState};
use autodial_common::config::{AmbiguityPolicy, SimulatedTransportSettings};
use autodial_common::events::EventBus;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// App whose calls connect after `delay_ms`
fn test_app(delay_ms: u64, policy: AmbiguityPolicy) -> Router {
    let transport = SimulatedTransport::with_seed(
        SimulatedTransportSettings {
            min_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            connect_ratio: 1.0,
        },
        1,
    );
    let event_bus = EventBus::new(100);
    let orchestrator = CampaignOrchestrator::new(
        Arc::new(transport),
        Arc::new(InMemoryCallLog::new()),
        event_bus.clone(),
        DialerOptions::default(),
    );
    let validator = NumberListValidator::default();
    let interpreter = CommandInterpreter::new(validator.clone(), policy);

    build_router(AppState::new(orchestrator, validator, interpreter, event_bus))
}

fn fast_app() -> Router {
    test_app(0, AmbiguityPolicy::First)
}

/// Calls stay in flight long enough for the test to observe a running campaign
fn slow_app() -> Router {
    test_app(60_000, AmbiguityPolicy::First)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn wait_until_idle(app: &Router) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, status) = send(app, "GET", "/calling_status", None).await;
            if status["running"] == false {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("campaign did not finish")
}

/// Wait for the first call of the running campaign to be in flight
async fn wait_until_dialing(app: &Router) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, status) = send(app, "GET", "/calling_status", None).await;
            if status["current_number"] != "" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("no call went in flight")
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_start_calling_accepts_valid_numbers() {
    let app = fast_app();

    let (status, body) = send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["1800555 1234", "", "abc", "+18004443333"], "ai_voice": true})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["total"], 2);
    assert!(body["campaign_id"].is_string());
    assert_eq!(body["rejected"], json!([{"raw": "abc", "reason": "InvalidFormat"}]));

    let done = wait_until_idle(&app).await;
    assert_eq!(done["progress"], 100);
    assert_eq!(done["connected"], 2);
    assert_eq!(done["current_number"], "");
}

#[tokio::test]
async fn test_start_calling_all_invalid_is_400() {
    let app = fast_app();
    let (status, body) = send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["abc", "12"], "ai_voice": false})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "EMPTY_QUEUE");
}

#[tokio::test]
async fn test_start_calling_while_running_is_400() {
    let app = slow_app();
    let (status, _) = send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["18005551234"]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["18004443333"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ALREADY_RUNNING");

    let status = wait_until_dialing(&app).await;
    assert_eq!(status["running"], true);
    assert_eq!(status["total"], 1);
    assert_eq!(status["current_number"], "18005551234");
}

#[tokio::test]
async fn test_start_calling_malformed_body_is_400() {
    let app = fast_app();
    let (status, body) = send(&app, "POST", "/start_calling", Some(json!({"numbers": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn test_ai_command_queues_single_call() {
    let app = fast_app();
    let (status, body) = send(
        &app,
        "POST",
        "/ai_command",
        Some(json!({"command": "Please dial 1-800-555-1234 now", "ai_voice": false})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Call initiated to 18005551234");
    assert_eq!(body["number"], "18005551234");
    assert_eq!(body["ai_voice"], false);

    let done = wait_until_idle(&app).await;
    assert_eq!(done["total"], 1);
    assert_eq!(done["progress"], 100);
}

#[tokio::test]
async fn test_ai_command_voice_from_text() {
    let app = fast_app();
    let (_, body) = send(
        &app,
        "POST",
        "/ai_command",
        Some(json!({"command": "call 18005551234 without ai voice"})),
    )
    .await;
    assert_eq!(body["ai_voice"], false);
}

#[tokio::test]
async fn test_ai_command_errors() {
    let app = fast_app();

    let (status, body) = send(
        &app,
        "POST",
        "/ai_command",
        Some(json!({"command": "hello there"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NO_NUMBER_FOUND");

    let (status, body) = send(&app, "POST", "/ai_command", Some(json!({"command": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn test_ai_command_ambiguous_under_reject_policy() {
    let app = test_app(0, AmbiguityPolicy::Reject);
    let (status, body) = send(
        &app,
        "POST",
        "/ai_command",
        Some(json!({"command": "18005551234 or 18004443333"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "AMBIGUOUS_COMMAND");
}

#[tokio::test]
async fn test_ai_command_while_running_is_400() {
    let app = slow_app();
    send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["18005551234"]})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/ai_command",
        Some(json!({"command": "call 18004443333"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ALREADY_RUNNING");
}

#[tokio::test]
async fn test_calling_status_idle() {
    let app = fast_app();
    let (status, body) = send(&app, "GET", "/calling_status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], 0);
    assert_eq!(body["current_number"], "");
    assert_eq!(body["running"], false);
    assert_eq!(body["campaign_id"], Value::Null);
}

#[tokio::test]
async fn test_call_logs_for_last_completed_campaign() {
    let app = fast_app();

    let (status, body) = send(&app, "GET", "/call_logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_calls"], 0);
    assert_eq!(body["logs"], json!([]));

    send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["18005551234", "18004443333"], "ai_voice": true})),
    )
    .await;
    wait_until_idle(&app).await;

    let (status, body) = send(&app, "GET", "/call_logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_calls"], 2);
    assert_eq!(body["connected_calls"], 2);
    assert_eq!(body["failed_calls"], 0);
    assert_eq!(body["logs"][0]["number"], "18005551234");
    assert_eq!(body["logs"][1]["number"], "18004443333");
    assert_eq!(body["logs"][0]["state"], "CONNECTED");
}

#[tokio::test]
async fn test_cancel_calling() {
    let app = slow_app();

    let (status, body) = send(&app, "POST", "/cancel_calling", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NOT_RUNNING");

    send(
        &app,
        "POST",
        "/start_calling",
        Some(json!({"numbers": ["18005551234", "18004443333", "18002223333"]})),
    )
    .await;

    wait_until_dialing(&app).await;

    let (status, body) = send(&app, "POST", "/cancel_calling", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], 2);

    let (_, s) = send(&app, "GET", "/calling_status", None).await;
    assert_eq!(s["running"], false);
    assert_eq!(s["failed"], 2);
}

#[tokio::test]
async fn test_health() {
    let app = fast_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "autodial-cd");
    assert_eq!(body["campaign_status"], "IDLE");
}
