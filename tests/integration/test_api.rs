//! Integration tests for the HTTP API and WebSocket event stream.
//!
//! These tests bind a real listener, serve the router, and drive an attempt
//! over HTTP while observing the event stream over WebSocket.

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

use ascent_orchestrator::{create_router, AppState, CoachService, Config, SessionEvent};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Helper type for WebSocket clients.
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns its base URL and WebSocket URL.
async fn spawn_test_server() -> (String, String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let base_url = format!("http://{addr}");
    let ws_url = format!("ws://{addr}/ws");

    let service = Arc::new(CoachService::with_defaults(Config::default()));
    let router = create_router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (base_url, ws_url, handle)
}

/// Receives the next event from the WebSocket.
async fn receive_event(client: &mut WsClient) -> SessionEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_status_endpoint_over_http() {
    let (base_url, _ws, _handle) = spawn_test_server().await;

    let response = reqwest::get(format!("{base_url}/api/status"))
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("invalid json");
    assert_eq!(body["status"], "ok");
    assert!(body["problems"].as_u64().expect("problems") > 0);
}

#[tokio::test]
async fn test_full_attempt_over_http() {
    let (base_url, _ws, _handle) = spawn_test_server().await;
    let client = reqwest::Client::new();

    // Open an attempt.
    let attempt: serde_json::Value = client
        .post(format!("{base_url}/api/attempts"))
        .json(&json!({"userId": "u1", "problemId": "sw-1-max-sum-window"}))
        .send()
        .await
        .expect("create failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(attempt["state"], "thinking_gate");
    let id = attempt["id"].as_str().expect("id").to_string();

    // Pass the thinking gate.
    let review: serde_json::Value = client
        .post(format!("{base_url}/api/attempts/{id}/thinking"))
        .json(&json!({
            "pattern": "sliding_window",
            "invariant": "the window stays valid while the right edge expands"
        }))
        .send()
        .await
        .expect("thinking failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(review["attempt"]["state"], "coding");
    assert!(review["gate"]["errors"].as_array().expect("errors").is_empty());

    // Request a hint and resume.
    let grant: serde_json::Value = client
        .post(format!("{base_url}/api/attempts/{id}/hints"))
        .json(&json!({}))
        .send()
        .await
        .expect("hint failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(grant["status"], "granted");
    assert_eq!(grant["level"], "directional_question");

    client
        .post(format!("{base_url}/api/attempts/{id}/resume"))
        .send()
        .await
        .expect("resume failed");

    // Submit a clean solution.
    let code = "left = 0\nfor right in range(n):\n    total += nums[right]\n    while total > limit:\n        total -= nums[left]\n        left += 1\n";
    let review: serde_json::Value = client
        .post(format!("{base_url}/api/attempts/{id}/code"))
        .json(&json!({"code": code}))
        .send()
        .await
        .expect("code failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(review["decision"]["action"], "proceed");
    assert_eq!(review["attempt"]["state"], "completed");
    assert_eq!(review["mastery"]["wasApplied"], true);
    assert!(review["progression"]["action"].is_string());

    // Progress reflects the completion.
    let progress: serde_json::Value = client
        .get(format!("{base_url}/api/users/u1/progress"))
        .send()
        .await
        .expect("progress failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(progress["attempts"].as_array().expect("attempts").len(), 1);
    assert_eq!(progress["skills"].as_array().expect("skills").len(), 1);
}

#[tokio::test]
async fn test_invalid_step_returns_conflict() {
    let (base_url, _ws, _handle) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let attempt: serde_json::Value = client
        .post(format!("{base_url}/api/attempts"))
        .json(&json!({"userId": "u1", "problemId": "sw-1-max-sum-window"}))
        .send()
        .await
        .expect("create failed")
        .json()
        .await
        .expect("invalid json");
    let id = attempt["id"].as_str().expect("id");

    // Code before the thinking gate is an illegal step.
    let response = client
        .post(format!("{base_url}/api/attempts/{id}/code"))
        .json(&json!({"code": "pass"}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_websocket_streams_attempt_events() {
    let (base_url, ws_url, _handle) = spawn_test_server().await;

    let (mut ws_client, _) = connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    // The connected event arrives immediately.
    let event = receive_event(&mut ws_client).await;
    assert!(
        matches!(event, SessionEvent::Connected(_)),
        "Expected Connected event, got: {event:?}"
    );

    // Opening an attempt over HTTP is broadcast to the stream.
    let client = reqwest::Client::new();
    client
        .post(format!("{base_url}/api/attempts"))
        .json(&json!({"userId": "u1", "problemId": "gd-1-count-islands"}))
        .send()
        .await
        .expect("create failed");

    let event = receive_event(&mut ws_client).await;
    let SessionEvent::AttemptStarted(payload) = event else {
        panic!("Expected AttemptStarted event, got: {event:?}");
    };
    assert_eq!(payload.user, "u1");
    assert_eq!(payload.problem_id, "gd-1-count-islands");
}

#[tokio::test]
async fn test_gate_events_follow_submissions() {
    let (base_url, ws_url, _handle) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let attempt: serde_json::Value = client
        .post(format!("{base_url}/api/attempts"))
        .json(&json!({"userId": "u2", "problemId": "bs-1-first-true"}))
        .send()
        .await
        .expect("create failed")
        .json()
        .await
        .expect("invalid json");
    let id = attempt["id"].as_str().expect("id");

    // Subscribe after the attempt exists; only later events arrive.
    let (mut ws_client, _) = connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    let event = receive_event(&mut ws_client).await;
    assert!(matches!(event, SessionEvent::Connected(_)));

    client
        .post(format!("{base_url}/api/attempts/{id}/thinking"))
        .json(&json!({
            "pattern": "binary_search",
            "invariant": "the answer always stays inside the narrowed half"
        }))
        .send()
        .await
        .expect("thinking failed");

    let event = receive_event(&mut ws_client).await;
    let SessionEvent::GateChecked(payload) = event else {
        panic!("Expected GateChecked event, got: {event:?}");
    };
    assert!(payload.passed);
}
