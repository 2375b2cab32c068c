//! End-to-end integration tests for the myPlant backend.
//!
//! These tests drive the gateway router with real provider and notifier
//! clients pointed at local mock servers, over an in-memory store.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use myplant_agent::{AssistantQuery, AssistantSettings, ContextAssembler};
use myplant_config::GatewayConfig;
use myplant_gateway::{Diagnostics, GatewayState, build_router};
use myplant_notify::{EventNotifier, FcmNotifier};
use myplant_providers::OpenAiCompatProvider;
use myplant_security::{AuditLogger, AuditOutcome, ENCRYPTION_ADMIN_KEY, KeyIssuer, StaticSecrets, derive_data_key};
use myplant_store::InMemoryStore;

// ── Mock upstreams ───────────────────────────────────────────────────────

type Captured = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// What the mock LLM answers.
#[derive(Clone, Copy)]
enum LlmMode {
    Reply,
    Quota,
    Down,
}

async fn mock_llm(mode: LlmMode) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let seen = captured.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(body);
                match mode {
                    LlmMode::Reply => Json(json!({
                        "model": "gpt-4o-mini",
                        "choices": [{"message": {"role": "assistant", "content": "Water the north bed tonight."}}],
                        "usage": {"prompt_tokens": 400, "completion_tokens": 8, "total_tokens": 408}
                    }))
                    .into_response(),
                    LlmMode::Quota => (
                        StatusCode::TOO_MANY_REQUESTS,
                        r#"{"error":{"code":"insufficient_quota"}}"#,
                    )
                        .into_response(),
                    LlmMode::Down => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
                }
            }
        }),
    );
    (format!("{}/v1", serve(app).await), captured)
}

/// FCM mock; rejects topic sends when `reject_topics` is set.
async fn mock_fcm(reject_topics: bool) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let seen = captured.clone();
    let app = Router::new().route(
        "/v1/projects/{project}/messages:send",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                let is_topic = body["message"].get("topic").is_some();
                seen.lock().unwrap().push(body);
                if reject_topics && is_topic {
                    (StatusCode::NOT_FOUND, "Requested entity was not found.").into_response()
                } else {
                    Json(json!({"name": "projects/myplant-dev/messages/0:1234"})).into_response()
                }
            }
        }),
    );
    (format!("{}/v1", serve(app).await), captured)
}

// ── Wiring ───────────────────────────────────────────────────────────────

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let recent = |minutes: i64| (Utc::now() - Duration::minutes(minutes)).to_rfc3339();

    store.insert_profile("admin-1", json!({"role": "admin"})).await;
    store
        .insert_device("esp32-a", json!({"name": "North bed", "status": "online", "lastSeen": recent(2)}))
        .await;
    store
        .insert_reading(json!({"deviceId": "esp32-a", "timestamp": recent(5), "temperature": 27.5, "humidity": 40, "moisture": 3400}))
        .await;
    store
        .insert_reading(json!({"deviceId": "esp32-a", "timestamp": "1970-01-01T00:00:00Z", "temperature": 99}))
        .await;
    store
        .insert_event(json!({"deviceId": "esp32-a", "timestamp": recent(10), "type": "alert", "message": "Soil too dry", "priority": "high"}))
        .await;
    store
}

async fn gateway(store: &InMemoryStore, llm_url: &str, fcm_url: &str) -> (Router, Arc<AuditLogger>) {
    let shared = Arc::new(store.clone());
    let audit = Arc::new(AuditLogger::new());
    let secrets = StaticSecrets::new().with(ENCRYPTION_ADMIN_KEY, Some("farm-secret".into()));

    let provider = Arc::new(OpenAiCompatProvider::new("openai", llm_url, "sk-test"));
    let notifier = Arc::new(FcmNotifier::new("myplant-dev", Some("ya29.token".into())).with_base_url(fcm_url));

    let assembler = ContextAssembler::new(shared.clone(), shared.clone(), shared.clone());
    let state = Arc::new(GatewayState {
        config: GatewayConfig::default(),
        keys: Arc::new(KeyIssuer::new(shared.clone(), Arc::new(secrets), audit.clone())),
        assistant: Arc::new(AssistantQuery::new(
            assembler,
            shared,
            provider,
            AssistantSettings::default(),
        )),
        events: Arc::new(EventNotifier::new(notifier.clone(), "admins")),
        diagnostics: Arc::new(Diagnostics::new(notifier, "admins")),
    });
    (build_router(state), audit)
}

async fn call(app: Router, uri: &str, body: Value, uid: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(uid) = uid {
        builder = builder.header("x-myplant-uid", uid);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

// ── E2E: queryAgent ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_query_agent_sends_briefing_to_llm() {
    let store = seeded_store().await;
    let (llm_url, llm_seen) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, _) = mock_fcm(false).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, body) = call(
        app,
        "/queryAgent",
        json!({"data": {"prompt": "Should I water?", "deviceId": "esp32-a"}}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["reply"], "Water the north bed tonight.");

    let sent = llm_seen.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let request = &sent[0];
    assert_eq!(request["model"], "gpt-4o-mini");
    assert_eq!(request["max_tokens"], 600);
    assert_eq!(request["messages"][0]["role"], "system");
    assert_eq!(request["messages"][1]["content"], "Should I water?");

    let briefing = request["messages"][0]["content"].as_str().unwrap();
    assert!(briefing.contains("Temperature: 27.5°C"));
    assert!(!briefing.contains("Temperature: 99°C"));
    assert!(briefing.contains("Recent System Events"));
    assert!(briefing.contains("esp32-a: alert - Soil too dry (high priority)"));
}

#[tokio::test]
async fn e2e_query_agent_quota_reply() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Quota).await;
    let (fcm_url, _) = mock_fcm(false).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, body) = call(app, "/queryAgent", json!({"data": {}}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]["reply"].as_str().unwrap().contains("billing issues"));
}

#[tokio::test]
async fn e2e_query_agent_falls_back_to_readings() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Down).await;
    let (fcm_url, _) = mock_fcm(false).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (_, body) = call(app, "/queryAgent", json!({"data": {"deviceId": "esp32-a"}}), None).await;
    let reply = body["result"]["reply"].as_str().unwrap();
    assert_eq!(
        reply,
        r#"I'm currently having issues with my AI service. Here are the latest readings: [{"device":"esp32-a","temperature":27.5,"humidity":40,"soilMoisture":3400}]"#
    );
}

#[tokio::test]
async fn e2e_query_agent_empty_store_skips_llm() {
    let store = InMemoryStore::new();
    let (llm_url, llm_seen) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, _) = mock_fcm(false).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (_, body) = call(app, "/queryAgent", json!({}), None).await;
    assert_eq!(
        body["result"]["reply"],
        "No sensor readings found. Please check if your devices are connected."
    );
    assert!(llm_seen.lock().unwrap().is_empty());
}

// ── E2E: event trigger ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_event_trigger_pushes_to_topic() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, fcm_seen) = mock_fcm(false).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, _) = call(
        app,
        "/triggers/events/ev-42",
        json!({"deviceId": "esp32-a", "type": "alert", "message": "Soil too dry", "priority": "high", "value": 3400}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let sent = fcm_seen.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let message = &sent[0]["message"];
    assert_eq!(message["topic"], "admins");
    assert_eq!(message["notification"]["title"], "ALERT from esp32-a");
    assert_eq!(message["notification"]["body"], "Soil too dry (Priority: high)");
    assert_eq!(message["data"]["eventId"], "ev-42");
    assert_eq!(message["data"]["value"], "3400");
}

#[tokio::test]
async fn e2e_event_trigger_falls_back_to_condition() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, fcm_seen) = mock_fcm(true).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, _) = call(app, "/triggers/events/ev-43", json!({}), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let sent = fcm_seen.lock().unwrap();
    assert_eq!(sent.len(), 2);
    let fallback = &sent[1]["message"];
    assert_eq!(fallback["condition"], "'admins' in topics");
    assert_eq!(fallback["notification"]["title"], "UNKNOWN from Unknown device");
    assert!(fallback.get("data").is_none());
}

// ── E2E: getDataKey and diagnostics ──────────────────────────────────────

#[tokio::test]
async fn e2e_data_key_for_admin_is_audited() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, _) = mock_fcm(false).await;
    let (app, audit) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, body) = call(app.clone(), "/getDataKey", json!({"data": {}}), Some("admin-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["key"], derive_data_key("farm-secret"));

    let (status, body) = call(app, "/getDataKey", json!({"data": {}}), Some("ghost")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "User profile not found");

    assert_eq!(audit.entries_by_outcome(&AuditOutcome::Success).len(), 1);
    assert_eq!(audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
}

#[tokio::test]
async fn e2e_test_fcm_reports_delivery_failure() {
    let store = seeded_store().await;
    let (llm_url, _) = mock_llm(LlmMode::Reply).await;
    let (fcm_url, _) = mock_fcm(true).await;
    let (app, _) = gateway(&store, &llm_url, &fcm_url).await;

    let (status, body) = call(app, "/testFCM", json!({"data": {}}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["success"], false);
    assert!(body["result"]["error"].as_str().unwrap().contains("Requested entity was not found."));
    assert!(body["result"]["details"].as_str().unwrap().contains("'admins' topic"));
}
