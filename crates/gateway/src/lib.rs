//! HTTP gateway for the myPlant backend.
//!
//! Serves the callables (`getDataKey`, `queryAgent`, `testFCM`,
//! `helloWorld`) using the Firebase callable wire protocol, the
//! event-created trigger, and a health check.
//!
//! Built on Axum.

pub mod diagnostics;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use myplant_agent::{AssistantQuery, AssistantRequest};
use myplant_config::GatewayConfig;
use myplant_core::error::CallableError;
use myplant_notify::EventNotifier;
use myplant_security::KeyIssuer;

pub use diagnostics::Diagnostics;

/// Request body size limit (1 MB).
const BODY_LIMIT: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub keys: Arc<KeyIssuer>,
    pub assistant: Arc<AssistantQuery>,
    pub events: Arc<EventNotifier>,
    pub diagnostics: Arc<Diagnostics>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let trace = state.config.trace_requests;
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/getDataKey", post(get_data_key_handler))
        .route("/queryAgent", post(query_agent_handler))
        .route("/testFCM", post(test_fcm_handler))
        .route("/helloWorld", post(hello_world_handler))
        .route("/triggers/events/{event_id}", post(event_created_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state);

    if trace {
        router.layer(tower_http::trace::TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Start the gateway HTTP server.
pub async fn start(state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Callable protocol ---

#[derive(Serialize)]
struct CallableSuccess<T> {
    result: T,
}

#[derive(Serialize)]
struct CallableFailure {
    error: CallableErrorBody,
}

#[derive(Serialize)]
struct CallableErrorBody {
    status: &'static str,
    message: String,
}

/// A callable outcome rendered as `{"result": ...}` or `{"error": ...}`.
struct Callable<T>(Result<T, CallableError>);

impl<T: Serialize> IntoResponse for Callable<T> {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(result) => Json(CallableSuccess { result }).into_response(),
            Err(e) => {
                let status = StatusCode::from_u16(e.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = CallableFailure {
                    error: CallableErrorBody {
                        status: e.status(),
                        message: e.to_string(),
                    },
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// The `data` member of a callable request. A missing body or field is `{}`.
fn callable_data(body: &Bytes) -> Value {
    let empty = || Value::Object(Default::default());
    if body.is_empty() {
        return empty();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(mut envelope) => match envelope.get_mut("data").map(Value::take) {
            Some(Value::Null) | None => empty(),
            Some(data) => data,
        },
        Err(e) => {
            warn!(error = %e, "Callable body is not JSON; treating as empty");
            empty()
        }
    }
}

/// The platform-authenticated caller, if any.
fn caller<'a>(headers: &'a HeaderMap, config: &GatewayConfig) -> Option<&'a str> {
    headers
        .get(config.identity_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_data_key_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let uid = caller(&headers, &state.config);
    Callable(state.keys.issue(uid).await)
}

async fn query_agent_handler(State(state): State<SharedState>, body: Bytes) -> impl IntoResponse {
    let request = AssistantRequest::from_value(&callable_data(&body));
    info!(
        device_id = request.device_id.as_deref().unwrap_or("all"),
        time_range = request.time_range.as_deref().unwrap_or("latest"),
        "queryAgent called"
    );
    Callable(Ok(state.assistant.answer(&request).await))
}

async fn test_fcm_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Callable(Ok(state.diagnostics.test_notify().await))
}

async fn hello_world_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Callable(Ok(state.diagnostics.ping()))
}

async fn event_created_handler(
    State(state): State<SharedState>,
    Path(event_id): Path<String>,
    body: Bytes,
) -> StatusCode {
    let document = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "Event body is not JSON");
                None
            }
        }
    };

    state.events.on_event_created(&event_id, document.as_ref()).await;
    StatusCode::NO_CONTENT
}
