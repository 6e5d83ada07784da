//! HTTP endpoint for form answers.
//!
//! - `POST /api/answer`: answer a payload, always `200 {received, results}`
//! - `OPTIONS /api/answer`: `200`, empty body
//! - any other method on `/api/answer`: `405 {"error":"Method Not Allowed"}`
//! - `GET /health`: `{"status":"ok"}`
//!
//! Every response carries permissive CORS headers.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, info};

use formfill_core::AnswerEnvelope;
use formfill_runtime::AnswerOrchestrator;

/// Shared handler state.
pub type AppState = Arc<AnswerOrchestrator>;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

/// Build the application router.
pub fn router(orchestrator: AppState) -> Router {
    Router::new()
        .route(
            "/api/answer",
            post(answer)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(orchestrator)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn run(addr: SocketAddr, orchestrator: AnswerOrchestrator) -> Result<()> {
    let app = router(Arc::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn answer(State(orchestrator): State<AppState>, body: Bytes) -> Json<AnswerEnvelope> {
    // Undecodable bodies become an empty payload
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        debug!(error = %e, bytes = body.len(), "Request body is not JSON");
        Value::Null
    });

    Json(orchestrator.answer_payload(&payload).await)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            error: "Method Not Allowed",
        }),
    )
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}
