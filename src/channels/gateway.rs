//! HTTP surface: Twilio inbound webhook, reminder cron trigger, health probe.

use crate::app::AppState;
use crate::channels::whatsapp::TwilioInboundForm;
use crate::config::ServerConfig;
use crate::error::TaskError;
use crate::identity::mask_address;
use crate::inbound::InboundOutcome;
use crate::reminders::ScanError;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};

/// Build the HTTP router: inbound webhook, cron trigger and health probe.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/whatsapp-incoming", post(whatsapp_incoming))
        .route("/cron", get(cron))
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until the listener fails.
pub async fn run_gateway(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!("taskmate gateway listening on http://{local_addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "now": state.now().to_rfc3339(),
    }))
}

/// `/cron` is open when no token is configured; otherwise the request must
/// carry `Authorization: Bearer <token>` exactly.
fn cron_authorized(headers: &HeaderMap, token: Option<&str>) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return token.is_none();
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented.trim() == token)
}

async fn whatsapp_incoming(
    State(state): State<AppState>,
    Form(form): Form<TwilioInboundForm>,
) -> Response {
    let Some(inbound) = form.into_inbound() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "From is required"})),
        )
            .into_response();
    };
    tracing::info!(
        channel = %inbound.channel,
        sender = %mask_address(&inbound.sender),
        "inbound message received"
    );

    let now = state.now();
    match state
        .pipeline
        .handle(&inbound.sender, &inbound.text, now)
        .await
    {
        InboundOutcome::Created(task) => (StatusCode::CREATED, Json(task)).into_response(),
        InboundOutcome::Rejected(err) => rejected_response(&err, state.registration_url()),
    }
}

fn rejected_response(err: &TaskError, registration_url: &str) -> Response {
    match err {
        TaskError::NotRegistered(_)
        | TaskError::ExtractionFailed(_)
        | TaskError::ValidationFailed(_)
        | TaskError::PersistenceFailed(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": err.code(),
                "message": err.user_message(registration_url),
            })),
        )
            .into_response(),
        TaskError::DispatchFailed(_) | TaskError::Config(_) | TaskError::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to create task"})),
        )
            .into_response(),
    }
}

async fn cron(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !cron_authorized(&headers, state.cron_token.as_deref()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "unauthorized"})),
        )
            .into_response();
    }

    match state.scanner.scan(state.now()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({ "tasks": report.pending })),
        )
            .into_response(),
        Err(ScanError::InProgress) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "reminder scan already running"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("reminder scan failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}
