use crate::infra::{AppState, DispatchJournal};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use webhook_exchange::config::{HEALTH_PATH, METRICS_PATH, READY_PATH, RECENT_DISPATCHES_PATH};
use webhook_exchange::error::AppError;
use webhook_exchange::exchange::{webhook_router, WebhookReceiver};

pub(crate) fn with_service_routes(
    receiver: Arc<WebhookReceiver<DispatchJournal>>,
    webhook_path: &str,
) -> axum::Router {
    webhook_router(receiver, webhook_path)
        .route(HEALTH_PATH, axum::routing::get(healthcheck))
        .route(READY_PATH, axum::routing::get(readiness_endpoint))
        .route(METRICS_PATH, axum::routing::get(metrics_endpoint))
        .route(
            RECENT_DISPATCHES_PATH,
            axum::routing::get(recent_dispatches_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn recent_dispatches_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let recent = state.journal.recent()?;
    Ok(Json(json!({
        "count": recent.len(),
        "events": serde_json::to_value(recent)?,
    })))
}
