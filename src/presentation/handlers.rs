// HTTP request handlers
use crate::application::dispatcher::CommandError;
use crate::domain::draft::DraftEdit;
use crate::domain::tank::{ConfigUpdate, ControlMode, ManualOverride};
use crate::infrastructure::dashboard_stream::stream_from_receiver;
use crate::infrastructure::http_response::{command_error_response, command_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct ModeRequest {
    pub mode: ControlMode,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/config", patch(update_config))
        .route("/draft", get(get_draft).put(edit_draft))
        .route("/draft/submit", post(submit_draft))
        .route("/manual/mode", post(set_mode))
        .route("/manual/overrides/:field", post(toggle_override))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint; unhealthy once the session has stopped polling
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.session.is_running() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "stopped")
    }
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session.snapshot().dashboard())
}

pub async fn stream_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_receiver(state.session.subscribe())
}

pub async fn update_config(State(state): State<Arc<AppState>>, Json(update): Json<ConfigUpdate>) -> Response {
    command_response(state.session.dispatcher().submit(update).await)
}

pub async fn get_draft(State(state): State<Arc<AppState>>) -> Response {
    match state.session.draft() {
        Some(draft) => Json(draft).into_response(),
        None => command_error_response(CommandError::ConfigUnavailable),
    }
}

pub async fn edit_draft(State(state): State<Arc<AppState>>, Json(edit): Json<DraftEdit>) -> Response {
    match state.session.edit_draft(&edit) {
        Ok(draft) => Json(draft).into_response(),
        Err(err) => command_error_response(err),
    }
}

pub async fn submit_draft(State(state): State<Arc<AppState>>) -> Response {
    command_response(state.session.submit_draft().await)
}

pub async fn set_mode(State(state): State<Arc<AppState>>, Json(request): Json<ModeRequest>) -> Response {
    command_response(state.session.gate().set_mode(request.mode).await)
}

pub async fn toggle_override(
    Path(field): Path<ManualOverride>,
    State(state): State<Arc<AppState>>,
) -> Response {
    command_response(state.session.gate().toggle(field).await)
}
