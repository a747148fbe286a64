//! Debug/admin endpoints that are never subject to RBAC (§4.8's path
//! exemption for `/__*`): reset to seed data, snapshot, and restore.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pretendo_errors::AppError;
use serde::Deserialize;

use crate::state::AppState;

pub fn register(mut router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    router = router
        .route("/__reset", post(reset_handler))
        .route("/__backup", post(backup_handler))
        .route("/__restore", post(restore_handler));
    router
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    state.db.reset_all().await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn backup_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let backup_id = state.db.backup().await?;
    Ok(Json(serde_json::json!({ "backupId": backup_id })).into_response())
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    #[serde(rename = "backupId")]
    backup_id: String,
}

async fn restore_handler(State(state): State<Arc<AppState>>, Json(body): Json<RestoreRequest>) -> Result<Response, AppError> {
    state.db.restore(&body.backup_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
