//! `GET /`: a small discovery document listing configured resources.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

pub async fn root_handler(State(state): State<Arc<AppState>>) -> Response {
    let resources: Vec<&str> = state.config.resources.iter().map(|r| r.name.as_str()).collect();
    Json(serde_json::json!({
        "name": "Pretendo",
        "resources": resources,
        "documentation": "/__docs",
    }))
    .into_response()
}
