//! `GET /__docs`: the generated OpenAPI document, as JSON by default or YAML
//! when `?format=yaml` is given (§4.12).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use pretendo_auth::Subject;
use pretendo_errors::AppError;

use crate::state::AppState;

pub async fn docs_handler(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Option<Subject>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    if let Some(docs) = &state.config.options.docs {
        if docs.require_auth && subject.is_none() {
            return Err(AppError::unauthorized("authentication required to view API docs"));
        }
    }

    let server_url = format!("http://{}:{}", state.config.options.host, state.config.options.port);
    let document = pretendo_openapi::build_document(&state.config, &server_url);

    if params.get("format").map(String::as_str) == Some("yaml") {
        let yaml = pretendo_openapi::to_yaml(&document).map_err(|e| AppError::internal(e.to_string()))?;
        Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml).into_response())
    } else {
        Ok(Json(document).into_response())
    }
}
