//! Registers `GET /<name>/{id}/<related>` for each `belongsTo`/`hasMany`
//! relationship (§4.10). Other relationship types remain reachable only via
//! `?expand=` on the owning resource's own endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use pretendo_config::{PretendoConfig, RelationshipType};
use pretendo_errors::AppError;
use pretendo_query::querystring::parse_list_query;

use crate::state::AppState;

pub fn register(config: &PretendoConfig, mut router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    for resource in &config.resources {
        for rel in &resource.relationships {
            if !matches!(rel.rel_type, RelationshipType::BelongsTo | RelationshipType::HasMany) {
                continue;
            }
            let path = format!("/{}/{{id}}/{}", resource.name, rel.name);
            let resource_name = resource.name.clone();
            let relation_name = rel.name.clone();
            router = router.route(
                &path,
                axum::routing::get(move |state: State<Arc<AppState>>, path: Path<String>, uri: Uri| {
                    let resource_name = resource_name.clone();
                    let relation_name = relation_name.clone();
                    async move { relation_handler(resource_name, relation_name, state, path, uri).await }
                }),
            );
        }
    }
    router
}

async fn relation_handler(
    resource: String,
    relation: String,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    uri: Uri,
) -> Result<Response, AppError> {
    let handle = state
        .db
        .resource(&resource)
        .ok_or_else(|| AppError::internal(format!("resource {resource} not registered")))?;
    let raw_query = uri.query().unwrap_or("");
    let query = parse_list_query(raw_query, state.config.options.default_page_size, state.config.options.max_page_size)
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let value = handle.find_related(&id, &relation, &query)?;
    Ok(Json(serde_json::json!({ "data": value })).into_response())
}
