//! Registers the list/get/create/replace/patch/delete handlers for every
//! configured resource (§4.10). Route registration walks `config.resources`
//! at startup and adds one literal path per resource rather than a single
//! wildcard `/{resource}` route, so an unconfigured path falls through to
//! axum's own 404 instead of a handler-level lookup failure.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router};
use pretendo_auth::Subject;
use pretendo_errors::AppError;
use pretendo_query::{querystring::parse_list_query, Record};
use pretendo_store::special_fields::SpecialFieldContext;

use crate::routes::envelope::{item_response, list_response};
use crate::state::AppState;

pub fn register(config: &pretendo_config::PretendoConfig, mut router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    for resource in &config.resources {
        let collection_path = format!("/{}", resource.name);
        let item_path = format!("/{}/{{id}}", resource.name);

        {
            let list_name = resource.name.clone();
            let create_name = resource.name.clone();
            router = router.route(
                &collection_path,
                axum::routing::get(move |state: State<Arc<AppState>>, uri: Uri| {
                    let name = list_name.clone();
                    async move { list_handler(name, state, uri).await }
                })
                .post(
                    move |state: State<Arc<AppState>>, subject: Extension<Option<Subject>>, Json(body): Json<Record>| {
                        let name = create_name.clone();
                        async move { create_handler(name, state, subject, body).await }
                    },
                ),
            );
        }

        {
            let get_name = resource.name.clone();
            let put_name = resource.name.clone();
            let patch_name = resource.name.clone();
            let delete_name = resource.name.clone();
            router = router.route(
                &item_path,
                axum::routing::get(move |state: State<Arc<AppState>>, path: Path<String>, uri: Uri| {
                    let name = get_name.clone();
                    async move { get_handler(name, state, path, uri).await }
                })
                .put(
                    move |state: State<Arc<AppState>>,
                          path: Path<String>,
                          subject: Extension<Option<Subject>>,
                          Json(body): Json<Record>| {
                        let name = put_name.clone();
                        async move { replace_handler(name, state, path, subject, body).await }
                    },
                )
                .patch(
                    move |state: State<Arc<AppState>>,
                          path: Path<String>,
                          subject: Extension<Option<Subject>>,
                          Json(body): Json<Record>| {
                        let name = patch_name.clone();
                        async move { patch_handler(name, state, path, subject, body).await }
                    },
                )
                .delete(move |state: State<Arc<AppState>>, path: Path<String>| {
                    let name = delete_name.clone();
                    async move { delete_handler(name, state, path).await }
                }),
            );
        }
    }
    router
}

fn handle_missing(resource: &str) -> AppError {
    AppError::internal(format!("resource {resource} not registered"))
}

fn subject_context(subject: &Option<Subject>) -> SpecialFieldContext {
    SpecialFieldContext {
        user_id: subject.as_ref().and_then(|s| s.id.clone()),
    }
}

async fn list_handler(resource: String, State(state): State<Arc<AppState>>, uri: Uri) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    let raw_query = uri.query().unwrap_or("");
    let query = parse_list_query(raw_query, state.config.options.default_page_size, state.config.options.max_page_size)
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let (records, meta) = handle.find_all(&query)?;
    Ok(list_response(records, meta, &format!("/{resource}"), raw_query))
}

async fn get_handler(
    resource: String,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    uri: Uri,
) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    let query = parse_list_query(
        uri.query().unwrap_or(""),
        state.config.options.default_page_size,
        state.config.options.max_page_size,
    )
    .map_err(|e| AppError::bad_request(e.to_string()))?;
    let record = handle.find_by_id(&id, &query.expand)?;
    Ok(item_response(record))
}

async fn create_handler(
    resource: String,
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Option<Subject>>,
    body: Record,
) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    let ctx = subject_context(&subject);
    let record = handle.create(body, &ctx).await?;
    let mut response = item_response(record);
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

async fn replace_handler(
    resource: String,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(subject): Extension<Option<Subject>>,
    body: Record,
) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    let ctx = subject_context(&subject);
    let record = handle.replace(&id, body, &ctx).await?;
    Ok(item_response(record))
}

async fn patch_handler(
    resource: String,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(subject): Extension<Option<Subject>>,
    body: Record,
) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    let ctx = subject_context(&subject);
    let record = handle.patch(&id, body, &ctx).await?;
    Ok(item_response(record))
}

async fn delete_handler(
    resource: String,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let handle = state.db.resource(&resource).ok_or_else(|| handle_missing(&resource))?;
    handle.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
