//! Per-resource, per-action role-list enforcement (§4.8). Reads the resource
//! name off the path; the action is derived from the method and whether an
//! id segment is present.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pretendo_auth::Subject;
use pretendo_config::Action;
use pretendo_store::idkey::loose_eq;
use serde_json::Value;

use crate::state::AppState;

fn derive_action(method: &axum::http::Method, has_id: bool) -> Option<Action> {
    use axum::http::Method;
    Some(match *method {
        Method::GET if has_id => Action::Get,
        Method::GET => Action::List,
        Method::POST => Action::Create,
        Method::PUT | Method::PATCH => Action::Update,
        Method::DELETE => Action::Delete,
        _ => return None,
    })
}

fn is_admin_or_auth_path(path: &str, login_endpoint: &str) -> bool {
    path.starts_with("/__") || path == login_endpoint || path == "/auth/logout"
}

pub async fn enforce(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let login_endpoint = state
        .config
        .options
        .auth
        .as_ref()
        .map(|a| a.endpoint.as_str())
        .unwrap_or("/auth/login");

    if is_admin_or_auth_path(&path, login_endpoint) {
        return next.run(req).await;
    }

    let mut segments = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty());
    let Some(resource) = segments.next() else {
        return next.run(req).await;
    };
    if !state.db.resource_exists(resource) {
        // Not a configured resource: likely a custom route, which enforces
        // its own route-level auth. Let it through.
        return next.run(req).await;
    }
    let id = segments.next();
    let has_id = id.is_some();

    let Some(action) = derive_action(req.method(), has_id) else {
        return next.run(req).await;
    };

    let access = state.db.access_for(resource, action);
    if access.is_empty() {
        return next.run(req).await;
    }

    let subject = req.extensions().get::<Option<Subject>>().cloned().flatten();

    let Some(subject) = subject else {
        return pretendo_errors::AppError::unauthorized("authentication required").into_response();
    };

    if access.iter().any(|role| role == "*") {
        return next.run(req).await;
    }

    if let Some(role) = &subject.role {
        if access.iter().any(|r| r == role) {
            return next.run(req).await;
        }
    }

    if access.iter().any(|role| role == "owner") {
        if let Some(id) = id {
            if let Some(owned_by) = state.db.owned_by_field(resource) {
                let found = state.db.resource(resource).and_then(|h| h.find_by_id(id, &[]).ok());
                if let Some(record) = found {
                    let owner_value = record.get(owned_by).cloned().unwrap_or(Value::Null);
                    let subject_id = subject.id.clone().unwrap_or(Value::Null);
                    if loose_eq(&owner_value, &subject_id) {
                        return next.run(req).await;
                    }
                }
            }
        }
    }

    pretendo_errors::AppError::forbidden("insufficient role for this action").into_response()
}
