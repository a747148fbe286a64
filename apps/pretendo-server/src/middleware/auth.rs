//! Extracts and verifies the bearer token, attaching the resolved [`Subject`]
//! to request extensions for RBAC and the handlers downstream. Does not
//! reject unauthenticated requests itself — that decision belongs to RBAC
//! (§4.8), which knows whether the target route actually requires a role.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use pretendo_auth::Subject;

use crate::state::AppState;

pub async fn resolve_subject(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let header_name = state
        .config
        .options
        .auth
        .as_ref()
        .map(|a| a.header_name.as_str())
        .unwrap_or("Authorization");

    let subject: Option<Subject> = req
        .headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw).trim().to_string())
        .filter(|token| !token.is_empty())
        .and_then(|token| state.auth.verify(&token));

    req.extensions_mut().insert(subject);
    next.run(req).await
}
