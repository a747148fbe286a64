//! `POST <auth.endpoint>` (default `/auth/login`) and `POST /auth/logout`
//! (§4.7). Candidates come from a configured user resource if one is named,
//! otherwise from the inline `auth.users` list.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use pretendo_auth::AuthFields;
use pretendo_config::PretendoConfig;
use pretendo_errors::AppError;
use pretendo_query::{paginate::PaginationParams, querystring::ListQuery};
use serde::Deserialize;

use crate::state::AppState;

pub fn register(config: &PretendoConfig, mut router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    let Some(auth) = &config.options.auth else {
        return router;
    };
    if !auth.enabled {
        return router;
    }
    router = router
        .route(&auth.endpoint, post(login_handler))
        .route("/auth/logout", post(logout_handler));
    router
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login_handler(State(state): State<Arc<AppState>>, Json(body): Json<LoginRequest>) -> Result<Response, AppError> {
    let auth_opts = state
        .config
        .options
        .auth
        .as_ref()
        .ok_or_else(|| AppError::internal("auth not configured"))?;

    let fields = AuthFields {
        username_field: auth_opts.username_field.clone(),
        password_field: auth_opts.password_field.clone(),
        role_field: Some("role".to_string()),
        id_field: "id".to_string(),
    };

    let candidates = match &auth_opts.user_resource {
        Some(resource_name) => {
            let handle = state
                .db
                .resource(resource_name)
                .ok_or_else(|| AppError::internal(format!("user resource {resource_name} not configured")))?;
            let query = ListQuery {
                pagination: PaginationParams { page: 1, per_page: i64::MAX },
                sort: Vec::new(),
                fields: Vec::new(),
                expand: Vec::new(),
                filters: Vec::new(),
            };
            handle.find_all(&query)?.0
        }
        None => auth_opts.users.clone(),
    };

    let (token, subject) = state.auth.authenticate(&body.username, &body.password, &candidates, &fields)?;
    let expires_at = (Utc::now() + Duration::seconds(auth_opts.token_ttl_seconds as i64)).to_rfc3339();

    Ok(Json(serde_json::json!({
        "token": token,
        "user": subject,
        "expiresAt": expires_at,
    }))
    .into_response())
}

async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let header_name = state
        .config
        .options
        .auth
        .as_ref()
        .map(|a| a.header_name.as_str())
        .unwrap_or("Authorization");

    if let Some(raw) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        state.auth.revoke(token);
    }
    StatusCode::NO_CONTENT.into_response()
}
