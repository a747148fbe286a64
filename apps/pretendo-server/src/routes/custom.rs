//! Operator-defined routes (§4.11): either a `json` template whose `{name}`/
//! `{:name}` placeholders are substituted from the path params, or a `script`
//! handed to the configured [`crate::script::ScriptSandbox`].
//!
//! These paths sit outside the configured-resource set, so the global RBAC
//! layer lets them straight through (see `middleware::rbac::is_admin_or_auth_path`'s
//! sibling check, `resource_exists`); auth is instead enforced here, per the
//! route's own `auth` block.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put, MethodRouter};
use axum::{Extension, Json, Router};
use pretendo_auth::Subject;
use pretendo_config::{CustomRoute, CustomRouteKind, PretendoConfig, RouteAuth};
use pretendo_errors::AppError;
use pretendo_store::special_fields::SpecialFieldContext;
use serde_json::Value;

use crate::script::{DatabaseScriptDb, ScriptDb, ScriptRequest};
use crate::state::AppState;

pub fn register(config: &PretendoConfig, mut router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    for route in &config.routes {
        router = router.route(&route.path, method_router(route.clone()));
    }
    router
}

fn method_router(route: CustomRoute) -> MethodRouter<Arc<AppState>> {
    let method_upper = route.method.to_ascii_uppercase();

    let handler = move |state: State<Arc<AppState>>,
                         subject: Extension<Option<Subject>>,
                         method: Method,
                         uri: Uri,
                         Path(params): Path<HashMap<String, String>>,
                         Query(query): Query<HashMap<String, String>>,
                         body: Bytes| {
        let route = route.clone();
        async move { execute(route, state.0, subject.0, method, uri, params, query, body).await }
    };

    match method_upper.as_str() {
        "GET" => get(handler),
        "POST" => post(handler),
        "PUT" => put(handler),
        "PATCH" => patch(handler),
        "DELETE" => delete(handler),
        _ => get(handler),
    }
}

fn enforce_route_auth(auth: &Option<RouteAuth>, subject: &Option<Subject>) -> Result<(), AppError> {
    let Some(auth) = auth else {
        return Ok(());
    };
    if !auth.enabled {
        return Ok(());
    }
    let Some(subject) = subject else {
        return Err(AppError::unauthorized("authentication required"));
    };
    if auth.roles.is_empty() || auth.roles.iter().any(|r| r == "*") {
        return Ok(());
    }
    match &subject.role {
        Some(role) if auth.roles.iter().any(|r| r == role) => Ok(()),
        _ => Err(AppError::forbidden("insufficient role for this route")),
    }
}

fn placeholder_name(s: &str) -> Option<&str> {
    s.strip_prefix("{:")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| s.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')))
}

fn substitute(value: &Value, params: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => match placeholder_name(s).and_then(|name| params.get(name)) {
            Some(v) => Value::String(v.clone()),
            None => Value::String(s.clone()),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, params)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), substitute(v, params))).collect()),
        other => other.clone(),
    }
}

async fn execute(
    route: CustomRoute,
    state: Arc<AppState>,
    subject: Option<Subject>,
    method: Method,
    uri: Uri,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<Response, AppError> {
    enforce_route_auth(&route.auth, &subject)?;

    match route.kind {
        CustomRouteKind::Json { response } => {
            let substituted = substitute(&response, &params);
            Ok(Json(substituted).into_response())
        }
        CustomRouteKind::Script { script } => {
            let ctx = SpecialFieldContext {
                user_id: subject.and_then(|s| s.id),
            };
            let db: Arc<dyn ScriptDb> = Arc::new(DatabaseScriptDb::new(state.db.clone(), ctx));
            let body_value: Value = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap_or(Value::Null)
            };
            let request = ScriptRequest {
                method: method.to_string(),
                path: uri.path().to_string(),
                params,
                query,
                body: body_value,
            };
            let response = state.sandbox.execute(&script, request, db)?;
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            Ok((status, Json(response.body)).into_response())
        }
    }
}
