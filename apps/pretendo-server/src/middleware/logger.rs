//! Records one [`pretendo_logs::LogEntry`] per completed response (§4.9),
//! capturing the full latency of everything beneath this layer (cors, body
//! limit, latency injection, error simulation, auth, rbac, and the handler).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use pretendo_logs::LogEntry;

use crate::state::AppState;

pub async fn record(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if !state.config.options.log_requests {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let user_agent = req
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let entry = LogEntry::new(method, url, response.status().as_u16(), elapsed_ms)
        .with_user_agent(user_agent)
        .with_ip(ip);
    state.logs.record(entry);

    response
}
