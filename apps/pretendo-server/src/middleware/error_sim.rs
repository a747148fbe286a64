//! Randomly short-circuits requests with a simulated failure status when
//! `options.errorSimulation` is enabled, or when the request carries the
//! configured trigger query parameter (§4.9).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pretendo_errors::Problem;
use rand::Rng;

use crate::state::AppState;

fn triggered_status(req: &Request, trigger: &str) -> Option<u16> {
    let query = req.uri().query()?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == trigger)
        .and_then(|(_, v)| v.parse::<u16>().ok())
}

pub async fn inject(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some(sim) = &state.config.options.error_simulation else {
        return next.run(req).await;
    };
    if !sim.enabled {
        return next.run(req).await;
    }

    if let Some(status) = triggered_status(&req, &sim.query_param_trigger) {
        return simulated_response(status);
    }

    if sim.rate > 0.0 && rand::thread_rng().gen::<f64>() < sim.rate && !sim.status_codes.is_empty() {
        let idx = rand::thread_rng().gen_range(0..sim.status_codes.len());
        return simulated_response(sim.status_codes[idx]);
    }

    next.run(req).await
}

fn simulated_response(status: u16) -> Response {
    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let problem = Problem {
        type_url: "about:blank".to_string(),
        title: "Simulated Error".to_string(),
        status: status_code.as_u16(),
        message: "injected by error simulation middleware".to_string(),
        code: None,
        details: None,
    };
    (status_code, axum::Json(problem)).into_response()
}
