//! Injects an artificial delay per request when `options.latency` is enabled
//! (§4.9). The delay is cancellable so server shutdown never waits on it
//! (§5.5).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;

use crate::state::AppState;

pub async fn inject(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if let Some(latency) = &state.config.options.latency {
        if latency.enabled {
            let millis = match (latency.fixed, latency.min, latency.max) {
                (Some(fixed), _, _) => fixed,
                (None, Some(min), Some(max)) if max >= min => {
                    rand::thread_rng().gen_range(min..=max)
                }
                _ => 0,
            };
            if millis > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
                    _ = state.cancel.cancelled() => {}
                }
            }
        }
    }
    next.run(req).await
}
