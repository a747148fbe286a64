//! Process-wide bind/listen/stop lifecycle (§4.12), mirroring the teacher's
//! module-runtime `serve()` pattern: bind, spawn the accept loop, and drive
//! graceful shutdown off a `CancellationToken` rather than a bespoke signal
//! type.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::middleware;
use crate::request_id;
use crate::routes;
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct ServerHandle {
    local_addr: SocketAddr,
    join: JoinHandle<Result<()>>,
    cancel: CancellationToken,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Cancels the graceful-shutdown signal and waits for the accept loop to
    /// drain, bounded by [`SHUTDOWN_GRACE`] (§5.5).
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        tokio::time::timeout(SHUTDOWN_GRACE, self.join)
            .await
            .map_err(|_| anyhow::anyhow!("server did not shut down within the grace period"))??;
        Ok(())
    }
}

/// Assembles the full router: route tables first, then the middleware stack
/// layered innermost (closest to the handler) to outermost, so the resulting
/// per-request order reads request-id -> logger -> cors -> latency ->
/// error-simulation -> auth -> rbac -> handler, as specified in §4.9.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router: Router<Arc<AppState>> = Router::new()
        .route("/", get(routes::root::root_handler))
        .route("/__docs", get(routes::docs::docs_handler));

    router = routes::admin::register(router);
    router = routes::auth::register(&state.config, router);
    router = routes::resource::register(&state.config, router);
    router = routes::relation::register(&state.config, router);
    router = routes::custom::register(&state.config, router);

    router = router
        .layer(from_fn_with_state(state.clone(), middleware::rbac::enforce))
        .layer(from_fn_with_state(state.clone(), middleware::auth::resolve_subject))
        .layer(from_fn_with_state(state.clone(), middleware::error_sim::inject))
        .layer(from_fn_with_state(state.clone(), middleware::latency::inject));

    if state.config.options.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router = router
        .layer(from_fn_with_state(state.clone(), middleware::logger::record))
        .layer(from_fn(middleware::powered_by::stamp))
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(request_id::trace_layer());

    router.with_state(state)
}

/// Binds `host:port` and starts serving in the background. Binding is itself
/// the readiness point: by the time this returns, the listener is live and
/// `ServerHandle::url()` reflects the actual bound address (useful when
/// `port: 0` asks the OS to pick one).
pub async fn start(state: Arc<AppState>) -> Result<ServerHandle> {
    let host = state.config.options.host.clone();
    let port = state.config.options.port;
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {host}:{port}: {e}"))?;
    let local_addr = listener.local_addr()?;

    let cancel_for_task = state.cancel.clone();
    let cancel_for_handle = state.cancel.clone();
    let router = build_router(state);

    let join = tokio::spawn(async move {
        let shutdown = async move { cancel_for_task.cancelled().await };
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    });

    Ok(ServerHandle {
        local_addr,
        join,
        cancel: cancel_for_handle,
    })
}
