//! The shared state every handler and middleware stage closes over.

use std::sync::Arc;

use pretendo_auth::AuthService;
use pretendo_config::PretendoConfig;
use pretendo_db::Database;
use pretendo_logs::LogStore;
use tokio_util::sync::CancellationToken;

use crate::script::ScriptSandbox;

pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub logs: Arc<LogStore>,
    pub config: Arc<PretendoConfig>,
    pub sandbox: Arc<dyn ScriptSandbox>,
    /// Cancelled when the server is shutting down; lets the latency
    /// middleware's pending sleep be aborted instead of delaying shutdown.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        auth: Arc<AuthService>,
        logs: Arc<LogStore>,
        config: Arc<PretendoConfig>,
        sandbox: Arc<dyn ScriptSandbox>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            auth,
            logs,
            config,
            sandbox,
            cancel,
        })
    }
}
