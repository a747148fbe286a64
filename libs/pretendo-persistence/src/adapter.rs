//! The persistence contract every backend implements. `pretendo-db::Database`
//! holds a `Box<dyn Adapter>` and never knows which concrete backend it is
//! talking to.

use std::collections::HashMap;

use async_trait::async_trait;
use pretendo_errors::AppResult;
use pretendo_query::Record;
use serde::Serialize;

pub type Snapshot = HashMap<String, Vec<Record>>;

#[derive(Debug, Clone, Serialize)]
pub struct AdapterStats {
    pub backend: &'static str,
    pub collection_count: usize,
    pub record_count: usize,
    pub last_saved_at: Option<String>,
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Prepares the backend for use (e.g. creating the data file's parent
    /// directory). Called once at startup before `load`.
    async fn initialize(&self) -> AppResult<()>;

    /// Loads the full snapshot, or an empty one if nothing has been saved yet.
    async fn load(&self) -> AppResult<Snapshot>;

    /// Persists the full snapshot, replacing whatever was stored before.
    async fn save(&self, data: &Snapshot) -> AppResult<()>;

    /// Takes a point-in-time backup, returning an identifier the caller can
    /// pass to [`Adapter::restore`].
    async fn backup(&self, data: &Snapshot) -> AppResult<String>;

    /// Restores a previously taken backup, returning its snapshot.
    async fn restore(&self, backup_id: &str) -> AppResult<Snapshot>;

    /// Clears all persisted state.
    async fn reset(&self) -> AppResult<()>;

    async fn stats(&self, data: &Snapshot) -> AppResult<AdapterStats>;
}

pub(crate) fn stats_from(backend: &'static str, data: &Snapshot, last_saved_at: Option<String>) -> AdapterStats {
    AdapterStats {
        backend,
        collection_count: data.len(),
        record_count: data.values().map(Vec::len).sum(),
        last_saved_at,
    }
}
