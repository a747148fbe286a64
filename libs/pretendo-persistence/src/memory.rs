//! The no-op backend: nothing survives a restart. `load` always returns
//! empty, so the database falls back to its configured seed data.

use async_trait::async_trait;
use parking_lot::RwLock;
use pretendo_errors::{AppError, AppResult};

use crate::adapter::{stats_from, Adapter, AdapterStats, Snapshot};

#[derive(Default)]
pub struct MemoryAdapter {
    last_backup: RwLock<Option<Snapshot>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn initialize(&self) -> AppResult<()> {
        Ok(())
    }

    async fn load(&self) -> AppResult<Snapshot> {
        Ok(Snapshot::new())
    }

    async fn save(&self, _data: &Snapshot) -> AppResult<()> {
        Ok(())
    }

    async fn backup(&self, data: &Snapshot) -> AppResult<String> {
        *self.last_backup.write() = Some(data.clone());
        Ok("memory".to_string())
    }

    async fn restore(&self, backup_id: &str) -> AppResult<Snapshot> {
        if backup_id != "memory" {
            return Err(AppError::not_found(format!("no such backup: {backup_id}")));
        }
        self.last_backup
            .read()
            .clone()
            .ok_or_else(|| AppError::not_found("no backup has been taken yet"))
    }

    async fn reset(&self) -> AppResult<()> {
        *self.last_backup.write() = None;
        Ok(())
    }

    async fn stats(&self, data: &Snapshot) -> AppResult<AdapterStats> {
        Ok(stats_from("memory", data, None))
    }
}
