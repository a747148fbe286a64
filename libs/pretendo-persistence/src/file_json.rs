//! JSON-file-backed persistence: atomic writes (temp file + fsync + rename),
//! timestamped backups, and an optional autosave timer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use pretendo_errors::{AppError, AppResult};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::adapter::{stats_from, Adapter, AdapterStats, Snapshot};

pub struct FileJsonAdapter {
    path: PathBuf,
}

impl FileJsonAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn backup_path(&self, timestamp: &str) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{timestamp}.backup"));
        PathBuf::from(name)
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::io(format!("failed to create {}: {e}", parent.display())))?;
            }
        }
        let tmp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| AppError::io(format!("failed to create temp file: {e}")))?;
        file.write_all(contents)
            .await
            .map_err(|e| AppError::io(format!("failed to write temp file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::io(format!("failed to fsync temp file: {e}")))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| AppError::io(format!("failed to rename temp file into place: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for FileJsonAdapter {
    async fn initialize(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::io(format!("failed to create {}: {e}", parent.display())))?;
            }
        }
        Ok(())
    }

    async fn load(&self) -> AppResult<Snapshot> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::io(format!("failed to parse {}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Snapshot::new();
                self.save(&empty).await?;
                Ok(empty)
            }
            Err(e) => Err(AppError::io(format!("failed to read {}: {e}", self.path.display()))),
        }
    }

    async fn save(&self, data: &Snapshot) -> AppResult<()> {
        let contents = serde_json::to_vec_pretty(data)
            .map_err(|e| AppError::io(format!("failed to serialize snapshot: {e}")))?;
        Self::write_atomic(&self.path, &contents).await
    }

    async fn backup(&self, data: &Snapshot) -> AppResult<String> {
        let timestamp = Utc::now().to_rfc3339().replace([':', '.'], "-");
        let backup_path = self.backup_path(&timestamp);
        let contents = serde_json::to_vec_pretty(data)
            .map_err(|e| AppError::io(format!("failed to serialize snapshot: {e}")))?;
        Self::write_atomic(&backup_path, &contents).await?;
        Ok(backup_path.to_string_lossy().into_owned())
    }

    async fn restore(&self, backup_id: &str) -> AppResult<Snapshot> {
        let bytes = fs::read(backup_id)
            .await
            .map_err(|e| AppError::not_found(format!("backup {backup_id} not readable: {e}")))?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::io(format!("failed to parse backup {backup_id}: {e}")))?;
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    async fn reset(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::io(format!("failed to remove {}: {e}", self.path.display()))),
        }
    }

    async fn stats(&self, data: &Snapshot) -> AppResult<AdapterStats> {
        let last_saved_at = fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::<Utc>::from)
            .map(|t| t.to_rfc3339());
        Ok(stats_from("file", data, last_saved_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretendo_query::Record;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        let mut record = Record::new();
        record.insert("id".into(), json!(1));
        record.insert("name".into(), json!("widget"));
        snapshot.insert("widgets".into(), vec![record]);
        snapshot
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let adapter = FileJsonAdapter::new(dir.path().join("db.json"));
        let snapshot = sample_snapshot();
        adapter.save(&snapshot).await.unwrap();
        let loaded = adapter.load().await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let adapter = FileJsonAdapter::new(dir.path().join("missing.json"));
        assert!(adapter.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_missing_file_creates_an_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let adapter = FileJsonAdapter::new(&path);
        assert!(!path.exists());
        adapter.load().await.unwrap();
        assert!(path.exists());
        let loaded = adapter.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn backup_and_restore_round_trips() {
        let dir = tempdir().unwrap();
        let adapter = FileJsonAdapter::new(dir.path().join("db.json"));
        let snapshot = sample_snapshot();
        adapter.save(&snapshot).await.unwrap();

        let backup_id = adapter.backup(&snapshot).await.unwrap();
        assert!(backup_id.contains(".backup"));

        adapter.reset().await.unwrap();
        assert!(adapter.load().await.unwrap().is_empty());

        let restored = adapter.restore(&backup_id).await.unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(adapter.load().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn reset_removes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let adapter = FileJsonAdapter::new(&path);
        adapter.save(&sample_snapshot()).await.unwrap();
        assert!(path.exists());
        adapter.reset().await.unwrap();
        assert!(!path.exists());
    }
}
