use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use quiz_core::model::UserId;

use crate::repository::{SessionRecord, SessionRepository, StorageError};

/// File-backed session store: one JSON document per user under `dir`.
///
/// Writes go to a sibling `.tmp` file followed by a rename, so an
/// interrupted write leaves the previous document intact and a reader never
/// observes a half-written record.
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    dir: PathBuf,
}

impl JsonSessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("user_{user_id}.json"))
    }
}

fn io_error(err: &io::Error) -> StorageError {
    StorageError::Io(err.to_string())
}

#[async_trait]
impl SessionRepository for JsonSessionStore {
    async fn load(&self, user_id: UserId) -> Result<Option<SessionRecord>, StorageError> {
        let path = self.record_path(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&e)),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&e))?;

        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let path = self.record_path(record.user_id);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&e))?;
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.record_path(user_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&e)),
        }
    }

    async fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&e)),
        };

        let mut records: Vec<SessionRecord> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        log::warn!("skipping unreadable session record {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    log::warn!("skipping unreadable session record {}: {e}", path.display());
                }
            }
        }

        // Directory order is platform-dependent; make the snapshot deterministic.
        records.sort_by_key(|record| record.user_id);
        Ok(records)
    }
}
