use std::path::PathBuf;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Location, LocationId, Picture, PictureId};
use crate::error::StoreError;

/// One durable mutation of the location store. The in-memory indexes are
/// rebuilt by replaying the full operation log on startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreOperation {
    CreateLocation { location: Location },
    MergeLocation { location_id: LocationId, name: String, description: String, created_at: DateTime<Utc> },
    CreatePicture { picture: Picture },
    DeletePicture { picture_id: PictureId },
    DeleteLocation { location_id: LocationId },
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_all(&self) -> Result<Vec<StoreOperation>, StoreError>;
    async fn write(&mut self, operation: StoreOperation) -> Result<(), StoreError>;
}

/// Append-only JSON-lines operation log backed by a single file.
pub struct FileStorage {
    wal_path: PathBuf,
}

impl FileStorage {
    pub fn new(wal_path: PathBuf) -> anyhow::Result<Self> {
        if !wal_path.exists() {
            std::fs::write(&wal_path, "")?;
        }
        if !wal_path.is_file() {
            anyhow::bail!("operation log path is not a file");
        }
        Ok(Self { wal_path })
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read_all(&self) -> Result<Vec<StoreOperation>, StoreError> {
        let file_str = tokio::fs::read_to_string(&self.wal_path).await
            .map_err(StoreError::LogIo)?;
        let operations = file_str.split('\n')
            .filter(|x| !x.is_empty())
            .map(|x| serde_json::from_str(x).map_err(StoreError::LogSerialization))
            .collect::<Result<Vec<StoreOperation>, StoreError>>()?;
        Ok(operations)
    }

    async fn write(&mut self, operation: StoreOperation) -> Result<(), StoreError> {
        let serialized_operation = serde_json::to_string(&operation)
            .map_err(StoreError::LogSerialization)?;
        let line = format!("{}\n", serialized_operation);
        let mut file = tokio::fs::OpenOptions::new().append(true).open(&self.wal_path).await
            .map_err(StoreError::LogIo)?;
        tokio::io::AsyncWriteExt::write_all(&mut file, line.as_bytes()).await
            .map_err(StoreError::LogIo)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    operations: Vec<StoreOperation>,
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn read_all(&self) -> Result<Vec<StoreOperation>, StoreError> {
        Ok(self.operations.clone())
    }

    async fn write(&mut self, operation: StoreOperation) -> Result<(), StoreError> {
        self.operations.push(operation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("globepin.db.json");
        let mut storage = FileStorage::new(wal_path.clone()).unwrap();

        let location = Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now());
        let picture = Picture::new(location.id, "image.png".into(), "http://x/1.png".into(), None);
        storage.write(StoreOperation::CreateLocation { location: location.clone() }).await.unwrap();
        storage.write(StoreOperation::CreatePicture { picture: picture.clone() }).await.unwrap();

        let reopened = FileStorage::new(wal_path).unwrap();
        let operations = reopened.read_all().await.unwrap();
        assert_eq!(operations.len(), 2);
        assert!(matches!(&operations[0], StoreOperation::CreateLocation { location: l } if l == &location));
        assert!(matches!(&operations[1], StoreOperation::CreatePicture { picture: p } if p == &picture));
    }

    #[tokio::test]
    async fn test_file_storage_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("globepin.db.json");
        std::fs::write(&wal_path, "\n\n").unwrap();
        let storage = FileStorage::new(wal_path).unwrap();
        assert!(storage.read_all().await.unwrap().is_empty());
    }
}
