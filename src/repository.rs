use std::path::PathBuf;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::client::GlobeClient;
use crate::entities::{InsertResult, Location, LocationId, Picture};
use crate::error::StoreError;
use crate::storage::Storage;

/// Store operations the ingestion coordinator needs. The same coordinator
/// logic targets the durable store or the local fallback through this seam,
/// without branching.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Atomic find-or-create keyed by the coordinate pair.
    async fn find_or_create(&self, location: Location) -> Result<InsertResult<Location>, StoreError>;
    /// Overwrite name, description and timestamp of an existing location.
    async fn merge_details(
        &self,
        location_id: &LocationId,
        name: &str,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
    async fn add_picture(&self, picture: Picture) -> Result<(), StoreError>;
    /// Every location with its pictures, in one logical read.
    async fn load_all(&self) -> Result<Vec<(Location, Vec<Picture>)>, StoreError>;
}

#[async_trait]
impl<S: Storage> Repository for GlobeClient<S> {
    async fn find_or_create(&self, location: Location) -> Result<InsertResult<Location>, StoreError> {
        self.resolve_location(location).await
    }

    async fn merge_details(
        &self,
        location_id: &LocationId,
        name: &str,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.merge_location(location_id, name, description, created_at).await
    }

    async fn add_picture(&self, picture: Picture) -> Result<(), StoreError> {
        GlobeClient::add_picture(self, picture).await
    }

    async fn load_all(&self) -> Result<Vec<(Location, Vec<Picture>)>, StoreError> {
        Ok(self.snapshot())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    location: Location,
    pictures: Vec<Picture>,
}

/// Fallback persistence used when no durable store is configured: the whole
/// collection lives as one JSON array in a single file, rewritten on every
/// mutation. Mirrors the browser-local storage mode of the original client.
pub struct LocalStore {
    path: PathBuf,
    entries: Mutex<Vec<StoredEntry>>,
}

impl LocalStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Vec<StoredEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unreadable local store {}: {}", path.display(), e);
                    vec![]
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![],
            Err(e) => return Err(StoreError::LogIo(e)),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    async fn persist(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(entries).map_err(StoreError::LogSerialization)?;
        tokio::fs::write(&self.path, serialized).await.map_err(StoreError::LogIo)
    }
}

#[async_trait]
impl Repository for LocalStore {
    async fn find_or_create(&self, location: Location) -> Result<InsertResult<Location>, StoreError> {
        let mut entries = self.entries.lock().await;
        let key = location.coord_key();
        if let Some(entry) = entries.iter().find(|e| e.location.coord_key() == key) {
            return Ok(InsertResult::Existing(entry.location.clone()));
        }
        entries.push(StoredEntry { location: location.clone(), pictures: vec![] });
        self.persist(&entries).await?;
        Ok(InsertResult::New(location))
    }

    async fn merge_details(
        &self,
        location_id: &LocationId,
        name: &str,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.iter_mut().find(|e| e.location.id == *location_id) else {
            return Ok(false);
        };
        entry.location.name = name.to_string();
        entry.location.description = description.to_string();
        entry.location.created_at = created_at;
        self.persist(&entries).await?;
        Ok(true)
    }

    async fn add_picture(&self, picture: Picture) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.iter_mut().find(|e| e.location.id == picture.location_id) else {
            return Err(StoreError::LocationNotFound);
        };
        entry.pictures.push(picture);
        self.persist(&entries).await
    }

    async fn load_all(&self) -> Result<Vec<(Location, Vec<Picture>)>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().map(|e| (e.location.clone(), e.pictures.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> Location {
        Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now())
    }

    #[tokio::test]
    async fn test_local_store_find_or_create_dedups_by_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("submissions.json")).await.unwrap();

        let first = store.find_or_create(paris()).await.unwrap();
        assert!(first.is_new());
        let second = store.find_or_create(paris()).await.unwrap();
        assert!(!second.is_new());
        assert_eq!(second.safe_unwrap().id, first.safe_unwrap().id);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.json");

        let location = {
            let store = LocalStore::open(path.clone()).await.unwrap();
            let location = store.find_or_create(paris()).await.unwrap().safe_unwrap();
            let picture = Picture::new(location.id, "a.png".into(), "data:image/png;base64,AA==".into(), None);
            store.add_picture(picture).await.unwrap();
            location
        };

        let reopened = LocalStore::open(path).await.unwrap();
        let rows = reopened.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.id, location.id);
        assert_eq!(rows[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_local_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = LocalStore::open(path).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
