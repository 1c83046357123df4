use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use itertools::Itertools;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::entities::{CoordKey, InsertResult, Location, LocationId, Picture, PictureId};
use crate::error::StoreError;
use crate::storage::{Storage, StoreOperation};

/// In-memory view of the location store, made durable by appending every
/// mutation to the injected operation log and replaying it on startup.
///
/// The coordinate index is the dedup invariant: at most one location per
/// coordinate pair, enforced by an atomic find-or-create on the index entry.
pub struct GlobeClient<S: Storage> {
    storage: Mutex<S>,
    locations: DashMap<LocationId, Location>,
    coords: DashMap<CoordKey, LocationId>,
    pictures: DashMap<PictureId, Picture>,
    gallery: DashMap<LocationId, Vec<PictureId>>,
}

impl<S: Storage> GlobeClient<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
            locations: DashMap::new(),
            coords: DashMap::new(),
            pictures: DashMap::new(),
            gallery: DashMap::new(),
        }
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        info!("Starting store import from the operation log...");
        let operations = self.storage.lock().await.read_all().await?;
        for operation in operations {
            match operation {
                StoreOperation::CreateLocation { location } => { self.create_location_no_wal(location); }
                StoreOperation::MergeLocation { location_id, name, description, created_at } => {
                    self.merge_location_no_wal(&location_id, &name, &description, created_at);
                }
                StoreOperation::CreatePicture { picture } => { self.create_picture_no_wal(picture); }
                StoreOperation::DeletePicture { picture_id } => { self.delete_picture_no_wal(&picture_id); }
                StoreOperation::DeleteLocation { location_id } => { self.delete_location_no_wal(&location_id); }
            }
        }
        info!("Store imported: {} locations, {} pictures", self.locations.len(), self.pictures.len());
        Ok(())
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn get_location(&self, location_id: &LocationId) -> Option<Location> {
        self.locations.get(location_id).map(|x| x.value().clone())
    }

    pub fn find_location_by_coords(&self, key: &CoordKey) -> Option<Location> {
        let location_id = self.coords.get(key).map(|x| *x.value())?;
        self.get_location(&location_id)
    }

    /// Pictures of one location, in storage insertion order.
    pub fn pictures_of(&self, location_id: &LocationId) -> Vec<Picture> {
        let Some(picture_ids) = self.gallery.get(location_id).map(|x| x.value().clone()) else {
            return vec![];
        };
        picture_ids.iter()
            .filter_map(|id| self.pictures.get(id).map(|x| x.value().clone()))
            .collect()
    }

    /// One logical read of every location with its pictures, in a stable
    /// order (creation time, then id) so repeated reads over unchanged data
    /// agree.
    pub fn snapshot(&self) -> Vec<(Location, Vec<Picture>)> {
        self.locations.iter()
            .map(|x| x.value().clone())
            .sorted_by_key(|location| (location.created_at, location.id))
            .map(|location| {
                let pictures = self.pictures_of(&location.id);
                (location, pictures)
            })
            .collect()
    }

    /// Atomic find-or-create keyed by the coordinate pair. An existing
    /// location is returned unchanged; overwrite semantics belong to the
    /// ingestion coordinator, not the resolver.
    pub async fn resolve_location(&self, location: Location) -> Result<InsertResult<Location>, StoreError> {
        let result = self.create_location_no_wal(location);
        if let InsertResult::New(location) = &result {
            self.write_wal(StoreOperation::CreateLocation { location: location.clone() }).await?;
        }
        Ok(result)
    }

    /// Overwrite name, description and timestamp of an existing location.
    pub async fn merge_location(
        &self,
        location_id: &LocationId,
        name: &str,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let merged = self.merge_location_no_wal(location_id, name, description, created_at);
        if merged {
            self.write_wal(StoreOperation::MergeLocation {
                location_id: *location_id,
                name: name.to_string(),
                description: description.to_string(),
                created_at,
            }).await?;
        }
        Ok(merged)
    }

    pub async fn add_picture(&self, picture: Picture) -> Result<(), StoreError> {
        if !self.create_picture_no_wal(picture.clone()) {
            return Err(StoreError::LocationNotFound);
        }
        self.write_wal(StoreOperation::CreatePicture { picture }).await?;
        Ok(())
    }

    /// Delete a location together with its pictures. Pictures are removed
    /// first so a location can never leave orphaned media behind.
    pub async fn delete_location(&self, location_id: &LocationId) -> Result<Option<Location>, StoreError> {
        for picture in self.pictures_of(location_id) {
            self.delete_picture_no_wal(&picture.id);
            self.write_wal(StoreOperation::DeletePicture { picture_id: picture.id }).await?;
        }
        let maybe_location = self.delete_location_no_wal(location_id);
        if maybe_location.is_some() {
            self.write_wal(StoreOperation::DeleteLocation { location_id: *location_id }).await?;
        }
        Ok(maybe_location)
    }

    fn create_location_no_wal(&self, location: Location) -> InsertResult<Location> {
        match self.coords.entry(location.coord_key()) {
            Entry::Occupied(existing) => {
                let existing_id = *existing.get();
                // the index entry always points at a live location
                let existing_location = self.locations.get(&existing_id).map(|x| x.value().clone());
                match existing_location {
                    Some(existing_location) => InsertResult::Existing(existing_location),
                    None => InsertResult::Existing(location),
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(location.id);
                self.locations.insert(location.id, location.clone());
                self.gallery.insert(location.id, vec![]);
                InsertResult::New(location)
            }
        }
    }

    fn merge_location_no_wal(&self, location_id: &LocationId, name: &str, description: &str, created_at: DateTime<Utc>) -> bool {
        let Some(mut entry) = self.locations.get_mut(location_id) else {
            return false;
        };
        let location = entry.value_mut();
        location.name = name.to_string();
        location.description = description.to_string();
        location.created_at = created_at;
        true
    }

    fn create_picture_no_wal(&self, picture: Picture) -> bool {
        let Some(mut gallery) = self.gallery.get_mut(&picture.location_id) else {
            return false;
        };
        gallery.value_mut().push(picture.id);
        drop(gallery);
        self.pictures.insert(picture.id, picture);
        true
    }

    fn delete_picture_no_wal(&self, picture_id: &PictureId) -> Option<Picture> {
        let (_, picture) = self.pictures.remove(picture_id)?;
        if let Some(mut gallery) = self.gallery.get_mut(&picture.location_id) {
            gallery.value_mut().retain(|id| id != picture_id);
        }
        Some(picture)
    }

    fn delete_location_no_wal(&self, location_id: &LocationId) -> Option<Location> {
        let (_, location) = self.locations.remove(location_id)?;
        self.coords.remove(&location.coord_key());
        self.gallery.remove(location_id);
        Some(location)
    }

    async fn write_wal(&self, operation: StoreOperation) -> Result<(), StoreError> {
        debug!("Writing to the operation log: {:?}", operation);
        self.storage.lock().await.write(operation).await
    }
}
