use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type LocationId = Uuid;
pub type PictureId = Uuid;

pub enum InsertResult<T> {
    Existing(T),
    New(T),
}

impl<T> InsertResult<T> {
    pub fn safe_unwrap(self) -> T {
        match self {
            InsertResult::Existing(x) => x,
            InsertResult::New(x) => x,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertResult::New(_))
    }
}

/// A persisted place record. At most one exists per distinct coordinate
/// pair; the coordinate pair is the natural key, independent of the id.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(name: String, description: String, latitude: f64, longitude: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            latitude,
            longitude,
            created_at,
        }
    }

    pub fn coord_key(&self) -> CoordKey {
        CoordKey::new(self.latitude, self.longitude)
    }
}

/// A persisted media record linked to exactly one [`Location`]. Created by
/// media transfer, never mutated afterwards.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Picture {
    pub id: PictureId,
    pub location_id: LocationId,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Picture {
    pub fn new(location_id: LocationId, name: String, url: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id,
            name,
            url,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Exact-match key over a validated coordinate pair. Compares bit patterns,
/// with -0.0 and 0.0 collapsed to the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat: u64,
    lng: u64,
}

impl CoordKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            lat: canonical_bits(latitude),
            lng: canonical_bits(longitude),
        }
    }
}

impl std::fmt::Display for CoordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", f64::from_bits(self.lat), f64::from_bits(self.lng))
    }
}

fn canonical_bits(value: f64) -> u64 {
    // -0.0 == 0.0 but their bit patterns differ
    if value == 0.0 {
        0f64.to_bits()
    } else {
        value.to_bits()
    }
}
