use serde::{Deserialize, Serialize};

use crate::entities::{Location, Picture};
use crate::error::StoreError;
use crate::repository::Repository;

/// Read-side projection consumed by the rendering boundary. Rebuilt on
/// every aggregation read, never independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    pub lat: f64,
    pub lng: f64,
    pub text: String,
    pub description: String,
    pub picture: Vec<PictureView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PictureView {
    pub name: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    fn reshape(location: Location, pictures: Vec<Picture>) -> Self {
        Self {
            lat: location.latitude,
            lng: location.longitude,
            text: location.name,
            description: location.description,
            picture: pictures.into_iter()
                .map(|p| PictureView { name: p.name, data: p.url, description: p.description })
                .collect(),
        }
    }
}

/// Load every location with its pictures in one logical read and reshape
/// them into labels. The returned sequence is lazy and one-shot; callers
/// needing repeat access re-invoke, which also resolves fresh data.
pub async fn load_labels<R: Repository + ?Sized>(
    repo: &R,
) -> Result<impl Iterator<Item = Label>, StoreError> {
    let rows = repo.load_all().await?;
    Ok(rows.into_iter().map(|(location, pictures)| Label::reshape(location, pictures)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::client::GlobeClient;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn test_round_trip_location_with_two_pictures() {
        let client = GlobeClient::new(InMemoryStorage::default());
        let location = Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now());
        let location = client.resolve_location(location).await.unwrap().safe_unwrap();
        for name in ["one.png", "two.png"] {
            let picture = Picture::new(location.id, name.into(), format!("http://x/{name}"), Some("summer trip".into()));
            client.add_picture(picture).await.unwrap();
        }

        let labels: Vec<Label> = load_labels(&client).await.unwrap().collect();
        assert_eq!(labels.len(), 1);
        let label = &labels[0];
        assert_eq!(label.text, "paris");
        assert_eq!(label.lat, 48.8566);
        assert_eq!(label.lng, 2.3522);
        let names: Vec<&str> = label.picture.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["one.png", "two.png"]);
    }

    #[tokio::test]
    async fn test_labels_are_rebuilt_per_read() {
        let client = GlobeClient::new(InMemoryStorage::default());
        let location = Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now());
        let location = client.resolve_location(location).await.unwrap().safe_unwrap();

        assert_eq!(load_labels(&client).await.unwrap().count(), 1);

        let picture = Picture::new(location.id, "late.png".into(), "http://x/late.png".into(), None);
        client.add_picture(picture).await.unwrap();
        let labels: Vec<Label> = load_labels(&client).await.unwrap().collect();
        assert_eq!(labels[0].picture.len(), 1);
    }

    #[tokio::test]
    async fn test_labels_come_back_in_stable_order() {
        let client = GlobeClient::new(InMemoryStorage::default());
        let mut created = Utc::now();
        for (name, lat) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            created += chrono::Duration::seconds(1);
            let location = Location::new(name.into(), "x".into(), lat, 0.0, created);
            client.resolve_location(location).await.unwrap();
        }
        let first: Vec<String> = load_labels(&client).await.unwrap().map(|l| l.text).collect();
        let second: Vec<String> = load_labels(&client).await.unwrap().map(|l| l.text).collect();
        assert_eq!(first, ["a", "b", "c"]);
        assert_eq!(first, second);
    }
}
