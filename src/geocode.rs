use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeocodeError;

pub const MIN_QUERY_LEN: usize = 3;
pub const MAX_SUGGESTIONS: usize = 5;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// One place candidate as returned by the lookup service. Coordinates stay
/// strings; they enter the submission form as-is and only the validator
/// parses them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceSuggestion {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}

/// Free-text place lookup against a Nominatim-compatible endpoint.
pub struct GeocodeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeocodeClient {
    pub fn new(endpoint: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("globepin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint: endpoint.trim_end_matches('/').to_string() })
    }

    /// Queries shorter than [`MIN_QUERY_LEN`] characters return no
    /// candidates without touching the network.
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceSuggestion>, GeocodeError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(vec![]);
        }
        let url = format!(
            "{}/search?format=json&q={}&addressdetails=1&limit={}",
            self.endpoint,
            urlencoding::encode(query),
            MAX_SUGGESTIONS,
        );
        debug!("Geocoding lookup: {url}");
        let mut suggestions: Vec<PlaceSuggestion> = self.http
            .get(&url)
            .header("Accept-Language", "en")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        suggestions.truncate(MAX_SUGGESTIONS);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_deserialize_from_nominatim_payload() {
        // response carries many more fields than the interface needs
        let payload = r#"[
            {"place_id": 88936, "licence": "ODbL", "osm_type": "relation",
             "display_name": "Paris, Île-de-France, Metropolitan France, France",
             "lat": "48.8588897", "lon": "2.3200410217200766", "importance": 0.88},
            {"place_id": 127945, "display_name": "Paris, Lamar County, Texas, United States",
             "lat": "33.6617962", "lon": "-95.555513"}
        ]"#;
        let suggestions: Vec<PlaceSuggestion> = serde_json::from_str(payload).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].lat, "48.8588897");
        assert!(suggestions[1].display_name.contains("Texas"));
    }

    #[tokio::test]
    async fn test_short_query_skips_lookup() {
        // endpoint is unreachable on purpose; the guard returns first
        let client = GeocodeClient::new("http://127.0.0.1:1".to_string()).unwrap();
        assert!(client.search("pa").await.unwrap().is_empty());
        assert!(client.search("  p ").await.unwrap().is_empty());
    }
}
