use axum::extract::{Extension, Query};
use axum::routing::get;
use axum::{Json, Router};

use crate::geocode::PlaceSuggestion;
use crate::http::{ApiContext, Result};

pub fn router() -> Router {
    Router::new().route("/api/geocode", get(search_places))
}

#[derive(serde::Deserialize, Debug, Default)]
struct GeocodeParams {
    q: String,
}

async fn search_places(
    ctx: Extension<ApiContext>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<Vec<PlaceSuggestion>>> {
    let suggestions = ctx.geocoder.search(&params.q).await?;
    Ok(Json(suggestions))
}
