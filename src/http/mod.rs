use std::sync::Arc;
use anyhow::Context;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
pub use error::ApiError;

use crate::client::GlobeClient;
use crate::config::AppConfig;
use crate::geocode::GeocodeClient;
use crate::ingest::Ingestor;
use crate::storage::FileStorage;
use crate::transfer::FsBlobStore;

mod error;
mod files;
mod geocode;
mod memories;
mod ping;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct ApiContext {
    cfg: Arc<AppConfig>,
    client: Arc<GlobeClient<FileStorage>>,
    ingestor: Arc<Ingestor<GlobeClient<FileStorage>, FsBlobStore>>,
    geocoder: Arc<GeocodeClient>,
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let client = Arc::new(GlobeClient::new(FileStorage::new(config.wal_path.clone())?));
    client.init().await?;
    info!("Location count: {}", client.location_count());

    let blobs = Arc::new(FsBlobStore::new(config.upload_dir.clone(), config.public_url_prefix.clone()));
    let ingestor = Arc::new(Ingestor::new(Arc::clone(&client), blobs, config.transfer_timeout));
    let geocoder = Arc::new(GeocodeClient::new(config.geocode_endpoint.clone())?);
    let bind_addr = config.bind_addr.clone();
    let ctx = ApiContext {
        cfg: Arc::new(config),
        client,
        ingestor,
        geocoder,
    };

    let app = api_router()
        .layer(CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any))
        .layer(ServiceBuilder::new().layer(Extension(ctx)).layer(TraceLayer::new_for_http()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    info!("listening on {}", &bind_addr);
    axum::serve(listener, app).await.context("error running HTTP server")
}

fn api_router() -> Router {
    ping::router()
        .merge(memories::router())
        .merge(geocode::router())
        .merge(files::router())
}
