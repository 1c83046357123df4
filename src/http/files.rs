use axum::body::Body;
use axum::extract::{Extension, Path};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::http::{ApiContext, ApiError, Result};

pub fn router() -> Router {
    Router::new().route("/files/:location_id/:filename", get(get_blob))
}

/// Serve one stored blob from the upload directory. Keys are generated by
/// the pipeline, so anything that does not look like one is a 404.
async fn get_blob(
    ctx: Extension<ApiContext>,
    Path((location_id, filename)): Path<(Uuid, String)>,
) -> Result<Response> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::NotFound);
    }
    let blob_path = ctx.cfg.upload_dir.join(location_id.to_string()).join(&filename);
    let file = match tokio::fs::File::open(&blob_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(ApiError::Anyhow(e.into())),
    };
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(file));
    let response = Response::builder()
        .header(CONTENT_TYPE, content_type.essence_str())
        .body(body)
        .map_err(|e| ApiError::Anyhow(e.into()))?;
    Ok(response)
}
