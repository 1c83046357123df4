use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::entities::{Location, Picture};
use crate::http::{ApiContext, ApiError, Result};
use crate::ingest::SubmissionReceipt;
use crate::reader::{self, Label};
use crate::validate::{RawFile, RawSubmission};

// multipart payload ceiling; individual files are checked against the
// 5 MiB picture limit by the pipeline itself
const MAX_REQUEST_SIZE_IN_BYTES: usize = 52_428_800; // 50 MB

pub fn router() -> Router {
    Router::new()
        .route("/api/memories", post(create_memory))
        .route("/api/labels", get(get_labels))
        .route("/api/locations/:location_id", get(get_location).delete(delete_location))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE_IN_BYTES))
}

async fn create_memory(
    ctx: Extension<ApiContext>,
    mut form: Multipart,
) -> Result<Json<SubmissionReceipt>> {
    let mut raw = RawSubmission::default();
    while let Some(field) = form.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "name" => raw.name = text_field(field).await?,
            "description" => raw.description = text_field(field).await?,
            "latitude" => raw.latitude = text_field(field).await?,
            "longitude" => raw.longitude = text_field(field).await?,
            "files" | "file" => raw.files.push(file_field(field).await?),
            _ => {}
        }
    }

    let receipt = ctx.ingestor.submit(raw).await?;
    Ok(Json(receipt))
}

async fn get_labels(ctx: Extension<ApiContext>) -> Result<Json<Vec<Label>>> {
    let labels = reader::load_labels(ctx.client.as_ref()).await?.collect();
    Ok(Json(labels))
}

#[derive(serde::Serialize)]
struct LocationResponse {
    #[serde(flatten)]
    location: Location,
    pictures: Vec<Picture>,
}

async fn get_location(
    ctx: Extension<ApiContext>,
    Path(location_id): Path<Uuid>,
) -> Result<Json<LocationResponse>> {
    let location = ctx.client.get_location(&location_id).ok_or(ApiError::NotFound)?;
    let pictures = ctx.client.pictures_of(&location_id);
    Ok(Json(LocationResponse { location, pictures }))
}

async fn delete_location(
    ctx: Extension<ApiContext>,
    Path(location_id): Path<Uuid>,
) -> Result<()> {
    ctx.client.delete_location(&location_id).await?.ok_or(ApiError::NotFound)?;
    Ok(())
}

async fn text_field(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

async fn file_field(field: Field<'_>) -> Result<RawFile> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let declared = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
    let content_type = declared.unwrap_or_else(|| {
        mime_guess::from_path(&filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    });
    Ok(RawFile { filename, content_type, bytes })
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::unprocessable_entity([("form", format!("multipart error: {e}"))])
}
