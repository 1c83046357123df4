use std::ffi::OsStr;
use std::path::PathBuf;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use itertools::Itertools;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;

use crate::entities::{LocationId, Picture};
use crate::error::TransferError;
use crate::repository::Repository;
use crate::utils::hash_utils::content_hash;
use crate::validate::{is_image_type, RawFile};

pub const MAX_FILE_SIZE_IN_BYTES: usize = 5_242_880; // 5 MiB

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ').add(b'"').add(b'#').add(b'<').add(b'>').add(b'?').add(b'`').add(b'{').add(b'}');

/// Durable blob storage keyed by path: write content, get back a publicly
/// retrievable reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, TransferError>;
}

/// Blob store backed by a directory on disk; the returned reference points
/// at the HTTP file route under the configured public prefix.
pub struct FsBlobStore {
    upload_dir: PathBuf,
    public_url_prefix: String,
}

impl FsBlobStore {
    pub fn new(upload_dir: PathBuf, public_url_prefix: String) -> Self {
        let public_url_prefix = public_url_prefix.trim_end_matches('/').to_string();
        Self { upload_dir, public_url_prefix }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, TransferError> {
        let blob_path = self.upload_dir.join(key);
        if let Some(parent) = blob_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(TransferError::Blob)?;
        }
        tokio::fs::write(&blob_path, bytes).await.map_err(TransferError::Blob)?;
        let encoded_key = key.split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .join("/");
        Ok(format!("{}/files/{}", self.public_url_prefix, encoded_key))
    }
}

/// Blob store that embeds content directly in the reference as a base64
/// data URL. Used by the local fallback mode, which keeps files inside the
/// stored entries instead of a separate blob store.
pub struct DataUrlBlobStore;

#[async_trait]
impl BlobStore for DataUrlBlobStore {
    async fn put(&self, _key: &str, bytes: &[u8], content_type: &str) -> Result<String, TransferError> {
        Ok(format!("data:{};base64,{}", content_type, BASE64.encode(bytes)))
    }
}

/// Move one accepted file into blob storage and record the picture.
/// Re-validates content type and size even though the validator already
/// did, since this step can be driven independently.
pub async fn transfer<R, B>(
    repo: &R,
    blobs: &B,
    location_id: LocationId,
    file: &RawFile,
    description: &str,
) -> Result<Picture, TransferError>
where
    R: Repository + ?Sized,
    B: BlobStore + ?Sized,
{
    let content_type = effective_content_type(file)
        .ok_or_else(|| TransferError::InvalidContentType(file.content_type.clone()))?;
    if file.bytes.len() > MAX_FILE_SIZE_IN_BYTES {
        return Err(TransferError::TooLarge { size: file.bytes.len() });
    }

    let key = storage_key(location_id, file);
    let url = blobs.put(&key, &file.bytes, &content_type).await?;
    debug!("Transferred {} to {}", file.filename, key);

    let picture = Picture::new(location_id, file.filename.clone(), url, Some(description.to_string()));
    repo.add_picture(picture.clone()).await.map_err(TransferError::Store)?;
    Ok(picture)
}

/// Collision-resistant storage key scoped under the owning location:
/// `{location_id}/{content_hash}{ext}`.
fn storage_key(location_id: LocationId, file: &RawFile) -> String {
    let extension = extension_of(&file.filename).unwrap_or_default();
    format!("{}/{}{}", location_id, content_hash(&file.bytes), extension)
}

fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(|x| format!(".{x}"))
}

/// The declared content type is authoritative when present; a missing or
/// generic one falls back to a guess from the filename. Either way the
/// result must be an image type.
fn effective_content_type(file: &RawFile) -> Option<String> {
    let declared = file.content_type.trim();
    if !declared.is_empty() && declared != mime::APPLICATION_OCTET_STREAM.essence_str() {
        return is_image_type(declared).then(|| declared.to_string());
    }
    let guessed = mime_guess::from_path(&file.filename).first()?;
    (guessed.type_() == mime::IMAGE).then(|| guessed.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GlobeClient;
    use crate::entities::Location;
    use crate::storage::InMemoryStorage;
    use chrono::Utc;

    fn png(name: &str, bytes: &[u8]) -> RawFile {
        RawFile {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    async fn repo_with_location() -> (GlobeClient<InMemoryStorage>, Location) {
        let client = GlobeClient::new(InMemoryStorage::default());
        let location = Location::new("paris".into(), "summer trip".into(), 48.8566, 2.3522, Utc::now());
        let location = client.resolve_location(location).await.unwrap().safe_unwrap();
        (client, location)
    }

    #[test]
    fn test_storage_key_is_scoped_and_stable() {
        let location_id = uuid::Uuid::new_v4();
        let file = png("image.png", b"hello");
        let key = storage_key(location_id, &file);
        assert!(key.starts_with(&format!("{location_id}/")));
        assert!(key.ends_with(".png"));
        assert_eq!(key, storage_key(location_id, &file));
    }

    #[test]
    fn test_effective_content_type() {
        assert_eq!(effective_content_type(&png("a.png", b"x")).unwrap(), "image/png");
        let declared_wins = RawFile {
            filename: "a.png".to_string(),
            content_type: "video/mp4".to_string(),
            bytes: vec![],
        };
        assert!(effective_content_type(&declared_wins).is_none());
        let guessed = RawFile {
            filename: "a.jpg".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: vec![],
        };
        assert_eq!(effective_content_type(&guessed).unwrap(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_transfer_records_picture() {
        let (repo, location) = repo_with_location().await;
        let picture = transfer(&repo, &DataUrlBlobStore, location.id, &png("image.png", b"hello"), "summer trip")
            .await
            .unwrap();
        assert_eq!(picture.name, "image.png");
        assert!(picture.url.starts_with("data:image/png;base64,"));
        assert_eq!(picture.description.as_deref(), Some("summer trip"));
        assert_eq!(repo.pictures_of(&location.id), vec![picture]);
    }

    #[tokio::test]
    async fn test_transfer_rejects_invalid_type() {
        let (repo, location) = repo_with_location().await;
        let file = RawFile {
            filename: "movie.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            bytes: vec![0u8; 4],
        };
        let err = transfer(&repo, &DataUrlBlobStore, location.id, &file, "x").await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidContentType(ty) if ty == "video/mp4"));
        assert!(repo.pictures_of(&location.id).is_empty());
    }

    #[tokio::test]
    async fn test_transfer_rejects_oversized_file() {
        let (repo, location) = repo_with_location().await;
        let file = png("big.png", &vec![0u8; MAX_FILE_SIZE_IN_BYTES + 1]);
        let err = transfer(&repo, &DataUrlBlobStore, location.id, &file, "x").await.unwrap_err();
        assert!(matches!(err, TransferError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_fs_blob_store_writes_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path().to_path_buf(), "http://localhost:3000/".to_string());
        let location_id = uuid::Uuid::new_v4();
        let key = format!("{location_id}/abc123.png");

        let url = blobs.put(&key, b"hello", "image/png").await.unwrap();
        assert_eq!(url, format!("http://localhost:3000/files/{key}"));
        let stored = std::fs::read(dir.path().join(&key)).unwrap();
        assert_eq!(stored, b"hello");
    }
}
