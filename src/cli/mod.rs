use std::path::PathBuf;
use std::sync::Arc;
use clap::Args;
use tracing::error;

use crate::client::GlobeClient;
use crate::config::AppConfig;
use crate::error::SubmitError;
use crate::ingest::Ingestor;
use crate::repository::LocalStore;
use crate::storage::FileStorage;
use crate::transfer::{DataUrlBlobStore, FsBlobStore};
use crate::validate::{RawFile, RawSubmission};

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub latitude: String,
    #[arg(long)]
    pub longitude: String,
    /// Store into the single-file local fallback instead of the durable store
    #[arg(long)]
    pub local: bool,
    /// Image files to attach
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub async fn add(config: AppConfig, args: AddArgs) -> anyhow::Result<()> {
    let mut files = Vec::new();
    for path in &args.files {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                std::process::exit(1);
            }
        };
        let filename = path.file_name()
            .map(|x| x.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        files.push(RawFile { filename, content_type, bytes });
    }
    let raw = RawSubmission {
        name: args.name,
        description: args.description,
        latitude: args.latitude,
        longitude: args.longitude,
        files,
    };

    let result = if args.local {
        let repo = Arc::new(LocalStore::open(config.local_store_path.clone()).await?);
        let ingestor = Ingestor::new(repo, Arc::new(DataUrlBlobStore), config.transfer_timeout);
        ingestor.submit(raw).await
    } else {
        let client = GlobeClient::new(FileStorage::new(config.wal_path.clone())?);
        client.init().await?;
        let blobs = FsBlobStore::new(config.upload_dir.clone(), config.public_url_prefix.clone());
        let ingestor = Ingestor::new(Arc::new(client), Arc::new(blobs), config.transfer_timeout);
        ingestor.submit(raw).await
    };

    match result {
        Ok(receipt) => {
            if receipt.merged {
                println!("Merged into existing location: {}", receipt.location.name);
            } else {
                println!("Created location: {}", receipt.location.name);
            }
            for picture in &receipt.pictures {
                println!("  added {}", picture.name);
            }
            Ok(())
        }
        Err(SubmitError::Validation(errors)) => {
            for (field, messages) in errors.into_map() {
                for message in messages {
                    error!("{field}: {message}");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Submission failed: {e}");
            std::process::exit(1);
        }
    }
}
