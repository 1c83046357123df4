use std::time::Duration;
use humanize_bytes::humanize_bytes_binary;
use thiserror::Error;

use crate::transfer::MAX_FILE_SIZE_IN_BYTES;
use crate::validate::FieldErrors;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read/write the operation log: {0}")]
    LogIo(std::io::Error),
    #[error("Failed to serialize/deserialize a stored record: {0}")]
    LogSerialization(serde_json::Error),
    #[error("Location not found")]
    LocationNotFound,
}

/// Per-file failure during media transfer. Collected by the coordinator,
/// never short-circuits the other files of the same submission.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid file type: {0}")]
    InvalidContentType(String),
    #[error("File size too large. Maximum size is {}", humanize_bytes_binary!(MAX_FILE_SIZE_IN_BYTES as u64))]
    TooLarge { size: usize },
    #[error("Transfer timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to write blob: {0}")]
    Blob(std::io::Error),
    #[error("Failed to record picture: {0}")]
    Store(#[source] StoreError),
    #[error("Transfer task failed: {0}")]
    Task(String),
}

#[derive(Debug)]
pub struct FailedTransfer {
    pub filename: String,
    pub error: TransferError,
}

/// Submission-level outcome of the ingestion coordinator.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Field-keyed validation errors, reported to the caller verbatim.
    /// No side effects were performed.
    #[error("Submission failed validation")]
    Validation(FieldErrors),
    /// Find-or-create against the store failed; aborted before any media
    /// transfer began.
    #[error("Failed to resolve location: {0}")]
    Resolution(#[source] StoreError),
    /// One or more file transfers failed. The location record and any
    /// successfully transferred pictures remain in storage.
    #[error("{failed} files failed to upload")]
    Finalization { failed: usize, failures: Vec<FailedTransfer> },
}

#[derive(Error, Debug)]
#[error("Geocoding lookup failed: {0}")]
pub struct GeocodeError(#[from] pub reqwest::Error);
