use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::entities::{Location, Picture};
use crate::error::{FailedTransfer, SubmitError, TransferError};
use crate::repository::Repository;
use crate::transfer::{transfer, BlobStore};
use crate::validate::{validate, NormalizedSubmission, RawSubmission};

pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of one submission. Terminal states are per-submission; the
/// caller starts over from `Idle` for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Resolving,
    TransferringMedia,
    Finalizing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::Validating => "validating",
            SubmissionPhase::Resolving => "resolving",
            SubmissionPhase::TransferringMedia => "transferring-media",
            SubmissionPhase::Finalizing => "finalizing",
            SubmissionPhase::Succeeded => "succeeded",
            SubmissionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionReceipt {
    pub location: Location,
    pub pictures: Vec<Picture>,
    /// True when the submission landed on an already existing location.
    pub merged: bool,
}

/// Orchestrates one submission: validate, resolve the location, fan out the
/// file transfers, fan in and finalize.
///
/// Merge policy: the latest submission wins. When the resolver returns an
/// existing location, its name, description and timestamp are overwritten
/// with the new submission's values; pictures are appended, never replaced.
pub struct Ingestor<R, B> {
    repo: Arc<R>,
    blobs: Arc<B>,
    transfer_timeout: Duration,
}

impl<R, B> Ingestor<R, B>
where
    R: Repository + 'static,
    B: BlobStore + 'static,
{
    pub fn new(repo: Arc<R>, blobs: Arc<B>, transfer_timeout: Duration) -> Self {
        Self { repo, blobs, transfer_timeout }
    }

    pub async fn submit(&self, raw: RawSubmission) -> Result<SubmissionReceipt, SubmitError> {
        let mut phase = SubmissionPhase::Idle;

        advance(&mut phase, SubmissionPhase::Validating);
        let normalized = match validate(&raw) {
            Ok(normalized) => normalized,
            Err(field_errors) => {
                advance(&mut phase, SubmissionPhase::Failed);
                return Err(SubmitError::Validation(field_errors));
            }
        };

        advance(&mut phase, SubmissionPhase::Resolving);
        let NormalizedSubmission { name, description, latitude, longitude, files } = normalized;
        let submitted_at = Utc::now();
        let candidate = Location::new(name.clone(), description.clone(), latitude, longitude, submitted_at);
        let resolved = match self.repo.find_or_create(candidate).await {
            Ok(resolved) => resolved,
            Err(e) => {
                advance(&mut phase, SubmissionPhase::Failed);
                return Err(SubmitError::Resolution(e));
            }
        };
        let merged = !resolved.is_new();
        let mut location = resolved.safe_unwrap();
        if merged {
            if let Err(e) = self.repo.merge_details(&location.id, &name, &description, submitted_at).await {
                advance(&mut phase, SubmissionPhase::Failed);
                return Err(SubmitError::Resolution(e));
            }
            location.name = name;
            location.description = description.clone();
            location.created_at = submitted_at;
        }

        advance(&mut phase, SubmissionPhase::TransferringMedia);
        let file_count = files.len();
        let mut tasks = JoinSet::new();
        for (index, file) in files.into_iter().enumerate() {
            let repo = Arc::clone(&self.repo);
            let blobs = Arc::clone(&self.blobs);
            let description = description.clone();
            let location_id = location.id;
            let timeout = self.transfer_timeout;
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(
                    timeout,
                    transfer(repo.as_ref(), blobs.as_ref(), location_id, &file, &description),
                ).await {
                    Ok(result) => result,
                    Err(_) => Err(TransferError::Timeout(timeout)),
                };
                (index, file.filename, outcome)
            });
        }

        // fan-in: wait for the full set, keep outcomes in submission order
        let mut outcomes: Vec<Option<(String, Result<Picture, TransferError>)>> =
            (0..file_count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, filename, outcome)) => outcomes[index] = Some((filename, outcome)),
                Err(e) => error!("Transfer task aborted: {e}"),
            }
        }

        advance(&mut phase, SubmissionPhase::Finalizing);
        let mut pictures = Vec::new();
        let mut failures = Vec::new();
        for (index, slot) in outcomes.into_iter().enumerate() {
            match slot {
                Some((_, Ok(picture))) => pictures.push(picture),
                Some((filename, Err(error))) => failures.push(FailedTransfer { filename, error }),
                None => failures.push(FailedTransfer {
                    filename: format!("file #{}", index + 1),
                    error: TransferError::Task("task aborted".to_string()),
                }),
            }
        }

        if !failures.is_empty() {
            advance(&mut phase, SubmissionPhase::Failed);
            return Err(SubmitError::Finalization { failed: failures.len(), failures });
        }

        advance(&mut phase, SubmissionPhase::Succeeded);
        info!("Submission for {} stored {} pictures", location.name, pictures.len());
        Ok(SubmissionReceipt { location, pictures, merged })
    }
}

fn advance(phase: &mut SubmissionPhase, next: SubmissionPhase) {
    debug!("Submission phase: {phase} -> {next}");
    *phase = next;
}
