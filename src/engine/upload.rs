use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::photo::{CreatePhotoRequest, PhotoId, PhotoMetadata};
use crate::store::{PhotoStore, StoreError};

const GENERIC_FAULT: &str = "upload failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    Create,
    UploadChunk { index: u64, of: u64 },
    Finalize,
}

impl UploadStep {
    pub fn label(&self) -> &'static str {
        match self {
            UploadStep::Create => "create",
            UploadStep::UploadChunk { .. } => "upload_chunk",
            UploadStep::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Rejected,
    Fault,
}

// `photo_id` is set once create has succeeded; that record stays unfinalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub step: UploadStep,
    pub kind: FailureKind,
    pub message: String,
    pub photo_id: Option<PhotoId>,
}

impl UploadFailure {
    fn new(step: UploadStep, photo_id: Option<PhotoId>, err: StoreError) -> Self {
        let (kind, message) = match err {
            StoreError::Rejected(message) => (FailureKind::Rejected, message),
            StoreError::Transport(message) => (FailureKind::Fault, message),
        };

        Self {
            step,
            kind,
            message,
            photo_id,
        }
    }

    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == FailureKind::Fault {
            let message = if self.message.is_empty() {
                GENERIC_FAULT
            } else {
                &self.message
            };
            return f.write_str(message);
        }

        match self.step {
            UploadStep::Create => f.write_str(&self.message),
            UploadStep::UploadChunk { of: 1, .. } => {
                write!(f, "single chunk upload failed: {}", self.message)
            }
            UploadStep::UploadChunk { index, .. } => {
                write!(f, "chunk {index} upload failed: {}", self.message)
            }
            UploadStep::Finalize => write!(f, "finalize failed: {}", self.message),
        }
    }
}

impl std::error::Error for UploadFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success(PhotoId),
    Failure(UploadFailure),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    pub fn photo_id(&self) -> Option<PhotoId> {
        match self {
            UploadOutcome::Success(id) => Some(*id),
            UploadOutcome::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<PhotoId, UploadFailure> {
        match self {
            UploadOutcome::Success(id) => Ok(id),
            UploadOutcome::Failure(failure) => Err(failure),
        }
    }
}

impl From<Result<PhotoId, UploadFailure>> for UploadOutcome {
    fn from(result: Result<PhotoId, UploadFailure>) -> Self {
        match result {
            Ok(id) => UploadOutcome::Success(id),
            Err(failure) => UploadOutcome::Failure(failure),
        }
    }
}

pub async fn upload_photo<S>(store: &S, image: &[u8], metadata: &PhotoMetadata) -> UploadOutcome
where
    S: PhotoStore + ?Sized,
{
    upload_photo_chunked(store, image, metadata, 0).await
}

// A `chunk_size` of 0 sends the whole image as one chunk.
pub async fn upload_photo_chunked<S>(
    store: &S,
    image: &[u8],
    metadata: &PhotoMetadata,
    chunk_size: usize,
) -> UploadOutcome
where
    S: PhotoStore + ?Sized,
{
    let outcome: UploadOutcome = run_protocol(store, image, metadata, chunk_size).await.into();

    match &outcome {
        UploadOutcome::Success(id) => {
            info!(photo_id = %id, size = image.len(), "photo upload completed");
        }
        UploadOutcome::Failure(failure) => {
            warn!(
                step = failure.step.label(),
                photo_id = ?failure.photo_id,
                reason = %failure,
                "photo upload failed"
            );
        }
    }

    outcome
}

async fn run_protocol<S>(
    store: &S,
    image: &[u8],
    metadata: &PhotoMetadata,
    chunk_size: usize,
) -> Result<PhotoId, UploadFailure>
where
    S: PhotoStore + ?Sized,
{
    let chunks = split_chunks(image, chunk_size);
    let expected_chunks = chunks.len() as u64;

    let request = CreatePhotoRequest::new(metadata, expected_chunks, image.len() as u64);
    let photo_id = guarded(store.create_photo(request))
        .await
        .map_err(|err| UploadFailure::new(UploadStep::Create, None, err))?;

    info!(
        photo_id = %photo_id,
        expected_chunks,
        size = image.len(),
        "photo record created"
    );

    for (index, chunk) in (0u64..).zip(chunks) {
        let step = UploadStep::UploadChunk {
            index,
            of: expected_chunks,
        };
        guarded(store.upload_chunk(photo_id, index, chunk))
            .await
            .map_err(|err| UploadFailure::new(step, Some(photo_id), err))?;
    }

    guarded(store.finalize_upload(photo_id))
        .await
        .map_err(|err| UploadFailure::new(UploadStep::Finalize, Some(photo_id), err))?;

    Ok(photo_id)
}

fn split_chunks(image: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if chunk_size == 0 || image.len() <= chunk_size {
        return vec![image];
    }
    image.chunks(chunk_size).collect()
}

async fn guarded<T, F>(call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(StoreError::Transport(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        GENERIC_FAULT.to_string()
    }
}
