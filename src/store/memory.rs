use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use crate::models::photo::{
    CreatePhotoRequest, PhotoId, PhotoMetadata, PhotoStatus, PhotoSummary,
};
use crate::store::{PhotoStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoRecordError {
    #[error("photo {0} not found")]
    NotFound(PhotoId),

    #[error("photo {0} is already finalized")]
    AlreadyFinalized(PhotoId),

    #[error("expectedChunks must be at least 1")]
    NoChunksDeclared,

    #[error("declared size {declared} exceeds limit of {limit} bytes")]
    TooLarge { declared: u64, limit: u64 },

    #[error("chunk index {index} out of range, photo {photo_id} expects {expected} chunks")]
    ChunkOutOfRange {
        photo_id: PhotoId,
        index: u64,
        expected: u64,
    },

    #[error("photo {photo_id} has {received} of {expected} chunks")]
    Incomplete {
        photo_id: PhotoId,
        received: u64,
        expected: u64,
    },

    #[error("photo {photo_id} received {received} bytes, declared {declared}")]
    SizeMismatch {
        photo_id: PhotoId,
        received: u64,
        declared: u64,
    },
}

impl From<PhotoRecordError> for StoreError {
    fn from(err: PhotoRecordError) -> Self {
        StoreError::Rejected(err.to_string())
    }
}

#[derive(Debug, Clone)]
struct PhotoRecord {
    metadata: PhotoMetadata,
    expected_chunks: u64,
    total_size: u64,
    chunks: BTreeMap<u64, Vec<u8>>,
    status: PhotoStatus,
    created_at: DateTime<Utc>,
}

impl PhotoRecord {
    fn summary(&self, id: PhotoId) -> PhotoSummary {
        PhotoSummary {
            id,
            status: self.status,
            expected_chunks: self.expected_chunks,
            received_chunks: self.chunks.len() as u64,
            total_size: self.total_size,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }

    fn received_bytes(&self) -> u64 {
        self.chunks.values().map(|chunk| chunk.len() as u64).sum()
    }
}

pub struct InMemoryPhotoStore {
    photos: DashMap<PhotoId, PhotoRecord>,
    next_id: AtomicU64,
    max_photo_bytes: u64,
}

impl InMemoryPhotoStore {
    pub fn new(max_photo_bytes: u64) -> Self {
        Self {
            photos: DashMap::new(),
            next_id: AtomicU64::new(1),
            max_photo_bytes,
        }
    }

    pub fn create(&self, request: CreatePhotoRequest) -> Result<PhotoId, PhotoRecordError> {
        if request.expected_chunks == 0 {
            return Err(PhotoRecordError::NoChunksDeclared);
        }
        if request.total_size > self.max_photo_bytes {
            return Err(PhotoRecordError::TooLarge {
                declared: request.total_size,
                limit: self.max_photo_bytes,
            });
        }

        let id = PhotoId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.photos.insert(
            id,
            PhotoRecord {
                metadata: request.metadata,
                expected_chunks: request.expected_chunks,
                total_size: request.total_size,
                chunks: BTreeMap::new(),
                status: PhotoStatus::Uploading,
                created_at: Utc::now(),
            },
        );

        info!(
            photo_id = %id,
            expected_chunks = request.expected_chunks,
            total_size = request.total_size,
            "photo record created"
        );
        Ok(id)
    }

    // Re-sending an index replaces the earlier bytes.
    pub fn put_chunk(
        &self,
        photo_id: PhotoId,
        index: u64,
        bytes: &[u8],
    ) -> Result<(), PhotoRecordError> {
        let mut record = self
            .photos
            .get_mut(&photo_id)
            .ok_or(PhotoRecordError::NotFound(photo_id))?;

        if record.status == PhotoStatus::Complete {
            return Err(PhotoRecordError::AlreadyFinalized(photo_id));
        }
        if index >= record.expected_chunks {
            return Err(PhotoRecordError::ChunkOutOfRange {
                photo_id,
                index,
                expected: record.expected_chunks,
            });
        }

        let others: u64 = record
            .chunks
            .iter()
            .filter(|(i, _)| **i != index)
            .map(|(_, chunk)| chunk.len() as u64)
            .sum();
        let received = others + bytes.len() as u64;
        if received > record.total_size {
            return Err(PhotoRecordError::SizeMismatch {
                photo_id,
                received,
                declared: record.total_size,
            });
        }

        record.chunks.insert(index, bytes.to_vec());
        Ok(())
    }

    pub fn finalize(&self, photo_id: PhotoId) -> Result<PhotoSummary, PhotoRecordError> {
        let mut record = self
            .photos
            .get_mut(&photo_id)
            .ok_or(PhotoRecordError::NotFound(photo_id))?;

        if record.status == PhotoStatus::Complete {
            return Err(PhotoRecordError::AlreadyFinalized(photo_id));
        }

        let received_chunks = record.chunks.len() as u64;
        if received_chunks != record.expected_chunks {
            return Err(PhotoRecordError::Incomplete {
                photo_id,
                received: received_chunks,
                expected: record.expected_chunks,
            });
        }

        let received_bytes = record.received_bytes();
        if received_bytes != record.total_size {
            return Err(PhotoRecordError::SizeMismatch {
                photo_id,
                received: received_bytes,
                declared: record.total_size,
            });
        }

        record.status = PhotoStatus::Complete;
        info!(photo_id = %photo_id, bytes = received_bytes, "photo upload finalized");

        Ok(record.summary(photo_id))
    }

    pub fn summary(&self, photo_id: PhotoId) -> Result<PhotoSummary, PhotoRecordError> {
        self.photos
            .get(&photo_id)
            .map(|record| record.summary(photo_id))
            .ok_or(PhotoRecordError::NotFound(photo_id))
    }

    pub fn image(&self, photo_id: PhotoId) -> Option<Vec<u8>> {
        let record = self.photos.get(&photo_id)?;
        if record.status != PhotoStatus::Complete {
            return None;
        }
        Some(record.chunks.values().flatten().copied().collect())
    }

    // Completed photos are never swept.
    pub fn sweep_abandoned(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.photos.len();

        self.photos.retain(|_, record| {
            record.status == PhotoStatus::Complete || record.created_at > cutoff
        });

        before.saturating_sub(self.photos.len())
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.photos
            .iter()
            .filter(|entry| entry.value().status == PhotoStatus::Complete)
            .count()
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn create_photo(&self, request: CreatePhotoRequest) -> Result<PhotoId, StoreError> {
        Ok(self.create(request)?)
    }

    async fn upload_chunk(
        &self,
        photo_id: PhotoId,
        chunk_index: u64,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        Ok(self.put_chunk(photo_id, chunk_index, bytes)?)
    }

    async fn finalize_upload(&self, photo_id: PhotoId) -> Result<(), StoreError> {
        self.finalize(photo_id)?;
        Ok(())
    }
}
