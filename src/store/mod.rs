pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::photo::{CreatePhotoRequest, PhotoId};

pub use http::HttpPhotoStore;
pub use memory::InMemoryPhotoStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn create_photo(&self, request: CreatePhotoRequest) -> Result<PhotoId, StoreError>;

    async fn upload_chunk(
        &self,
        photo_id: PhotoId,
        chunk_index: u64,
        bytes: &[u8],
    ) -> Result<(), StoreError>;

    async fn finalize_upload(&self, photo_id: PhotoId) -> Result<(), StoreError>;
}
