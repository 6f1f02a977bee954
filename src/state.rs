use std::sync::Arc;

use crate::config::Config;
use crate::engine::scoring::ScoringSettings;
use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::store::{HttpPhotoStore, InMemoryPhotoStore, PhotoStore};

pub struct AppState {
    pub photos: Arc<InMemoryPhotoStore>,
    pub uploader: Arc<dyn PhotoStore>,
    pub scoring: ScoringSettings,
    pub upload_chunk_size: usize,
    pub max_upload_bytes: u64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let photos = Arc::new(InMemoryPhotoStore::new(config.max_upload_bytes));

        let uploader: Arc<dyn PhotoStore> = match &config.photo_service_url {
            Some(url) => Arc::new(
                HttpPhotoStore::new(url.clone(), config.photo_service_timeout())
                    .map_err(|err| AppError::Internal(err.to_string()))?,
            ),
            None => photos.clone() as Arc<dyn PhotoStore>,
        };

        Ok(Self::with_uploader(config, photos, uploader))
    }

    pub fn with_uploader(
        config: &Config,
        photos: Arc<InMemoryPhotoStore>,
        uploader: Arc<dyn PhotoStore>,
    ) -> Self {
        Self {
            photos,
            uploader,
            scoring: config.scoring(),
            upload_chunk_size: config.upload_chunk_size,
            max_upload_bytes: config.max_upload_bytes,
            metrics: Metrics::new(),
        }
    }
}
