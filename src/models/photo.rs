use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoMetadata(pub Map<String, Value>);

impl PhotoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhotoRequest {
    #[serde(flatten)]
    pub metadata: PhotoMetadata,
    pub expected_chunks: u64,
    pub total_size: u64,
}

impl CreatePhotoRequest {
    // Same-named caller fields are dropped so the declaration wins.
    pub fn new(metadata: &PhotoMetadata, expected_chunks: u64, total_size: u64) -> Self {
        let mut fields = metadata.0.clone();
        fields.remove("expectedChunks");
        fields.remove("totalSize");

        Self {
            metadata: PhotoMetadata(fields),
            expected_chunks,
            total_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoStatus {
    Uploading,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSummary {
    pub id: PhotoId,
    pub status: PhotoStatus,
    pub expected_chunks: u64,
    pub received_chunks: u64,
    pub total_size: u64,
    pub metadata: PhotoMetadata,
    pub created_at: DateTime<Utc>,
}
