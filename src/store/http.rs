use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::models::photo::{CreatePhotoRequest, PhotoId};
use crate::store::{PhotoStore, StoreError};

#[derive(Debug, Clone)]
pub struct HttpPhotoStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreatedPhoto {
    id: PhotoId,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpPhotoStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Transport(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl PhotoStore for HttpPhotoStore {
    async fn create_photo(&self, request: CreatePhotoRequest) -> Result<PhotoId, StoreError> {
        let response = self
            .http
            .post(self.url("/photos"))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let created: CreatedPhoto = check(response).await?.json().await.map_err(transport)?;
        Ok(created.id)
    }

    async fn upload_chunk(
        &self,
        photo_id: PhotoId,
        chunk_index: u64,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .put(self.url(&format!("/photos/{photo_id}/chunks/{chunk_index}")))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }

    async fn finalize_upload(&self, photo_id: PhotoId) -> Result<(), StoreError> {
        let response = self
            .http
            .post(self.url(&format!("/photos/{photo_id}/finalize")))
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => format!("photo service returned {status}"),
        Err(_) => body.trim().to_string(),
    };

    if status.is_client_error() {
        Err(StoreError::Rejected(message))
    } else {
        Err(StoreError::Transport(message))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_bytes, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::HttpPhotoStore;
    use crate::models::photo::{CreatePhotoRequest, PhotoId, PhotoMetadata};
    use crate::store::{PhotoStore, StoreError};

    fn client(server: &MockServer) -> HttpPhotoStore {
        HttpPhotoStore::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn create_posts_declaration_and_reads_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/photos"))
            .and(body_json(json!({
                "title": "Kyoto",
                "expectedChunks": 1,
                "totalSize": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 77 })))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = PhotoMetadata::new().with("title", "Kyoto");
        let id = client(&server)
            .create_photo(CreatePhotoRequest::new(&metadata, 1, 3))
            .await
            .unwrap();

        assert_eq!(id, PhotoId(77));
    }

    #[tokio::test]
    async fn chunk_is_sent_as_raw_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/photos/5/chunks/0"))
            .and(body_bytes(b"jpeg".to_vec()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .upload_chunk(PhotoId(5), 0, b"jpeg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn client_error_is_a_rejection_with_service_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/photos/9/finalize"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "error": "photo 9 has 0 of 1 chunks" })),
            )
            .mount(&server)
            .await;

        let err = client(&server).finalize_upload(PhotoId(9)).await.unwrap_err();
        assert_eq!(err, StoreError::Rejected("photo 9 has 0 of 1 chunks".to_string()));
    }

    #[tokio::test]
    async fn server_error_is_a_transport_fault() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/photos"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_photo(CreatePhotoRequest::new(&PhotoMetadata::new(), 1, 1))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::Transport("photo service returned 503 Service Unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_fault() {
        let store = HttpPhotoStore::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();

        let err = store.finalize_upload(PhotoId(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = HttpPhotoStore::new("http://photos.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://photos.local/api");
    }
}
