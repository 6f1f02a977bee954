use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use geoguess_core::api::rest::router;
use geoguess_core::config::Config;
use geoguess_core::engine::scoring::CoordinatePolicy;
use geoguess_core::engine::upload::upload_photo;
use geoguess_core::models::photo::{PhotoId, PhotoMetadata};
use geoguess_core::state::AppState;
use geoguess_core::store::{HttpPhotoStore, InMemoryPhotoStore, PhotoStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(&config).unwrap());
    (router(state.clone()), state)
}

fn setup() -> (axum::Router, Arc<AppState>) {
    setup_with(Config::default())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn bytes_request(method: &str, uri: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/octet-stream")
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn spawn_photo_service() -> (String, Arc<AppState>) {
    let (app, state) = setup();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["photos"], 0);
    assert_eq!(body["completed_photos"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("rounds_scored_total"));
    assert!(body.contains("upload_bytes_total"));
}

#[tokio::test]
async fn exact_guess_scores_5000() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({
                "guess": { "latitude": 35.6762, "longitude": 139.6503 },
                "actual": { "latitude": 35.6762, "longitude": 139.6503 },
                "timeLeftSeconds": 120,
                "difficulty": "HARD",
                "photoUrl": "https://example.com/tokyo.jpg"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["score"], 5000);
    assert_eq!(body["distanceMeters"], 0.0);
    assert_eq!(body["timeUsedSeconds"], 60);
    assert_eq!(body["difficulty"], "HARD");
    assert_eq!(body["photoUrl"], "https://example.com/tokyo.jpg");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn distant_guess_scores_zero_and_defaults_reporting_fields() {
    let (app, state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({
                "guess": { "latitude": 0.0, "longitude": 0.0 },
                "actual": { "latitude": 0.0, "longitude": 1.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["score"], 0);
    assert_eq!(body["timeUsedSeconds"], 0);
    assert_eq!(body["difficulty"], "NORMAL");
    let distance = body["distanceMeters"].as_f64().unwrap();
    assert!((distance - 111_195.0).abs() < 1.0);
    assert_eq!(state.metrics.rounds_scored_total.get(), 1);
}

#[tokio::test]
async fn missing_guess_fields_default_to_zero() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({
                "guess": {},
                "actual": { "latitude": 0.0, "longitude": 0.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["score"], 5000);
    assert_eq!(body["guess"]["latitude"], 0.0);
}

#[tokio::test]
async fn reject_policy_returns_400_for_missing_guess() {
    let (app, _state) = setup_with(Config {
        coordinate_policy: CoordinatePolicy::Reject,
        ..Config::default()
    });
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({
                "guess": { "latitude": 35.0 },
                "actual": { "latitude": 35.0, "longitude": 139.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "guess.longitude is required");
}

#[tokio::test]
async fn submission_without_actual_returns_400_json() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({ "guess": { "latitude": 35.0, "longitude": 139.0 } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("actual"));
}

#[tokio::test]
async fn non_numeric_guess_returns_400_json() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rounds/score",
            json!({
                "guess": { "latitude": "north", "longitude": 139.0 },
                "actual": { "latitude": 35.0, "longitude": 139.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_upload_body_returns_400_json() {
    let (app, _state) = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/uploads")
        .header("content-type", "application/json")
        .body(Body::from("{\"imageBase64\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn upload_stores_photo_in_process() {
    let (app, state) = setup();
    let image = b"\xff\xd8\xff\xe0 fake jpeg body";

    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({
                "metadata": { "title": "Sensoji", "difficulty": "EASY" },
                "imageBase64": STANDARD.encode(image)
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let id = PhotoId(body["photoId"].as_u64().unwrap());
    assert_eq!(body["size"], image.len());

    assert_eq!(state.photos.image(id).unwrap(), image.to_vec());
    let summary = state.photos.summary(id).unwrap();
    assert_eq!(summary.expected_chunks, 1);
    assert_eq!(summary.metadata.get("title"), Some(&json!("Sensoji")));
    assert_eq!(state.metrics.upload_bytes_total.get(), image.len() as u64);
}

#[tokio::test]
async fn upload_uses_configured_chunk_size() {
    let (app, state) = setup_with(Config {
        upload_chunk_size: 4,
        ..Config::default()
    });

    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({ "imageBase64": STANDARD.encode(b"0123456789") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let id = PhotoId(body_json(response).await["photoId"].as_u64().unwrap());
    assert_eq!(state.photos.summary(id).unwrap().expected_chunks, 3);
    assert_eq!(state.photos.image(id).unwrap(), b"0123456789".to_vec());
}

#[tokio::test]
async fn upload_rejected_at_create_returns_502_with_verbatim_reason() {
    let config = Config {
        max_upload_bytes: 4,
        ..Config::default()
    };
    // The backing store allows less than the request limit, so create refuses.
    let photos = Arc::new(InMemoryPhotoStore::new(2));
    let state = Arc::new(AppState::with_uploader(&config, photos.clone(), photos.clone()));
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({ "imageBase64": STANDARD.encode(b"abc") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "declared size 3 exceeds limit of 2 bytes");
    assert_eq!(body["step"], "create");
    assert_eq!(body["kind"], "rejected");
    assert!(body["photoId"].is_null());
    assert!(photos.is_empty());
}

#[tokio::test]
async fn upload_larger_than_limit_returns_413() {
    let (app, _state) = setup_with(Config {
        max_upload_bytes: 4,
        ..Config::default()
    });

    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({ "imageBase64": STANDARD.encode(b"too large") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn upload_with_invalid_base64_returns_400() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({ "imageBase64": "not base64!!" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn photo_routes_follow_create_upload_finalize() {
    let (app, _state) = setup();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/photos",
            json!({ "title": "Osaka", "expectedChunks": 1, "totalSize": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_u64().unwrap();

    let response = app
        .clone()
        .oneshot(bytes_request("PUT", &format!("/photos/{id}/chunks/0"), b"hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request("POST", &format!("/photos/{id}/finalize"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "COMPLETE");
    assert_eq!(body["receivedChunks"], 1);

    let response = app
        .oneshot(json_request("POST", &format!("/photos/{id}/finalize"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn finalize_before_chunks_returns_400() {
    let (app, _state) = setup();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/photos",
            json!({ "expectedChunks": 2, "totalSize": 10 }),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_u64().unwrap();

    let response = app
        .oneshot(json_request("POST", &format!("/photos/{id}/finalize"), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], format!("photo {id} has 0 of 2 chunks"));
}

#[tokio::test]
async fn unknown_photo_returns_404() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/photos/999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn coordinator_uploads_through_http_store() {
    let (base_url, service) = spawn_photo_service().await;
    let store = HttpPhotoStore::new(base_url, Duration::from_secs(5)).unwrap();
    let metadata = PhotoMetadata::new().with("title", "Nara");

    let id = upload_photo(&store, b"deer park", &metadata)
        .await
        .into_result()
        .unwrap();

    assert_eq!(service.photos.image(id).unwrap(), b"deer park".to_vec());
    assert_eq!(service.photos.completed(), 1);
}

#[tokio::test]
async fn http_store_surfaces_service_refusal() {
    let (base_url, _service) = spawn_photo_service().await;
    let store = HttpPhotoStore::new(base_url, Duration::from_secs(5)).unwrap();

    // A chunk for a photo the service never created.
    let err = store
        .upload_chunk(PhotoId(404), 0, b"orphan")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "photo 404 not found");
}

#[tokio::test]
async fn uploads_route_can_forward_to_remote_service() {
    let (base_url, remote) = spawn_photo_service().await;
    let (app, local) = setup_with(Config {
        photo_service_url: Some(base_url),
        ..Config::default()
    });

    let response = app
        .oneshot(json_request(
            "POST",
            "/uploads",
            json!({ "imageBase64": STANDARD.encode(b"remote bytes") }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let id = PhotoId(body_json(response).await["photoId"].as_u64().unwrap());

    assert_eq!(remote.photos.image(id).unwrap(), b"remote bytes".to_vec());
    assert!(local.photos.is_empty());
}
