use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

use emotion_lens::mocks::{FailingEmotionModel, MockEmotionModel};
use emotion_lens::server::{router, AppState};
use emotion_lens::{EmotionAnalyzer, EmotionModel, FallbackGenerator, ModelRuntime, Validator};

const BOUNDARY: &str = "emotion-lens-test-boundary";

fn app<M: EmotionModel + 'static>(model: M, upload_dir: &Path) -> Router {
    let analyzer = EmotionAnalyzer::new(
        ModelRuntime::with_model(model),
        FallbackGenerator::without_delay(),
    );
    router(AppState::new(
        analyzer,
        Validator::default(),
        upload_dir.to_path_buf(),
    ))
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([180, 140, 120])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_upload_returns_ranked_results() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(multipart_request("file", "my face.png", "image/png", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["source"], "model");
    assert_eq!(json["image_path"], "static/uploads/my_face.png");

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["emotion"], "happy");
    assert!((results[0]["confidence"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(results[1]["emotion"], "angry");
    assert!(results[0]["description"].as_str().unwrap().contains("joy"));

    let saved = std::fs::read(temp_dir.path().join("my_face.png")).unwrap();
    assert_eq!(saved, png_bytes());
}

#[tokio::test]
async fn test_saved_upload_is_served() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request("file", "face.png", "image/png", &png_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/static/uploads/face.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), png_bytes().as_slice());
}

#[tokio::test]
async fn test_inference_failure_is_tagged_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(FailingEmotionModel, temp_dir.path());

    let response = app
        .oneshot(multipart_request("file", "face.png", "image/png", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["source"], "fallback");
    let len = json["results"].as_array().unwrap().len();
    assert!((1..=4).contains(&len));
}

#[tokio::test]
async fn test_missing_file_field() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(multipart_request("avatar", "face.png", "image/png", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file uploaded");
}

#[tokio::test]
async fn test_empty_filename() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(multipart_request("file", "", "image/png", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file selected");
}

#[tokio::test]
async fn test_rejected_upload_is_not_saved() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(multipart_request(
            "file",
            "report.pdf",
            "application/pdf",
            b"%PDF-1.4 fake",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Please upload a valid image file (JPEG, PNG, or WebP)"
    );
    assert!(!temp_dir.path().join("report.pdf").exists());
}

#[tokio::test]
async fn test_malformed_image() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(multipart_request(
            "file",
            "face.png",
            "image/png",
            b"not a png at all",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid image file");
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], true);
}

#[tokio::test]
async fn test_unwritable_upload_dir_is_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let app = app(MockEmotionModel::happy(), &blocker.join("uploads"));

    let response = app
        .oneshot(multipart_request("file", "face.png", "image/png", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(
        message.starts_with("Filesystem error: create upload directory failed"),
        "{message}"
    );
}

#[tokio::test]
async fn test_frontend_routes_are_not_served() {
    let temp_dir = TempDir::new().unwrap();
    let app = app(MockEmotionModel::happy(), temp_dir.path());

    for uri in ["/", "/static/js/app.js"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
