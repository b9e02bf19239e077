use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use moodfinance_server::{app, AppConfig, AppState};
use moodfinance_vision::{
    EmotionBackend, FixedEmotionDetector, FixedTextRecognizer, OcrBackend,
    UnavailableEmotionDetector, UnavailableRecognizer,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "moodfinance-test-boundary";

const RECEIPT_TEXT: &str = "카페 무드\n아메리카노 4,500원\n치즈케이크 6,800원\n합계 11,300원";

struct TestApp {
    router: Router,
    state: AppState,
    _dir: tempfile::TempDir,
}

async fn test_app(ocr: Arc<dyn OcrBackend>, emotions: Box<dyn EmotionBackend>) -> TestApp {
    test_app_with(AppConfig::default(), ocr, emotions).await
}

async fn test_app_with(
    config: AppConfig,
    ocr: Arc<dyn OcrBackend>,
    emotions: Box<dyn EmotionBackend>,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = moodfinance_storage::create_db(&dir.path().join("api.db")).await.unwrap();
    let state = AppState::new(db, ocr, emotions, &config);
    TestApp {
        router: app(state.clone(), &config.server),
        state,
        _dir: dir,
    }
}

async fn default_app() -> TestApp {
    test_app(
        Arc::new(FixedTextRecognizer::new(RECEIPT_TEXT)),
        Box::new(FixedEmotionDetector::new([("happy", 92.0), ("neutral", 6.5), ("sad", 1.5)])),
    )
    .await
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, value: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

// ── Health ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let t = default_app().await;
    let (status, body) = send(&t.router, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "MoodFinance AI Server");
}

#[tokio::test]
async fn prefix_without_leading_slash_is_mounted() {
    let mut config = AppConfig::default();
    config.server.api_prefix = "api/v2/".to_string();
    let t = test_app_with(
        config,
        Arc::new(UnavailableRecognizer),
        Box::new(UnavailableEmotionDetector),
    )
    .await;

    let (status, body) = send(&t.router, get("/api/v2/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let t = default_app().await;
    let (status, _) = send(&t.router, get("/api/v1/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Receipt ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn receipt_upload_returns_text_and_parsed_data() {
    let t = default_app().await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/receipt", "file", "r.png", &png(8, 8))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extracted_text"], RECEIPT_TEXT);
    assert_eq!(
        body["parsed_data"],
        json!({
            "items": [
                {"item": "아메리카노", "price": 4500},
                {"item": "치즈케이크", "price": 6800},
                {"item": "합계", "price": 11300}
            ],
            "prices": [4500, 6800, 11300],
            "total": 11300
        })
    );
}

#[tokio::test]
async fn receipt_engine_sees_preprocessed_png() {
    let ocr = Arc::new(FixedTextRecognizer::new("커피 ４,５００원"));
    let t = test_app(ocr.clone(), Box::new(UnavailableEmotionDetector)).await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/receipt", "file", "r.png", &png(8, 8))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parsed_data"]["items"], json!([{"item": "커피", "price": 4500}]));
    assert_eq!(ocr.calls(), 1);
    assert!(ocr.last_input().unwrap().starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let mut config = AppConfig::default();
    config.server.max_upload_bytes = 16;
    let ocr = Arc::new(FixedTextRecognizer::new(RECEIPT_TEXT));
    let t = test_app_with(config, ocr.clone(), Box::new(UnavailableEmotionDetector)).await;

    let (status, _) =
        send(&t.router, multipart("/api/v1/receipt", "file", "r.png", &png(8, 8))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn receipt_without_file_field_is_400() {
    let t = default_app().await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/receipt", "image", "r.png", &png(2, 2))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn receipt_with_undecodable_bytes_is_400() {
    let t = default_app().await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/receipt", "file", "r.png", b"not an image")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn receipt_without_ocr_engine_is_503() {
    let t = test_app(Arc::new(UnavailableRecognizer), Box::new(UnavailableEmotionDetector)).await;
    let (status, _) =
        send(&t.router, multipart("/api/v1/receipt", "file", "r.png", &png(4, 4))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Image ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_upload_is_analyzed_and_stored() {
    let t = default_app().await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/image", "file", "me.png", &png(16, 9))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "me.png");
    assert_eq!(body["width"], 16);
    assert_eq!(body["height"], 9);
    assert_eq!(body["emotions"]["happy"], 92.0);
    assert!(body["uploaded_at"].is_string());

    let id = body["id"].as_str().unwrap();
    let stored = moodfinance_storage::get_image(&t.state.db, id).await.unwrap().unwrap();
    assert_eq!(stored.meta.width, 16);
    assert_eq!(stored.emotions.dominant(), Some("happy"));
}

#[tokio::test]
async fn image_is_stored_even_when_emotion_model_fails() {
    let t = test_app(Arc::new(UnavailableRecognizer), Box::new(UnavailableEmotionDetector)).await;
    let (status, body) =
        send(&t.router, multipart("/api/v1/image", "file", "me.png", &png(3, 3))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emotions"], json!({"error": "Emotion model not configured"}));
    let id = body["id"].as_str().unwrap();
    assert!(moodfinance_storage::get_image(&t.state.db, id).await.unwrap().is_some());
}

#[tokio::test]
async fn image_with_undecodable_bytes_is_400() {
    let t = default_app().await;
    let (status, _) =
        send(&t.router, multipart("/api/v1/image", "file", "me.png", b"\x00\x01\x02")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Analysis store + insight ──────────────────────────────────────────────────

fn analysis(emotion: &str, amount: f64) -> Value {
    json!({
        "user_id": "u1",
        "emotion": emotion,
        "category": "shopping",
        "amount": amount,
        "timestamp": "2024-05-01T12:00:00Z",
        "description": null
    })
}

#[tokio::test]
async fn insight_on_empty_store_has_fallback_message() {
    let t = default_app().await;
    let (status, body) = send(&t.router, get("/api/v1/insight")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"count": 0, "insights": ["뚜렷한 소비 패턴이 발견되지 않았습니다."]}));
}

#[tokio::test]
async fn stored_analyses_feed_insights() {
    let t = default_app().await;

    for (emotion, amount) in [("sad", 20000.0), ("happy", 3000.0), ("sad", 10000.0)] {
        let (status, body) =
            send(&t.router, post_json("/api/v1/store-analysis", &analysis(emotion, amount))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "저장 성공");
        assert!(body["id"].is_string());
    }

    let (status, body) = send(&t.router, get("/api/v1/insight")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["insights"], json!(["sad 상태일 때 평균 소비가 15,000원으로 높습니다."]));
}

#[tokio::test]
async fn store_failure_is_500_with_prefixed_detail() {
    let t = default_app().await;
    t.state.db.close().await;

    let (status, body) =
        send(&t.router, post_json("/api/v1/store-analysis", &analysis("sad", 1000.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().starts_with("DB 저장 실패: "));
}

#[tokio::test]
async fn huge_amounts_do_not_break_insight() {
    let t = default_app().await;
    for _ in 0..2 {
        let (status, _) = send(
            &t.router,
            post_json("/api/v1/store-analysis", &analysis("sad", 7.9e28)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&t.router, get("/api/v1/insight")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let insight = body["insights"][0].as_str().unwrap();
    assert!(insight.starts_with("sad 상태일 때 평균 소비가 7"), "{insight}");
}

#[tokio::test]
async fn store_analysis_rejects_missing_fields() {
    let t = default_app().await;
    let (status, _) = send(
        &t.router,
        post_json("/api/v1/store-analysis", &json!({"category": "food", "amount": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&t.router, get("/api/v1/insight")).await;
    assert_eq!(body["count"], 0);
}
