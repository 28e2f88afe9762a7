//! HTTP facade tests driven through the router with `tower::ServiceExt`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use puml_api::{create_api_router, AppState, HttpConfig, ImageService};
use puml_storage::{AccessTracker, CacheConfig, DiskStore, MemoryCache};
use puml_test_utils::fixtures::{manual_clock, scratch_dir, SAMPLE_DIAGRAM};
use puml_test_utils::*;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "puml-test-boundary";
const BODY_LIMIT: usize = 1024 * 1024;

struct TestApp {
    router: Router,
    renderer: Arc<CountingRenderer>,
    _dir: tempfile::TempDir,
}

fn app_with(renderer: CountingRenderer, max_upload_bytes: usize) -> TestApp {
    let dir = scratch_dir();
    let clock: SharedClock = manual_clock();
    let renderer = Arc::new(renderer);
    let service = Arc::new(ImageService::new(
        Arc::new(MemoryCache::new(&CacheConfig::new(), clock.clone())),
        Arc::new(DiskStore::open(dir.path()).expect("open")),
        Arc::new(AccessTracker::new(clock)),
        renderer.clone(),
        Duration::from_secs(5),
    ));
    let http = HttpConfig {
        max_upload_bytes,
        ..HttpConfig::default()
    };

    TestApp {
        router: create_api_router(AppState::new(service, http)),
        renderer,
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with(CountingRenderer::new(), 4096)
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn multipart_request(file: Option<(&str, &[u8])>, output_type: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"diagram.puml\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(output_type) = output_type {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"outputType\"\r\n\r\n{output_type}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/plantuml/file/generate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn content_type(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

// ============================================================================
// GREETING AND HEALTH
// ============================================================================

#[tokio::test]
async fn test_greeting_on_root_and_api() {
    for uri in ["/", "/api"] {
        let response = app()
            .router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "PlantUML Hello");
        assert!(json["data"].is_null());
    }
}

#[tokio::test]
async fn test_health_reports_cache_counts() {
    let app = app();
    let render = json_request(
        "/api/plantuml/text/generate",
        serde_json::json!({ "text": SAMPLE_DIAGRAM, "outputType": "SVG" }),
    );
    let response = app.router.clone().oneshot(render).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Server is in great condition");
    assert_eq!(json["data"]["tracked_artifacts"], 1);
    assert_eq!(json["data"]["memory_entries"], 1);
}

// ============================================================================
// TEXT RENDERING
// ============================================================================

#[tokio::test]
async fn test_text_generate_returns_svg_bytes() {
    let app = app();
    let response = app
        .router
        .oneshot(json_request(
            "/api/plantuml/text/generate",
            serde_json::json!({ "text": SAMPLE_DIAGRAM, "outputType": "svg" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response).as_deref(), Some("image/svg+xml"));
    let body = body_bytes(response).await;
    assert_eq!(
        body,
        CountingRenderer::expected_bytes(SAMPLE_DIAGRAM, OutputFormat::Svg).to_vec()
    );
}

#[tokio::test]
async fn test_text_generate_defaults_to_png_and_caches() {
    let app = app();
    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "/api/plantuml/text/generate",
                serde_json::json!({ "text": SAMPLE_DIAGRAM }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("image/png"));
    }
    assert_eq!(app.renderer.calls(), 1);
}

#[tokio::test]
async fn test_text_generate_validation_errors() {
    let cases = [
        (serde_json::json!({ "text": "   " }), "MISSING_FIELD"),
        (serde_json::json!({}), "MISSING_FIELD"),
        (
            serde_json::json!({ "text": SAMPLE_DIAGRAM, "outputType": "GIF" }),
            "INVALID_FORMAT",
        ),
    ];

    for (body, code) in cases {
        let app = app();
        let response = app
            .router
            .oneshot(json_request("/api/plantuml/text/generate", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], code);
        assert_eq!(app.renderer.calls(), 0);
    }
}

#[tokio::test]
async fn test_syntax_error_maps_to_bad_request_with_engine_output() {
    let app = app_with(
        CountingRenderer::new().failing(RenderError::Syntax {
            message: "Syntax Error? (line 2)".to_string(),
        }),
        4096,
    );
    let response = app
        .router
        .oneshot(json_request(
            "/api/plantuml/text/generate",
            serde_json::json!({ "text": "@startuml\nA->\n@enduml" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "RENDER_FAILED");
    assert_eq!(json["details"]["engine_output"], "Syntax Error? (line 2)");
}

#[tokio::test]
async fn test_missing_engine_maps_to_service_unavailable() {
    let app = app_with(
        CountingRenderer::new().failing(RenderError::Unavailable {
            reason: "plantuml not found".to_string(),
        }),
        4096,
    );
    let response = app
        .router
        .oneshot(json_request(
            "/api/plantuml/text/generate",
            serde_json::json!({ "text": SAMPLE_DIAGRAM }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// FILE RENDERING
// ============================================================================

#[tokio::test]
async fn test_file_generate_renders_upload() {
    let app = app();
    let response = app
        .router
        .oneshot(multipart_request(
            Some(("text/plain", SAMPLE_DIAGRAM.as_bytes())),
            Some("SVG"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response).as_deref(), Some("image/svg+xml"));
    assert_eq!(app.renderer.calls_for(SAMPLE_DIAGRAM), 1);
}

#[tokio::test]
async fn test_file_and_text_share_one_artifact() {
    let app = app();
    let text = app
        .router
        .clone()
        .oneshot(json_request(
            "/api/plantuml/text/generate",
            serde_json::json!({ "text": SAMPLE_DIAGRAM, "outputType": "PNG" }),
        ))
        .await
        .expect("response");
    assert_eq!(text.status(), StatusCode::OK);

    let file = app
        .router
        .oneshot(multipart_request(
            Some(("application/x-plantuml", SAMPLE_DIAGRAM.as_bytes())),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(file.status(), StatusCode::OK);
    assert_eq!(app.renderer.calls(), 1);
}

#[tokio::test]
async fn test_file_generate_rejections() {
    let oversized = vec![b'a'; 5000];
    let cases: Vec<(Request<Body>, StatusCode)> = vec![
        (multipart_request(None, Some("PNG")), StatusCode::BAD_REQUEST),
        (
            multipart_request(Some(("text/plain", &b""[..])), None),
            StatusCode::BAD_REQUEST,
        ),
        (
            multipart_request(Some(("image/png", SAMPLE_DIAGRAM.as_bytes())), None),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ),
        (
            multipart_request(Some(("text/plain", oversized.as_slice())), None),
            StatusCode::PAYLOAD_TOO_LARGE,
        ),
        (
            multipart_request(Some(("text/plain", SAMPLE_DIAGRAM.as_bytes())), Some("jpeg")),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (request, expected) in cases {
        let app = app();
        let response = app.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), expected);
        assert_eq!(app.renderer.calls(), 0);
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[tokio::test]
async fn test_metrics_endpoint_exposes_render_counters() {
    let app = app();
    let render = json_request(
        "/api/plantuml/text/generate",
        serde_json::json!({ "text": SAMPLE_DIAGRAM }),
    );
    app.router.clone().oneshot(render).await.expect("response");

    let response = app
        .router
        .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response).await).expect("utf8");
    assert!(text.contains("puml_renders_total"));
    assert!(text.contains("puml_http_requests_total"));
}
