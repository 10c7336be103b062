// HTTP boundary tests against the scripted mock engine

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use printworks_core::mock::{MockBehavior, MockFactory, MOCK_PDF};
use printworks_core::{Printer, RenderSettings};
use printworks_pool::{Pool, PoolConfig};
use printworks_server::{build_app, ApiKeys};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    factory: MockFactory,
    pool: Pool<MockFactory>,
}

fn app_with(factory: MockFactory, keys: ApiKeys, prefix: &str) -> TestApp {
    let pool = Pool::new(
        factory.clone(),
        PoolConfig::default()
            .with_max_workers(1)
            .with_acquire_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let printer = Printer::new(
        pool.clone(),
        RenderSettings::default()
            .with_ready_timeout(Duration::from_millis(200))
            .with_export_timeout(Duration::from_millis(200)),
    );
    TestApp {
        router: build_app(Arc::new(printer), keys, prefix),
        factory,
        pool,
    }
}

fn app(keys: ApiKeys) -> TestApp {
    app_with(MockFactory::new(), keys, "")
}

fn generate_request(body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_generate_returns_pdf_with_headers() {
    let app = app(ApiKeys::disabled());
    let body = json!({ "html": "<h1>hello</h1>", "filename": "hello.pdf" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        MOCK_PDF.len().to_string().as_str()
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"hello.pdf\""
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(app.pool.stats().busy, 0);
}

#[tokio::test]
async fn test_generate_without_filename_has_no_disposition() {
    let app = app(ApiKeys::disabled());
    let body = json!({ "content": "<p>x</p>" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
}

#[tokio::test]
async fn test_filename_quotes_are_stripped() {
    let app = app(ApiKeys::disabled());
    let body = json!({ "html": "<p>x</p>", "filename": "a\"b\r\n.pdf" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"ab.pdf\""
    );
}

#[tokio::test]
async fn test_empty_content_is_400_regardless_of_credentials() {
    for token in [None, Some("wrong"), Some("secret")] {
        let app = app(ApiKeys::new(["secret"]));
        let response = app
            .router
            .oneshot(generate_request(r#"{"html": ""}"#, token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "token {:?}", token);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "validation");
        assert_eq!(app.factory.engines_created(), 0);
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app(ApiKeys::new(["secret"]));

    let response = app
        .router
        .oneshot(generate_request("{not json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "validation");
}

#[tokio::test]
async fn test_invalid_options_are_400() {
    let app = app(ApiKeys::disabled());

    for options in [json!({ "scale": 5.0 }), json!({ "format": "Napkin" })] {
        let body = json!({ "html": "<p>x</p>", "options": options }).to_string();
        let response = app
            .router
            .clone()
            .oneshot(generate_request(&body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_auth_allow_list() {
    let app = app(ApiKeys::new(["secret", "other"]));
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .router
        .clone()
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["kind"], "auth");

    let response = app
        .router
        .clone()
        .oneshot(generate_request(&body, Some("nope")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .oneshot(generate_request(&body, Some("other")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_engine_failure_is_502_and_worker_retired() {
    let app = app_with(
        MockFactory::new().with_behavior(MockBehavior::Malformed),
        ApiKeys::disabled(),
        "",
    );
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["kind"], "engine");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.factory.engines_destroyed(), 1);
}

#[tokio::test]
async fn test_render_timeout_is_504() {
    let app = app_with(
        MockFactory::new().with_behavior(MockBehavior::HangExport),
        ApiKeys::disabled(),
        "",
    );
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["kind"], "timeout");
}

#[tokio::test]
async fn test_draining_pool_is_503() {
    let app = app(ApiKeys::disabled());
    app.pool.drain().await.unwrap();
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .router
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["kind"], "unavailable");
}

#[tokio::test]
async fn test_health_ok() {
    let app = app(ApiKeys::new(["secret"]));

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["render"]["status"], "ok");
    assert_eq!(app.pool.live_workers(), 1);
    assert_eq!(app.pool.stats().busy, 0);
}

#[tokio::test]
async fn test_health_degraded_is_503() {
    let factory = MockFactory::new();
    factory.set_fail_launch(true);
    let app = app_with(factory, ApiKeys::disabled(), "");

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["engine"]["status"], "degraded");
}

#[tokio::test]
async fn test_prefix_applies_to_generate_only() {
    let app = app_with(MockFactory::new(), ApiKeys::disabled(), "/api");
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(generate_request(&body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = app(ApiKeys::disabled());

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api-doc/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/generate"].is_object());
}
