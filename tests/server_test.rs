use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use openapi_guard::classify::ErrorPayload;
use openapi_guard::server::{AppState, build_router};
use openapi_guard::{ValidatorConfig, loader};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::util::ServiceExt; // for oneshot

const PETSTORE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/petstore.yaml");

fn app_with(config: ValidatorConfig) -> axum::Router {
    let model = loader::load_schema_model(PETSTORE).unwrap();
    build_router(AppState::new(Arc::new(model), config))
}

fn app() -> axum::Router {
    app_with(ValidatorConfig::default())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_payload(response: axum::response::Response) -> ErrorPayload {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_invalid_request_path() {
    let response = app()
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_payload(response).await.code, "ERR10007");
}

#[tokio::test]
async fn test_invalid_method_sets_allow_header() {
    let response = app()
        .oneshot(Request::builder().uri("/v2/pet").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(header::ALLOW).unwrap(), "PUT, POST");
    let payload = error_payload(response).await;
    assert_eq!(payload.code, "ERR10008");
    assert_eq!(payload.allowed_methods, vec!["PUT", "POST"]);
    assert!(payload.violations.is_empty());
}

#[tokio::test]
async fn test_invalid_post() {
    let response = app()
        .oneshot(json_post(
            "/post",
            r#"{"name":"Pinky", "photoUrl": "http://www.photo.com/1.jpg"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_payload(response).await.code, "ERR10007");
}

#[tokio::test]
async fn test_valid_post() {
    let pet = r#"{"id":0,"category":{"id":0,"name":"string"},"name":"doggie","photoUrls":["string"],"tags":[{"id":0,"name":"string"}],"status":"available"}"#;
    let response = app().oneshot(json_post("/v2/pet", pet)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "addPet");
}

#[tokio::test]
async fn test_invalid_ship_date() {
    let response = app()
        .oneshot(json_post("/v2/store/order", r#"{"id":0,"shipDate":"2001-01-0167"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = error_payload(response).await;
    assert_eq!(payload.code, "ERR11004");
    assert_eq!(payload.violations[0].path, "/shipDate");
}

#[tokio::test]
async fn test_get_param() {
    let response = app()
        .oneshot(Request::builder().uri("/v2/pet/111").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "getPetById");
}

#[tokio::test]
async fn test_delete_with_and_without_header() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v2/pet/111")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_payload(response).await.code, "ERR11017");

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v2/pet/111")
                .header("api_key", "special-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "deletePet");
}

#[tokio::test]
async fn test_query_parameters_reach_validator() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v2/pet/findByStatus?status=sold&status=pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "findPetsByStatus");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v2/pet/findByStatus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_payload(response).await.code, "ERR11017");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let config = ValidatorConfig {
        max_body_bytes: 16,
        ..ValidatorConfig::default()
    };
    let response = app_with(config)
        .oneshot(json_post("/v2/pet", r#"{"name":"doggie","photoUrls":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_body_limit_applies_before_routing() {
    let config = ValidatorConfig {
        max_body_bytes: 16,
        ..ValidatorConfig::default()
    };
    let response = app_with(config)
        .oneshot(json_post("/api", r#"{"name":"doggie","photoUrls":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_disabled_validation_passes_through() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "enabled: false").unwrap();
    let config = ValidatorConfig::from_file(file.path()).unwrap();

    let response = app_with(config)
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "unvalidated");
}
