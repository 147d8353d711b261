//! Integration tests for the OpenAI-compatible image generator
//!
//! Test coverage:
//! - Successful generation decoded from `b64_json`
//! - Retry with backoff on transient failures (5xx)
//! - No retry on rejected requests (4xx)
//! - Malformed payloads

mod common;

use mockito::{Matcher, Server};
use serde_json::json;

use common::{catalog, png};
use promptcraft::domain::error::GenerationError;
use promptcraft::domain::models::{EncodedImage, GenerationConfig};
use promptcraft::domain::ports::ImageGenerator;
use promptcraft::adapters::generation::OpenAiImageGenerator;

fn create_generator(base_url: String, max_retries: u32) -> OpenAiImageGenerator {
    OpenAiImageGenerator::new(GenerationConfig {
        base_url,
        api_key: Some("test-openai-key".to_string()),
        timeout_secs: 5,
        max_retries,
        initial_backoff_ms: 5,
        max_backoff_ms: 20,
        ..GenerationConfig::default()
    })
    .expect("Failed to create generator")
}

fn image_body() -> String {
    let encoded = EncodedImage::from_bytes("image/png", &png(2, 2, [1, 2, 3]));
    json!({"created": 1, "data": [{"b64_json": encoded.data}]}).to_string()
}

async fn generate(generator: &OpenAiImageGenerator) -> Result<EncodedImage, GenerationError> {
    let catalog = catalog();
    generator.generate(catalog.first(), "a tiny square").await
}

#[tokio::test]
async fn test_generate_success_with_mock() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/images/generations")
        .match_header("authorization", "Bearer test-openai-key")
        .match_body(Matcher::PartialJson(json!({
            "prompt": "a tiny square",
            "n": 1,
            "response_format": "b64_json"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(image_body())
        .create_async()
        .await;

    let image = generate(&create_generator(server.url(), 0)).await.expect("generate");

    mock.assert_async().await;
    assert_eq!(image.media_type, "image/png");
    assert_eq!(image.decode_bytes().unwrap(), png(2, 2, [1, 2, 3]));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mut server = Server::new_async().await;
    // Matched first until its single expected hit is used up
    let failing = server
        .mock("POST", "/images/generations")
        .with_status(503)
        .with_body("busy")
        .expect(1)
        .create_async()
        .await;
    let succeeding = server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(image_body())
        .expect(1)
        .create_async()
        .await;

    let image = generate(&create_generator(server.url(), 2))
        .await
        .expect("generate after retry");

    failing.assert_async().await;
    succeeding.assert_async().await;
    assert_eq!(image.media_type, "image/png");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/images/generations")
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create_async()
        .await;

    let result = generate(&create_generator(server.url(), 2)).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(GenerationError::Rejected { status: 500, .. })));
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/images/generations")
        .with_status(400)
        .with_body(r#"{"error":{"message":"content policy violation"}}"#)
        .expect(1)
        .create_async()
        .await;

    let result = generate(&create_generator(server.url(), 3)).await;

    mock.assert_async().await;
    match result {
        Err(GenerationError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("content policy"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_image_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"created": 1, "data": [{"url": "https://example.com/x.png"}]}"#)
        .create_async()
        .await;

    assert!(matches!(
        generate(&create_generator(server.url(), 0)).await,
        Err(GenerationError::MalformedResponse(_))
    ));
}
