//! Integration tests for the Claude-backed scoring client
//!
//! Test coverage:
//! - Tool-call and text responses parsed into a validated result
//! - Request shape: forced tool, image block, user attribution
//! - Error classification: transport, malformed, unknown

mod common;

use mockito::{Matcher, Server};
use serde_json::json;

use common::{catalog, png, user};
use promptcraft::domain::error::ScoringError;
use promptcraft::domain::models::{EncodedImage, ScoringConfig};
use promptcraft::domain::ports::ScoringClient;
use promptcraft::infrastructure::claude::{ClaudeClient, ClaudeClientConfig, ClaudeScoringClient};

fn create_scorer(base_url: String) -> ClaudeScoringClient {
    let config = ClaudeClientConfig {
        api_key: "test-api-key".to_string(),
        base_url,
        timeout_secs: 5,
        requests_per_second: 0.0,
    };
    let client = ClaudeClient::new(config).expect("Failed to create client");
    ClaudeScoringClient::new(client, &ScoringConfig::default())
}

fn composite() -> EncodedImage {
    EncodedImage::from_bytes("image/png", &png(8, 4, [10, 20, 30]))
}

fn tool_response(input: serde_json::Value) -> String {
    json!({
        "id": "msg_01ABC123",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{
            "type": "tool_use",
            "id": "toolu_01",
            "name": "record_analysis",
            "input": input
        }],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 1200, "output_tokens": 40}
    })
    .to_string()
}

async fn score_with(server: &Server) -> Result<promptcraft::AnalysisResult, ScoringError> {
    let catalog = catalog();
    create_scorer(server.url())
        .score(&user(), catalog.first(), &composite(), "a blue square")
        .await
}

#[tokio::test]
async fn test_score_success_with_mock() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-api-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "tool_choice": {"type": "tool", "name": "record_analysis"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tool_response(json!({
            "similarityScore": 81.5,
            "feedback": ["warmer light", "lower horizon"]
        })))
        .create_async()
        .await;

    let result = score_with(&server).await.expect("score");

    mock.assert_async().await;
    assert!((result.similarity_score - 81.5).abs() < f64::EPSILON);
    assert_eq!(result.feedback, vec!["warmer light", "lower horizon"]);
}

#[tokio::test]
async fn test_request_carries_image_and_user() {
    let mut server = Server::new_async().await;
    let user = user();
    let mock = server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"metadata": {"user_id": user.id.to_string()}})),
            Matcher::Regex(r#""media_type":"image/png""#.to_string()),
            Matcher::Regex("a blue square".to_string()),
        ]))
        .with_status(200)
        .with_body(tool_response(json!({"similarityScore": 10, "feedback": []})))
        .create_async()
        .await;

    let catalog = catalog();
    create_scorer(server.url())
        .score(&user, catalog.first(), &composite(), "a blue square")
        .await
        .expect("score");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_wrong_score_type_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(tool_response(json!({"similarityScore": "high", "feedback": []})))
        .create_async()
        .await;

    assert!(matches!(
        score_with(&server).await,
        Err(ScoringError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_too_much_feedback_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(tool_response(json!({
            "similarityScore": 50,
            "feedback": ["a", "b", "c", "d"]
        })))
        .create_async()
        .await;

    assert!(matches!(
        score_with(&server).await,
        Err(ScoringError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    assert!(matches!(
        score_with(&server).await,
        Err(ScoringError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_overloaded_and_server_errors_are_transport() {
    for status in [500, 529, 429] {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(status)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
            .expect(1)
            .create_async()
            .await;

        let result = score_with(&server).await;

        // Never retried
        mock.assert_async().await;
        assert!(
            matches!(result, Err(ScoringError::Transport(_))),
            "status {status} should be transport"
        );
    }
}

#[tokio::test]
async fn test_bad_request_is_unknown() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(400)
        .with_body(r#"{"type":"error","error":{"type":"invalid_request_error"}}"#)
        .create_async()
        .await;

    assert!(matches!(
        score_with(&server).await,
        Err(ScoringError::Unknown { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_oracle_is_transport() {
    let catalog = catalog();
    let result = create_scorer("http://127.0.0.1:1".to_string())
        .score(&user(), catalog.first(), &composite(), "prompt")
        .await;

    assert!(matches!(result, Err(ScoringError::Transport(_))));
}
