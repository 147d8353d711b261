//! Claude-backed scoring oracle.
//!
//! The output schema travels as a forced tool call: the model must answer
//! by calling `record_analysis` with a `{similarityScore, feedback}` object.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::ClaudeClient;
use super::types::{
    ContentBlock, ImageSource, Message, MessageRequest, MessageResponse, Metadata, Tool,
    ToolChoice,
};
use crate::domain::error::ScoringError;
use crate::domain::models::{AnalysisResult, Challenge, EncodedImage, ScoringConfig, User};
use crate::domain::ports::ScoringClient;

/// Name of the forced tool carrying the analysis.
pub const ANALYSIS_TOOL_NAME: &str = "record_analysis";

const SYSTEM_INSTRUCTION: &str = "You are a meticulous art director grading prompt-engineering \
exercises. You receive one image split down the middle: the TARGET image is on the left and the \
image GENERATED from the student's prompt is on the right. Judge how closely the generated image \
matches the target in subject, composition, color palette, lighting and style. Give a similarity \
score from 0 (unrelated) to 100 (indistinguishable) and at most three short, concrete suggestions \
for changing the prompt to get closer to the target. Always answer by calling the record_analysis \
tool.";

pub struct ClaudeScoringClient {
    client: ClaudeClient,
    model: String,
    max_tokens: u32,
}

impl ClaudeScoringClient {
    pub fn new(client: ClaudeClient, config: &ScoringConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Build the Messages API request for one scoring call.
    pub fn build_request(
        &self,
        user: &User,
        challenge: &Challenge,
        composite: &EncodedImage,
        user_prompt: &str,
    ) -> MessageRequest {
        let text = format!(
            "Challenge: {}\nGoal: {}\nSubmitted prompt: {}\n\n\
             Left half: target. Right half: generated from the submitted prompt.",
            challenge.name, challenge.description, user_prompt
        );

        MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            messages: vec![Message::user(vec![
                ContentBlock::Image {
                    source: ImageSource::Base64 {
                        media_type: composite.media_type.clone(),
                        data: composite.data.clone(),
                    },
                },
                ContentBlock::Text { text },
            ])],
            tools: Some(vec![Tool {
                name: ANALYSIS_TOOL_NAME.to_string(),
                description: "Record the similarity score and prompt feedback for this attempt"
                    .to_string(),
                input_schema: AnalysisResult::output_schema(),
            }]),
            tool_choice: Some(ToolChoice::Tool {
                name: ANALYSIS_TOOL_NAME.to_string(),
            }),
            metadata: Some(Metadata {
                user_id: user.id.to_string(),
            }),
            temperature: None,
        }
    }
}

/// Pull a validated result out of a response.
///
/// The forced tool call is preferred; a JSON object in the first text
/// block is accepted when no tool call is present.
pub fn extract_analysis(response: &MessageResponse) -> Result<AnalysisResult, ScoringError> {
    if let Some(input) = response.tool_input(ANALYSIS_TOOL_NAME) {
        return AnalysisResult::from_oracle_value(input);
    }

    let text = response.first_text().ok_or_else(|| {
        ScoringError::MalformedResponse(format!(
            "response contained neither a {ANALYSIS_TOOL_NAME} call nor text"
        ))
    })?;

    let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        ScoringError::MalformedResponse(format!("text response is not JSON: {e}"))
    })?;
    AnalysisResult::from_oracle_value(&value)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

#[async_trait]
impl ScoringClient for ClaudeScoringClient {
    #[instrument(
        name = "score",
        skip(self, user, challenge, composite, user_prompt),
        fields(challenge_id = %challenge.id, model = %self.model, image_bytes = composite.data.len())
    )]
    async fn score(
        &self,
        user: &User,
        challenge: &Challenge,
        composite: &EncodedImage,
        user_prompt: &str,
    ) -> Result<AnalysisResult, ScoringError> {
        let request = self.build_request(user, challenge, composite, user_prompt);
        let response = self.client.send_message(&request).await?;

        let result = extract_analysis(&response)?;
        debug!(score = result.similarity_score, feedback = result.feedback.len(), "analysis received");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(content: Value) -> MessageResponse {
        serde_json::from_value(json!({ "content": content })).unwrap()
    }

    #[test]
    fn test_extract_from_tool_call() {
        let r = response(json!([
            {"type": "tool_use", "id": "t", "name": "record_analysis",
             "input": {"similarityScore": 72, "feedback": ["more fog"]}}
        ]));
        let result = extract_analysis(&r).unwrap();
        assert!((result.similarity_score - 72.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extract_from_fenced_text() {
        let r = response(json!([
            {"type": "text", "text": "```json\n{\"similarityScore\": 10, \"feedback\": []}\n```"}
        ]));
        assert!(extract_analysis(&r).is_ok());
    }

    #[test]
    fn test_wrong_type_in_tool_call_is_malformed() {
        let r = response(json!([
            {"type": "tool_use", "id": "t", "name": "record_analysis",
             "input": {"similarityScore": "high", "feedback": []}}
        ]));
        assert!(matches!(extract_analysis(&r), Err(ScoringError::MalformedResponse(_))));
    }

    #[test]
    fn test_empty_content_is_malformed() {
        assert!(matches!(
            extract_analysis(&response(json!([]))),
            Err(ScoringError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_prose_is_malformed() {
        let r = response(json!([{"type": "text", "text": "Looks pretty close!"}]));
        assert!(matches!(extract_analysis(&r), Err(ScoringError::MalformedResponse(_))));
    }
}
