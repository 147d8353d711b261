//! Scoring oracle result and its boundary schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::error::ScoringError;

/// Maximum number of feedback items an oracle may return.
pub const MAX_FEEDBACK_ITEMS: usize = 3;

/// Inclusive bounds of a similarity score.
pub const MIN_SIMILARITY_SCORE: f64 = 0.0;
pub const MAX_SIMILARITY_SCORE: f64 = 100.0;

/// Validated outcome of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Similarity between target and candidate, 0-100 inclusive
    pub similarity_score: f64,

    /// Ordered improvement suggestions, at most three
    pub feedback: Vec<String>,
}

impl AnalysisResult {
    pub fn new(similarity_score: f64, feedback: Vec<String>) -> Result<Self, ScoringError> {
        if !similarity_score.is_finite()
            || !(MIN_SIMILARITY_SCORE..=MAX_SIMILARITY_SCORE).contains(&similarity_score)
        {
            return Err(ScoringError::MalformedResponse(format!(
                "similarityScore {similarity_score} is outside {MIN_SIMILARITY_SCORE}-{MAX_SIMILARITY_SCORE}"
            )));
        }

        if feedback.len() > MAX_FEEDBACK_ITEMS {
            return Err(ScoringError::MalformedResponse(format!(
                "feedback has {} items, at most {MAX_FEEDBACK_ITEMS} allowed",
                feedback.len()
            )));
        }

        Ok(Self {
            similarity_score,
            feedback,
        })
    }

    /// Validate a raw oracle payload against the output schema.
    ///
    /// Anything short of a complete, well-typed object is rejected; fields
    /// are never partially accepted.
    pub fn from_oracle_value(value: &Value) -> Result<Self, ScoringError> {
        let object = value.as_object().ok_or_else(|| {
            ScoringError::MalformedResponse(format!("expected an object, got {}", kind(value)))
        })?;

        let similarity_score = match object.get("similarityScore") {
            Some(Value::Number(number)) => number.as_f64().ok_or_else(|| {
                ScoringError::MalformedResponse("similarityScore is not representable".to_string())
            })?,
            Some(other) => {
                return Err(ScoringError::MalformedResponse(format!(
                    "similarityScore must be a number, got {}",
                    kind(other)
                )))
            }
            None => {
                return Err(ScoringError::MalformedResponse(
                    "missing required field similarityScore".to_string(),
                ))
            }
        };

        let feedback = match object.get("feedback") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        ScoringError::MalformedResponse(format!(
                            "feedback[{index}] must be a string, got {}",
                            kind(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ScoringError::MalformedResponse(format!(
                    "feedback must be an array, got {}",
                    kind(other)
                )))
            }
            None => {
                return Err(ScoringError::MalformedResponse(
                    "missing required field feedback".to_string(),
                ))
            }
        };

        Self::new(similarity_score, feedback)
    }

    /// JSON schema the oracle output must satisfy.
    pub fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "similarityScore": {
                    "type": "number",
                    "minimum": MIN_SIMILARITY_SCORE,
                    "maximum": MAX_SIMILARITY_SCORE,
                    "description": "How closely the generated image (right) matches the target image (left), 0-100"
                },
                "feedback": {
                    "type": "array",
                    "items": { "type": "string" },
                    "maxItems": MAX_FEEDBACK_ITEMS,
                    "description": "Up to three concrete suggestions for improving the prompt"
                }
            },
            "required": ["similarityScore", "feedback"]
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
