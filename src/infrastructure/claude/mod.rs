pub mod client;
pub mod errors;
pub mod scoring;
pub mod types;

pub use client::{redact, ClaudeClient, ClaudeClientConfig};
pub use errors::ClaudeApiError;
pub use scoring::{extract_analysis, ClaudeScoringClient, ANALYSIS_TOOL_NAME};
pub use types::{
    ContentBlock, ImageSource, Message, MessageContent, MessageRequest, MessageResponse, Metadata,
    Tool, ToolChoice, Usage,
};
