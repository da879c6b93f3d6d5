//! Planning provider seam.
//!
//! Pure request/response types and the provider trait. Prompt construction,
//! parsing and concrete HTTP providers live in agentdesk-llm.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One text-completion request to the planning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub request_id: Uuid,
    /// Instruction framing (system prompt where the provider supports one).
    pub system: Option<String>,
    /// The full instruction including the serialized context.
    pub prompt: String,
    pub max_tokens: i32,
    pub temperature: Option<f32>,
}

/// Raw text returned by the planning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningResponse {
    pub request_id: Uuid,
    pub text: String,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

/// External generative-text planning service.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PlanningProvider: Send + Sync {
    /// Identifier used in logs (e.g. "anthropic").
    fn provider_id(&self) -> &str;

    /// Model identifier used for completions.
    fn model_id(&self) -> &str;

    /// Submit one completion and return the raw response text.
    async fn complete(&self, request: PlanningRequest) -> Result<PlanningResponse, ProviderError>;
}
