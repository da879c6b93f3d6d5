//! OpenAI planning provider implementation

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message, ResponseFormat};
use crate::providers::invalid_response;
use agentdesk_core::{PlanningProvider, PlanningRequest, PlanningResponse, ProviderError};
use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

/// OpenAI planning provider using chat completion models in JSON mode.
#[derive(Debug)]
pub struct OpenAIPlanningProvider {
    client: OpenAIClient,
    model: String,
}

impl OpenAIPlanningProvider {
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o-mini")
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_client(OpenAIClient::new(api_key, 60), model)
    }

    pub fn with_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn into_response(
        &self,
        request_id: Uuid,
        response: CompletionResponse,
    ) -> Result<PlanningResponse, ProviderError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| invalid_response("openai", "response contained no choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!(
                request_id = %request_id,
                model = %self.model,
                "Planning response truncated at max_tokens"
            );
        }

        let text = choice
            .message
            .content
            .ok_or_else(|| invalid_response("openai", "choice message had no content"))?;

        Ok(PlanningResponse {
            request_id,
            text,
            input_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: response.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }
}

#[async_trait]
impl PlanningProvider for OpenAIPlanningProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: PlanningRequest) -> Result<PlanningResponse, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: Some(system),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: Some(request.prompt),
        });

        let body = CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            response_format: Some(ResponseFormat::json_object()),
        };

        let response: CompletionResponse = self.client.request("chat/completions", body).await?;
        self.into_response(request.request_id, response)
    }
}
