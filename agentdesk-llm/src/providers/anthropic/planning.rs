//! Anthropic (Claude) planning provider implementation

use super::client::AnthropicClient;
use super::types::{ContentBlock, Message, MessageRequest, MessageResponse};
use crate::providers::invalid_response;
use agentdesk_core::{PlanningProvider, PlanningRequest, PlanningResponse, ProviderError};
use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

/// Anthropic planning provider using Claude models.
#[derive(Debug)]
pub struct AnthropicPlanningProvider {
    client: AnthropicClient,
    model: String,
}

impl AnthropicPlanningProvider {
    /// Create a new Anthropic planning provider.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model name (e.g., "claude-3-5-sonnet-20241022")
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_client(AnthropicClient::new(api_key, 50), model)
    }

    pub fn with_client(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Concatenate the text blocks of a response.
    fn extract_text(content: Vec<ContentBlock>) -> String {
        content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    fn into_response(
        &self,
        request_id: Uuid,
        response: MessageResponse,
    ) -> Result<PlanningResponse, ProviderError> {
        if response.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!(
                request_id = %request_id,
                model = %self.model,
                "Planning response truncated at max_tokens"
            );
        }

        let input_tokens = response.usage.input_tokens;
        let output_tokens = response.usage.output_tokens;
        let text = Self::extract_text(response.content);
        if text.is_empty() {
            return Err(invalid_response("anthropic", "response contained no text blocks"));
        }

        Ok(PlanningResponse {
            request_id,
            text,
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
        })
    }
}

#[async_trait]
impl PlanningProvider for AnthropicPlanningProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: PlanningRequest) -> Result<PlanningResponse, ProviderError> {
        let body = MessageRequest {
            model: self.model.clone(),
            system: request.system,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response: MessageResponse = self.client.request("messages", body).await?;
        self.into_response(request.request_id, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_test_utils::StubServer;

    fn provider(base_url: &str) -> AnthropicPlanningProvider {
        let client = AnthropicClient::new(SecretString::from("sk-test".to_string()), 600)
            .with_base_url(base_url);
        AnthropicPlanningProvider::with_client(client, "claude-test")
    }

    fn request() -> PlanningRequest {
        PlanningRequest {
            request_id: Uuid::now_v7(),
            system: Some("Respond with JSON only.".to_string()),
            prompt: "Plan my week.".to_string(),
            max_tokens: 1024,
            temperature: Some(0.2),
        }
    }

    fn decode(body: &str) -> MessageResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_text_blocks_joined_and_tool_use_skipped() {
        let response = decode(
            r#"{
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": "claude-test",
                "content": [
                    {"type": "text", "text": "{\"weeklyGoal\":"},
                    {"type": "tool_use", "id": "tu_1", "name": "lookup", "input": {}},
                    {"type": "text", "text": "\"Grow\"}"}
                ],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 120, "output_tokens": 30}
            }"#,
        );
        assert!(matches!(response.content[1], ContentBlock::Other));

        let id = Uuid::now_v7();
        let out = provider("http://unused").into_response(id, response).unwrap();
        assert_eq!(out.request_id, id);
        assert_eq!(out.text, r#"{"weeklyGoal":"Grow"}"#);
        assert_eq!(out.input_tokens, Some(120));
        assert_eq!(out.output_tokens, Some(30));
    }

    #[test]
    fn test_tool_use_only_response_is_invalid() {
        let response = decode(
            r#"{
                "id": "msg_02",
                "role": "assistant",
                "model": "claude-test",
                "content": [{"type": "tool_use", "id": "tu_1", "name": "lookup", "input": {}}],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }"#,
        );
        let err = provider("http://unused")
            .into_response(Uuid::now_v7(), response)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_complete_over_http() {
        let server = StubServer::start(vec![StubServer::json(
            200,
            r#"{"id":"msg_03","role":"assistant","model":"claude-test",
                "content":[{"type":"text","text":"{}"}],
                "stop_reason":"max_tokens","usage":{"input_tokens":7,"output_tokens":1}}"#,
        )])
        .await;

        let out = provider(&server.url()).complete(request()).await.unwrap();
        assert_eq!(out.text, "{}");

        let recorded = server.requests();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].request_line.starts_with("POST /messages "));
        assert_eq!(recorded[0].header("x-api-key"), Some("sk-test"));
        let body: serde_json::Value = serde_json::from_str(&recorded[0].body).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["system"], "Respond with JSON only.");
        assert_eq!(body["messages"][0]["content"], "Plan my week.");
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = StubServer::start(vec![StubServer::json(
            429,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        )
        .with_header("retry-after", "2")])
        .await;

        let err = provider(&server.url()).complete(request()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::RateLimited {
                provider: "anthropic".to_string(),
                retry_after_ms: 2000,
            }
        );
    }

    #[tokio::test]
    async fn test_error_statuses_mapped() {
        let server = StubServer::start(vec![
            StubServer::json(
                401,
                r#"{"type":"error","error":{"type":"authentication_error","message":"bad key"}}"#,
            ),
            StubServer::json(
                529,
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            ),
            StubServer::json(500, "upstream exploded"),
        ])
        .await;
        let provider = provider(&server.url());

        assert!(matches!(
            provider.complete(request()).await,
            Err(ProviderError::InvalidApiKey { .. })
        ));
        assert_eq!(
            provider.complete(request()).await.unwrap_err(),
            ProviderError::RequestFailed {
                provider: "anthropic".to_string(),
                status: 529,
                message: "Overloaded".to_string(),
            }
        );
        assert_eq!(
            provider.complete(request()).await.unwrap_err(),
            ProviderError::RequestFailed {
                provider: "anthropic".to_string(),
                status: 500,
                message: "upstream exploded".to_string(),
            }
        );
    }
}
