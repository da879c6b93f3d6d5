//! Planning provider implementations
//!
//! Concrete `PlanningProvider` implementations for hosted generative-text
//! services. API keys are server-side secrets supplied by the caller; no key
//! is ever embedded here.

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicClient, AnthropicPlanningProvider};
pub use openai::{OpenAIClient, OpenAIPlanningProvider};

use agentdesk_core::ProviderError;

pub(crate) fn request_failed(
    provider: &str,
    status: i32,
    message: impl Into<String>,
) -> ProviderError {
    ProviderError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    }
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> ProviderError {
    ProviderError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    }
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> ProviderError {
    ProviderError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

/// Map a non-2xx provider reply onto the shared error taxonomy.
pub(crate) fn status_error(
    provider: &str,
    status: reqwest::StatusCode,
    retry_after_ms: i64,
    message: String,
) -> ProviderError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => rate_limited(provider, retry_after_ms),
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            ProviderError::InvalidApiKey {
                provider: provider.to_string(),
            }
        }
        _ => request_failed(provider, status.as_u16() as i32, message),
    }
}

pub(crate) fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

/// Hosted planning service selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
}

/// Connection settings for a hosted planning provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: secrecy::SecretString,
    pub base_url: Option<String>,
    pub requests_per_minute: u32,
}

/// Construct the configured provider behind the trait object the generator uses.
pub fn build_provider(
    settings: ProviderSettings,
) -> std::sync::Arc<dyn agentdesk_core::PlanningProvider> {
    match settings.kind {
        ProviderKind::Anthropic => {
            let mut client = AnthropicClient::new(settings.api_key, settings.requests_per_minute);
            if let Some(base_url) = settings.base_url {
                client = client.with_base_url(base_url);
            }
            std::sync::Arc::new(AnthropicPlanningProvider::with_client(client, settings.model))
        }
        ProviderKind::OpenAI => {
            let mut client = OpenAIClient::new(settings.api_key, settings.requests_per_minute);
            if let Some(base_url) = settings.base_url {
                client = client.with_base_url(base_url);
            }
            std::sync::Arc::new(OpenAIPlanningProvider::with_client(client, settings.model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_retry_after_seconds_to_ms() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(2500));
    }

    #[test]
    fn test_retry_after_missing_or_garbage() {
        assert_eq!(parse_retry_after_ms(&HeaderMap::new()), None);
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error("anthropic", reqwest::StatusCode::TOO_MANY_REQUESTS, 2000, "slow".into()),
            ProviderError::RateLimited {
                provider: "anthropic".to_string(),
                retry_after_ms: 2000,
            }
        );
        for status in [reqwest::StatusCode::UNAUTHORIZED, reqwest::StatusCode::FORBIDDEN] {
            assert_eq!(
                status_error("openai", status, 0, "denied".into()),
                ProviderError::InvalidApiKey {
                    provider: "openai".to_string(),
                }
            );
        }
        assert_eq!(
            status_error("openai", reqwest::StatusCode::BAD_GATEWAY, 0, "upstream".into()),
            ProviderError::RequestFailed {
                provider: "openai".to_string(),
                status: 502,
                message: "upstream".to_string(),
            }
        );
    }

    #[test]
    fn test_provider_kind_parses_lowercase() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAI);
        let kind: ProviderKind = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
    }

    #[test]
    fn test_build_provider_reports_ids() {
        let provider = build_provider(ProviderSettings {
            kind: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: secrecy::SecretString::from("sk-test"),
            base_url: Some("http://localhost:9999/v1/".to_string()),
            requests_per_minute: 10,
        });
        assert_eq!(provider.provider_id(), "openai");
        assert_eq!(provider.model_id(), "gpt-4o-mini");
    }
}
