//! OpenRouter Provider
//!
//! LLM gateway using the OpenAI-compatible Chat Completions API.
//! Any compatible endpoint works by changing the base URL.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{
    CompletionRequest, LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::constants::network;
use crate::types::{ErrorCategory, ErrorClassifier, ProviderError, Result, estimate_tokens};

const PROVIDER_NAME: &str = "openrouter";

/// Chat-completions gateway with secure API key handling
pub struct OpenRouterProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenRouterProvider {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                ProviderError::with_provider(
                    ErrorCategory::Unknown,
                    format!("Failed to create HTTP client: {}", e),
                    PROVIDER_NAME,
                )
            })?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_request(request: &CompletionRequest) -> ChatCompletionRequest<'_> {
        ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        debug!(
            model = %request.model,
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let start_time = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, PROVIDER_NAME))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = ErrorClassifier::retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                retry_after,
                &format!("gateway returned {}: {}", status, body),
                PROVIDER_NAME,
            )
            .into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, PROVIDER_NAME))?;

        let elapsed = start_time.elapsed();

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::with_provider(
                    ErrorCategory::ParseError,
                    "No content in completion response",
                    PROVIDER_NAME,
                )
            })?;

        let usage = match body.usage {
            Some(u) => TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage {
                input_tokens: estimate_tokens(&request.prompt),
                output_tokens: estimate_tokens(&content),
            },
        };

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: ResponseMetadata {
                model: body.model.unwrap_or_else(|| request.model.clone()),
                provider: PROVIDER_NAME.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_shape() {
        let request = CompletionRequest::new("openai/gpt-5-pro", "implement login")
            .with_temperature(0.5)
            .with_max_tokens(6000);
        let payload = serde_json::to_value(OpenRouterProvider::build_request(&request)).unwrap();

        assert_eq!(payload["model"], "openai/gpt-5-pro");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "implement login");
        assert_eq!(payload["max_tokens"], 6000);
    }

    #[test]
    fn test_response_parsing_without_usage() {
        let body: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .unwrap();
        assert!(body.usage.is_none());
        assert_eq!(body.choices[0].message.content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenRouterProvider::new(
            "https://openrouter.ai/api/v1/",
            SecretString::from("sk-secret"),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("https://openrouter.ai/api/v1\""));
    }
}
