//! Model provider client
//!
//! **[REC-INT-020]** OpenAI-compatible chat-completions client with rate
//! limiting. All model calls go through the `RequestQueue`; nothing in the
//! pipeline calls `complete()` directly.

use super::{map_status, map_transport_error, parse_retry_after, ProviderError};
use async_trait::async_trait;
use roam_common::config::ModelConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = "roam-rec/0.1.0 (https://github.com/roam/roam)";

/// A single model completion request
///
/// The expected output schema is described in the system prompt; callers
/// validate the returned text against their own strict serde types.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    /// Short label for logging (e.g. "intent", "curation")
    pub purpose: &'static str,
}

/// Raw model completion output
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
}

/// Capability interface for the language model
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError>;

    fn provider_id(&self) -> &'static str;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP model client
pub struct HttpModelClient {
    http_client: reqwest::Client,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
    base_url: String,
    api_key: String,
    model: String,
    default_max_tokens: u32,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let rps = config.requests_per_second.max(1);
        // Safe: max(1) above guarantees non-zero
        let quota = governor::Quota::per_second(std::num::NonZeroU32::new(rps).unwrap());
        let rate_limiter = governor::RateLimiter::direct(quota);

        Ok(Self {
            http_client,
            rate_limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            default_max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ModelProvider for HttpModelClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        // Client-side quota; the queue handles provider-side throttling
        self.rate_limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: if request.max_tokens > 0 {
                request.max_tokens
            } else {
                self.default_max_tokens
            },
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        tracing::debug!(purpose = request.purpose, url = %url, "Querying model provider");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            return Err(map_status(status.as_u16(), retry_after));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Validation(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Validation("completion has no content".to_string()))?;

        tracing::debug!(
            purpose = request.purpose,
            content_len = content.len(),
            "Model completion received"
        );

        Ok(ModelResponse { content })
    }

    fn provider_id(&self) -> &'static str {
        "model"
    }
}
