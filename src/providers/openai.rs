use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;
use crate::providers::{GenerationOptions, LlmProvider, RateLimiter, truncate_for_log, validate_endpoint};

/// Client for OpenAI-compatible chat completion APIs
///
/// Serves OpenAI itself, LM Studio's local server and Qwen through
/// DashScope's compatible mode; they differ only in endpoint, key and model.
#[derive(Debug)]
pub struct OpenAICompatible {
    /// Registry identifier of the backend
    id: String,
    /// HTTP client for API requests
    client: Client,
    /// Base URL, without the `/chat/completions` suffix
    endpoint: String,
    /// API key, may be empty for local servers
    api_key: String,
    /// Model name
    model: String,
    /// Whether an empty key is a configuration error
    requires_api_key: bool,
    /// Optional rate limiter
    rate_limiter: Option<RateLimiter>,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// The model to use
    model: String,
    /// The messages for the conversation
    messages: Vec<ChatMessage>,
    /// Temperature for generation
    temperature: f32,
    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices
    pub choices: Vec<ChatChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Individual choice in a chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Number of completion tokens
    #[serde(default)]
    pub completion_tokens: u64,
}

impl ChatCompletionRequest {
    /// Create a request with a single user message
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: &GenerationOptions) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = &options.system_prompt {
            messages.push(ChatMessage { role: "system".to_string(), content: Some(system.clone()) });
        }
        messages.push(ChatMessage { role: "user".to_string(), content: Some(prompt.into()) });

        Self {
            model: model.into(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

impl OpenAICompatible {
    /// Create a client from provider settings
    pub fn from_config(config: &ProviderConfig) -> Self {
        let kind = config.kind().unwrap_or(ProviderKind::OpenAI);
        Self {
            id: kind.id().to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            endpoint: config.effective_endpoint().trim_end_matches('/').to_string(),
            api_key: config.effective_api_key(),
            model: config.effective_model(),
            requires_api_key: kind.requires_api_key(),
            rate_limiter: RateLimiter::per_minute(config.rate_limit),
        }
    }

    /// Complete a chat request
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let api_url = format!("{}/chat/completions", self.endpoint);
        let mut builder = self.client.post(&api_url)
            .header(header::CONTENT_TYPE, "application/json");
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to send request to {}: {}", api_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.id, status, truncate_for_log(&error_text, 500));
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response.json::<ChatCompletionResponse>().await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse {} response: {}", self.id, e)))
    }

    /// Extract text from a chat completion response
    pub fn extract_text_from_response(response: &ChatCompletionResponse) -> Result<String, ProviderError> {
        response.choices.first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::InvalidResponse("Response contains no message content".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAICompatible {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest::new(&self.model, prompt, options);
        let response = self.complete(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                "{} completed: {} prompt tokens, {} completion tokens",
                self.id, usage.prompt_tokens, usage.completion_tokens
            );
        }
        Self::extract_text_from_response(&response)
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        validate_endpoint(&self.endpoint)?;
        if self.requires_api_key && self.api_key.is_empty() {
            return Err(ProviderError::InvalidConfig(format!("API key is required for {}", self.id)));
        }
        if self.model.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(format!("Model must not be empty for {}", self.id)));
        }
        Ok(())
    }
}
