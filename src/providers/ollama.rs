use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::providers::{GenerationOptions, LlmProvider, RateLimiter, truncate_for_log, validate_endpoint};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name to use for generation
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Optional rate limiter
    rate_limiter: Option<RateLimiter>,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Model parameters for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: &GenerationOptions) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: options.system_prompt.clone(),
            options: Some(ModelOptions {
                temperature: Some(options.temperature),
                num_predict: Some(options.max_tokens),
            }),
            stream: Some(false),
        }
    }
}

impl Ollama {
    /// Create a client from provider settings
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.effective_endpoint().trim_end_matches('/').to_string(),
            model: config.effective_model(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            rate_limiter: RateLimiter::per_minute(config.rate_limit),
        }
    }

    /// Send a generation request
    pub async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let url = format!("{}/api/generate", self.base_url);
        let response = self.client.post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to send request to Ollama API: {}", e)))?;

        let status = response.status();
        let response_text = response.text().await
            .map_err(|e| ProviderError::Transport(format!("Failed to read Ollama API response: {}", e)))?;

        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, truncate_for_log(&response_text, 500));
            return Err(ProviderError::from_status(status.as_u16(), response_text));
        }

        parse_generation_response(&response_text)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await?
            .json()
            .await?;

        response["version"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting a single object or a JSONL stream
pub fn parse_generation_response(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(parsed);
    }

    // Some servers stream even when asked not to: concatenate the pieces
    let mut full_response = String::new();
    let mut last: Option<serde_json::Value> = None;
    for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                full_response.push_str(part);
            }
            last = Some(value);
        }
    }

    match last {
        Some(value) => {
            debug!("Parsed streamed Ollama response ({} chars)", full_response.chars().count());
            Ok(GenerationResponse {
                model: value.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                response: full_response,
                done: value.get("done").and_then(|v| v.as_bool()).unwrap_or(true),
                prompt_eval_count: value.get("prompt_eval_count").and_then(|v| v.as_u64()),
                eval_count: value.get("eval_count").and_then(|v| v.as_u64()),
            })
        }
        None => Err(ProviderError::InvalidResponse(format!(
            "Failed to parse Ollama API response: {}",
            truncate_for_log(response_text, 200)
        ))),
    }
}

#[async_trait]
impl LlmProvider for Ollama {
    fn id(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(&self.model, prompt, options);
        let response = self.complete(&request).await?;
        debug!(
            "Ollama {} completed: {:?} prompt tokens, {:?} completion tokens",
            response.model, response.prompt_eval_count, response.eval_count
        );
        Ok(response.response)
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        validate_endpoint(&self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("Ollama model must not be empty".to_string()));
        }
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.validate_config()?;
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }
}
