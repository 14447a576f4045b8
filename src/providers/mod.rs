/*!
 * Provider implementations for the LLM completion capability.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI-compatible: OpenAI, LM Studio and Qwen (DashScope)
 * - Anthropic: Anthropic API integration
 * - Mock: Scriptable provider for tests
 *
 * The summarization pipeline only sees the `LlmProvider` trait; retries and
 * sanitizing live above it.
 */

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod registry;

pub use registry::ProviderRegistry;

/// Sampling settings of one completion call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Optional system prompt
    pub system_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: None,
        }
    }
}

/// Common trait for all LLM providers
///
/// Implementations are shared across concurrent chunk calls, so they must be
/// usable through `&self`.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Registry identifier
    fn id(&self) -> &str;

    /// Model used for completions
    fn model(&self) -> &str;

    /// Complete a single prompt
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The raw completion text or an error
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError>;

    /// Check the settings without any network access
    fn validate_config(&self) -> Result<(), ProviderError>;

    /// Test the connection to the provider with a tiny completion
    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.validate_config()?;
        let options = GenerationOptions {
            max_tokens: 10,
            ..Default::default()
        };
        self.generate("Hello", &options).await.map(|_| ())
    }
}

/// Spaces requests evenly to stay under a requests-per-minute limit
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter for `requests_per_minute`, or None when unlimited
    pub fn per_minute(requests_per_minute: Option<u32>) -> Option<Self> {
        match requests_per_minute {
            Some(rpm) if rpm > 0 => Some(Self {
                min_interval: Duration::from_millis(60_000 / rpm as u64),
                last_request: Mutex::new(None),
            }),
            _ => None,
        }
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limit: waiting {}ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Shorten an error body for messages and logs
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Check that an endpoint is an absolute http(s) URL
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<url::Url, ProviderError> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| ProviderError::InvalidConfig(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProviderError::InvalidConfig(format!(
            "Endpoint '{}' must use http or https, not {}", endpoint, other
        ))),
    }
}
