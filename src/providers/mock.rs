/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a short summary
 * - `MockProvider::failing(error)` - Always fails with the given error
 * - `MockProvider::flaky(n, error)` - Fails `n` times, then succeeds
 * - `MockProvider::empty()` - Returns completions that sanitize to nothing
 *
 * Every prompt is recorded so tests can assert on call counts and ordering.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{GenerationOptions, LlmProvider};

/// Computes a completion from a prompt
pub type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Computes a per-call delay in milliseconds from a prompt
pub type DelayFn = Arc<dyn Fn(&str) -> u64 + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with the given error
    Failing(ProviderError),
    /// Fails the first `failures` calls, then succeeds
    Flaky { failures: usize, error: ProviderError },
    /// Returns only reasoning, which sanitizes to nothing
    Empty,
}

/// Mock provider for testing summarization behavior
#[derive(Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every prompt received, in arrival order
    prompts: Arc<Mutex<Vec<String>>>,
    /// Custom response generator
    responder: Option<Responder>,
    /// Custom delay generator
    delay: Option<DelayFn>,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .field("custom_responder", &self.responder.is_some())
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            responder: None,
            delay: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Create a provider that fails `failures` times before succeeding
    pub fn flaky(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::Flaky { failures, error })
    }

    /// Create a mock whose completions are empty after sanitizing
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Delay each call by a prompt-dependent number of milliseconds
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&str) -> u64 + Send + Sync + 'static,
    {
        self.delay = Some(Arc::new(delay));
        self
    }

    /// Number of `generate` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Default completion: short and independent of the prompt size
    pub fn default_response(prompt: &str) -> String {
        format!("Mock summary of {} characters.", prompt.chars().count())
    }

    fn respond(&self, prompt: &str) -> String {
        match &self.responder {
            Some(responder) => responder(prompt),
            None => Self::default_response(prompt),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let Some(delay) = &self.delay {
            let ms = delay(prompt);
            if ms > 0 {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }

        match &self.behavior {
            MockBehavior::Working => Ok(self.respond(prompt)),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Flaky { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(self.respond(prompt))
                }
            }
            MockBehavior::Empty => Ok("<think>I have nothing to add.</think>\n".to_string()),
        }
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
