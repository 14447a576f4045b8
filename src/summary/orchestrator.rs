/*!
 * Chunk-then-reduce summarization.
 *
 * A text that fits one chunk is summarized with a single call. Longer text is
 * chunked, every chunk is summarized concurrently, and the partial summaries
 * are reduced level by level until they fit one request, then combined by a
 * final call. Every completion is sanitized, and retryable failures are
 * retried per call with exponential backoff.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::app_config::SummaryConfig;
use crate::errors::{ProviderError, SummarizeError};
use crate::normalizer::NormalizedText;
use crate::providers::{GenerationOptions, LlmProvider};
use crate::templates::PromptTemplate;

use super::chunker::chunk;
use super::model::{RunOptions, SummaryResult};
use super::prompts::{PARTIAL_SEPARATOR, SummaryPromptBuilder};
use super::sanitizer::sanitize;

/// Receives `(completed, total)` after every finished call of a stage
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Longest backoff exponent, keeps the delay computation from overflowing
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Call and retry settings of the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Maximum concurrent calls per stage
    pub concurrent_requests: usize,
    /// Retries after the first attempt of a call
    pub retry_count: u32,
    /// Base backoff in milliseconds, doubled per retry
    pub retry_backoff_ms: u64,
    /// Maximum reduction passes before giving up
    pub max_reduction_depth: usize,
    /// Sampling settings passed to the provider
    pub generation: GenerationOptions,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&SummaryConfig::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            concurrent_requests: config.concurrent_requests.max(1),
            retry_count: config.retry_count,
            retry_backoff_ms: config.retry_backoff_ms,
            max_reduction_depth: config.max_reduction_depth,
            generation: GenerationOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                system_prompt: None,
            },
        }
    }

    /// Delay before retry `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(1u64 << shift))
    }
}

/// Drives the LLM calls of one summarization
pub struct SummaryOrchestrator {
    provider: Arc<dyn LlmProvider>,
    settings: OrchestratorSettings,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for SummaryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryOrchestrator")
            .field("provider", &self.provider.id())
            .field("settings", &self.settings)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl SummaryOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: OrchestratorSettings) -> Self {
        Self {
            provider,
            settings,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress of every call stage
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Summarize normalized text with a resolved template
    pub async fn summarize(
        &self,
        text: &NormalizedText,
        template: &PromptTemplate,
        options: &RunOptions,
    ) -> Result<SummaryResult, SummarizeError> {
        if text.chars_after > options.max_text_length {
            return Err(SummarizeError::TooLong {
                actual: text.chars_after,
                max: options.max_text_length,
            });
        }
        if text.is_empty() {
            return Err(SummarizeError::EmptyContent);
        }

        let chunks = chunk(&text.text, options.max_chunk_chars);
        if chunks.is_empty() {
            return Err(SummarizeError::EmptyContent);
        }

        let builder = SummaryPromptBuilder::new(template.clone(), &options.language)
            .with_context(options.context.as_deref());
        let calls = AtomicUsize::new(0);

        if chunks.len() == 1 {
            debug!("Summarizing {} chars in a single request", chunks[0].char_len);
            let body = self.call_with_retry(&builder.summary_prompt(&chunks[0].text), &calls).await?;
            return Ok(SummaryResult {
                language: options.language.clone(),
                template: template.id.clone(),
                body: body.clone(),
                partials: vec![body],
                chunk_count: 1,
                reduction_passes: 0,
                llm_calls: calls.into_inner(),
            });
        }

        let total = chunks.len();
        info!("Summarizing {} chunks (max {} chars each)", total, options.max_chunk_chars);
        let prompts = chunks.iter()
            .map(|c| builder.chunk_prompt(&c.text, c.index, total))
            .collect();
        let partials = self.run_calls(prompts, &calls).await?;

        let (reduced, reduction_passes) = self.reduce(&builder, partials.clone(), options.max_chunk_chars, &calls).await?;

        debug!("Combining {} partial summaries", reduced.len());
        let combine_prompt = builder.combine_prompt(&reduced.join(PARTIAL_SEPARATOR));
        let body = self.call_with_retry(&combine_prompt, &calls).await?;

        Ok(SummaryResult {
            language: options.language.clone(),
            template: template.id.clone(),
            body,
            partials,
            chunk_count: total,
            reduction_passes,
            llm_calls: calls.into_inner(),
        })
    }

    /// Condense partials until their joined length fits one request
    async fn reduce(
        &self,
        builder: &SummaryPromptBuilder,
        mut partials: Vec<String>,
        max_chunk_chars: usize,
        calls: &AtomicUsize,
    ) -> Result<(Vec<String>, usize), SummarizeError> {
        let mut pass = 0;

        loop {
            let joined = partials.join(PARTIAL_SEPARATOR);
            let before = joined.chars().count();
            if before <= max_chunk_chars {
                return Ok((partials, pass));
            }

            pass += 1;
            if pass > self.settings.max_reduction_depth {
                warn!("Reduction depth limit of {} reached", self.settings.max_reduction_depth);
                return Err(SummarizeError::ReductionDiverged { pass, before, after: before });
            }

            // Separator lines can fall into a group of their own
            let groups: Vec<String> = chunk(&joined, max_chunk_chars)
                .into_iter()
                .map(|g| g.text.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect();
            info!("Reduction pass {}: {} chars in {} groups", pass, before, groups.len());
            let total = groups.len();
            let prompts = groups.iter()
                .enumerate()
                .map(|(index, group)| builder.reduce_prompt(group, index, total))
                .collect();
            let next = self.run_calls(prompts, calls).await?;

            let after = next.join(PARTIAL_SEPARATOR).chars().count();
            if after >= before {
                warn!("Reduction pass {} did not shrink: {} -> {} chars", pass, before, after);
                return Err(SummarizeError::ReductionDiverged { pass, before, after });
            }
            partials = next;
        }
    }

    /// Run prompts concurrently; results come back in prompt order
    async fn run_calls(&self, prompts: Vec<String>, calls: &AtomicUsize) -> Result<Vec<String>, SummarizeError> {
        let total = prompts.len();
        let concurrency = self.settings.concurrent_requests.max(1);
        let semaphore = Semaphore::new(concurrency);
        let completed = AtomicUsize::new(0);
        let mut results: Vec<Option<String>> = vec![None; total];

        let mut stream = stream::iter(prompts.into_iter().enumerate())
            .map(|(index, prompt)| {
                let semaphore = &semaphore;
                let completed = &completed;
                async move {
                    let _permit = semaphore.acquire().await
                        .map_err(|_| SummarizeError::Cancelled)?;
                    let text = self.call_with_retry(&prompt, calls).await?;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(progress) = &self.progress {
                        progress(done, total);
                    }
                    Ok::<_, SummarizeError>((index, text))
                }
            })
            .buffer_unordered(concurrency);

        let mut cancelled = false;
        while let Some(result) = stream.next().await {
            match result {
                Ok((index, text)) => results[index] = Some(text),
                // Let calls already in flight finish
                Err(SummarizeError::Cancelled) => cancelled = true,
                Err(e) => return Err(e),
            }
        }
        drop(stream);

        if cancelled {
            return Err(SummarizeError::Cancelled);
        }

        results.into_iter()
            .enumerate()
            .map(|(index, text)| text.ok_or_else(|| {
                SummarizeError::Provider(ProviderError::InvalidResponse(format!("No result for call {}", index + 1)))
            }))
            .collect()
    }

    /// One sanitized completion, retrying retryable failures
    async fn call_with_retry(&self, prompt: &str, calls: &AtomicUsize) -> Result<String, SummarizeError> {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SummarizeError::Cancelled);
            }

            calls.fetch_add(1, Ordering::SeqCst);
            let result = match self.provider.generate(prompt, &self.settings.generation).await {
                Ok(raw) => sanitize(&raw).map_err(SummarizeError::from),
                Err(e) => Err(SummarizeError::from(e)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.settings.retry_count => {
                    attempt += 1;
                    let delay = self.settings.backoff(attempt);
                    warn!(
                        "{} (attempt {}/{}), retrying in {}ms",
                        e, attempt, self.settings.retry_count + 1, delay.as_millis()
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => {
                            debug!("Cancelled during retry backoff");
                            return Err(SummarizeError::Cancelled);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
