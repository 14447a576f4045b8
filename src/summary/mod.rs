/*!
 * Summarization pipeline.
 *
 * This module provides:
 * - Line-boundary chunking of normalized text
 * - Prompt composition with language and context directives
 * - The chunk-then-reduce orchestrator with bounded concurrency and retries
 * - Cleanup of raw model completions
 *
 * Cancellation uses `tokio_util`'s token: clones share state, and waiting
 * code can await `cancelled()`.
 */

pub mod chunker;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod sanitizer;

// Re-export main types
pub use tokio_util::sync::CancellationToken;
pub use chunker::{Chunk, chunk, join_chunks};
pub use model::{RunOptions, SummaryResult};
pub use orchestrator::{OrchestratorSettings, ProgressCallback, SummaryOrchestrator};
pub use prompts::SummaryPromptBuilder;
pub use sanitizer::sanitize;
