/*!
 * # txtsum - subtitle and text summarizer with AI
 *
 * A Rust library for turning subtitle and plain text files into Markdown
 * summaries using LLM providers.
 *
 * ## Features
 *
 * - Normalize SRT, WebVTT, ASS/SSA and plain text into clean prose
 * - Summarize using various AI providers:
 *   - LM Studio and Ollama (local LLMs)
 *   - OpenAI and Qwen (OpenAI-compatible APIs)
 *   - Anthropic API
 * - Chunk-then-reduce summarization of long content with bounded concurrency
 * - Prompt templates with categories and user overrides
 * - Summaries in any ISO 639 language
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `normalizer`: Encoding detection, format detection and text extraction
 * - `summary`: The summarization pipeline:
 *   - `summary::chunker`: Line-boundary chunking
 *   - `summary::prompts`: Prompt composition
 *   - `summary::orchestrator`: Concurrent chunk calls, reduction and retries
 *   - `summary::sanitizer`: Cleanup of model completions
 * - `templates`: Built-in and user prompt templates
 * - `output_writer`: Atomic Markdown output
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod normalizer;
pub mod output_writer;
pub mod providers;
pub mod summary;
pub mod templates;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchReport, Controller, FileOutcome};
pub use errors::{AppError, ProviderError, SanitizeError, SummarizeError, TemplateError};
pub use language_utils::{get_language_name, language_display_name};
pub use normalizer::{NormalizedText, SourceDocument, SourceFormat};
pub use output_writer::{OutputWriter, WriteOutcome};
pub use providers::{LlmProvider, ProviderRegistry};
pub use summary::{CancellationToken, RunOptions, SummaryOrchestrator, SummaryResult};
pub use templates::{PromptTemplate, TemplateStore};
