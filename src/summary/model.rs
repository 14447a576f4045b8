/*!
 * Run options and results of a summarization.
 */

use serde::Serialize;
use std::path::PathBuf;

use crate::app_config::Config;
use crate::normalizer::{NormalizeOptions, SourceFormat};

// @struct: Settings of one run, read-only once built
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    // @field: Longest accepted normalized text in characters
    pub max_text_length: usize,

    // @field: Chunk size limit in characters
    pub max_chunk_chars: usize,

    // @field: Template id, plain or `category:name`
    pub template: String,

    // @field: Summary language code
    pub language: String,

    // @field: Extra context for the prompt
    pub context: Option<String>,

    // @field: Replace existing summaries
    pub force_overwrite: bool,

    // @field: Keep timestamps and structure
    pub full_context: bool,

    // @field: Decode binary-looking input anyway
    pub force_text: bool,

    // @field: Declared input format, inferred when None
    pub input_format: Option<SourceFormat>,

    // @field: Output directory, or output file for a single input
    pub output: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunOptions {
    /// Options with every value taken from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_text_length: config.summary.max_text_length,
            max_chunk_chars: config.summary.max_chunk_chars,
            template: config.summary.default_template.clone(),
            language: config.summary.language.clone(),
            context: None,
            force_overwrite: false,
            full_context: false,
            force_text: false,
            input_format: None,
            output: config.output_dir.as_ref().map(PathBuf::from),
        }
    }

    /// Normalizer settings of this run
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            full_context: self.full_context,
            max_text_length: self.max_text_length,
        }
    }
}

// @struct: Completed summary, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    // @field: Language code the summary was requested in
    pub language: String,

    // @field: Template id used
    pub template: String,

    // @field: Final sanitized summary
    pub body: String,

    // @field: Per-chunk summaries in chunk order
    pub partials: Vec<String>,

    // @field: Number of chunks of the normalized text
    pub chunk_count: usize,

    // @field: Reduction passes before the final combine
    pub reduction_passes: usize,

    // @field: LLM calls made, retries included
    pub llm_calls: usize,
}
