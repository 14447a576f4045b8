use anyhow::{Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{ProviderError, SummarizeError};
use crate::file_utils::FileManager;
use crate::normalizer::{SourceDocument, normalize_document};
use crate::output_writer::{OutputWriter, WriteOutcome};
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::summary::{CancellationToken, OrchestratorSettings, RunOptions, SummaryOrchestrator, SummaryResult};
use crate::templates::TemplateStore;

// @module: Application controller for file summarization

/// Name of the log file that collects skipped and failed files
pub const ISSUES_LOG_FILE: &str = "txtsum.issues.log";

const PROGRESS_CHARS: &str = "█▓▒░";

/// What happened to one input file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// A summary was written
    Summarized { output: PathBuf, result: SummaryResult },
    /// The summary already existed and overwriting was off
    Skipped { output: PathBuf },
}

/// A file the batch did not summarize for a reason that is not a failure
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// A file that failed
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: SummarizeError,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    // @field: Summaries written
    pub written: Vec<PathBuf>,
    // @field: Existing outputs, too long or unsupported inputs
    pub skipped: Vec<SkippedFile>,
    // @field: Files that failed
    pub failures: Vec<FileFailure>,
    // @field: Files not processed because the run was cancelled
    pub cancelled: Vec<PathBuf>,
    // @field: Wall time of the run
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failures.len() + self.cancelled.len()
    }

    /// One-line summary of the counts
    pub fn summary_line(&self) -> String {
        format!(
            "{} file(s): {} summarized, {} skipped, {} failed, {} cancelled in {}",
            self.total(),
            self.written.len(),
            self.skipped.len(),
            self.failures.len(),
            self.cancelled.len(),
            Controller::format_duration(self.elapsed)
        )
    }
}

/// Main application controller for summarization
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Provider factories
    registry: ProviderRegistry,
    // @field: Prompt templates
    templates: TemplateStore,
    // @field: Set on Ctrl-C
    cancel: CancellationToken,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            registry: ProviderRegistry::with_defaults(),
            templates: TemplateStore::built_in(),
            cancel: CancellationToken::new(),
            show_progress: false,
        })
    }

    /// Replace the provider registry
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the template store
    pub fn with_templates(mut self, templates: TemplateStore) -> Self {
        self.templates = templates;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Build the configured provider
    pub fn create_provider(&self) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.registry.create(&self.config.provider, &self.config.active_provider_config())
    }

    /// Check that the configured provider answers
    pub async fn test_provider(&self) -> Result<(), ProviderError> {
        let provider = self.create_provider()?;
        info!("Testing {} with model {}", provider.id(), provider.model());
        provider.test_connection().await
    }

    /// Summarize one file as a single input
    pub async fn summarize_file(&self, path: &Path, options: &RunOptions) -> Result<FileOutcome, SummarizeError> {
        self.summarize_file_with_progress(path, options, true, &MultiProgress::new()).await
    }

    async fn summarize_file_with_progress(
        &self,
        path: &Path,
        options: &RunOptions,
        single_input: bool,
        multi_progress: &MultiProgress,
    ) -> Result<FileOutcome, SummarizeError> {
        // Unknown templates must fail before any LLM call
        let template = self.templates.resolve(&options.template)?;

        let output = OutputWriter::output_path_for(path, options.output.as_deref(), single_input);
        if output.exists() && !options.force_overwrite {
            info!("Summary already exists, skipping (use -f to overwrite): {}", output.display());
            return Ok(FileOutcome::Skipped { output });
        }

        if self.cancel.is_cancelled() {
            return Err(SummarizeError::Cancelled);
        }

        if FileManager::is_large_file(path) {
            warn!("Large file, processing may take a while: {}", path.display());
        }
        let bytes = std::fs::read(path)?;
        let document = SourceDocument::from_bytes(&bytes, Some(path), options.input_format, options.force_text)?;
        let normalized = normalize_document(&document, &options.normalize_options())?;
        debug!(
            "{}: {} format, {} chars after normalization ({} removed)",
            path.display(), normalized.format, normalized.chars_after, normalized.removed_chars()
        );

        let provider = self.create_provider()?;
        info!("Summarizing {} with {} - {}", path.display(), provider.id(), provider.model());

        let progress_bar = self.chunk_progress_bar(multi_progress);
        let pb = progress_bar.clone();
        let orchestrator = SummaryOrchestrator::new(provider, OrchestratorSettings::from_config(&self.config.summary))
            .with_cancellation(self.cancel.clone())
            .with_progress(Arc::new(move |completed: usize, total: usize| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            }));

        let start_time = Instant::now();
        let result = orchestrator.summarize(&normalized, &template, options).await;
        progress_bar.finish_and_clear();
        let result = result?;

        info!(
            "Summarized {} chunks with {} calls in {}",
            result.chunk_count, result.llm_calls, Self::format_duration(start_time.elapsed())
        );

        let source_name = path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match OutputWriter::write(&result, &source_name, &output, options.force_overwrite)? {
            WriteOutcome::Written(output) => {
                info!("Success: {}", output.display());
                Ok(FileOutcome::Summarized { output, result })
            }
            WriteOutcome::Skipped(output) => Ok(FileOutcome::Skipped { output }),
        }
    }

    fn chunk_progress_bar(&self, multi_progress: &MultiProgress) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} calls ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars(PROGRESS_CHARS));
        progress_bar.set_message("Summarizing");
        progress_bar
    }

    /// Expand the command line inputs: files as given, directories scanned
    pub fn collect_inputs(inputs: &[PathBuf], recursive: bool, force_text: bool) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let found = FileManager::find_input_files(input, recursive, force_text)?;
                if found.is_empty() {
                    warn!("No input files found in directory: {}", input.display());
                }
                files.extend(found);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                return Err(anyhow!("Input does not exist: {}", input.display()));
            }
        }
        Ok(files)
    }

    /// Summarize files one after another; a failing file never stops the others
    pub async fn run_batch(&self, paths: &[PathBuf], options: &RunOptions) -> BatchReport {
        let start_time = Instant::now();
        let mut report = BatchReport::default();
        let single_input = paths.len() == 1;

        let multi_progress = MultiProgress::new();
        let folder_pb = if self.show_progress && !single_input {
            let pb = multi_progress.add(ProgressBar::new(paths.len() as u64));
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style.progress_chars(PROGRESS_CHARS));
            pb
        } else {
            ProgressBar::hidden()
        };

        for path in paths {
            if self.cancel.is_cancelled() {
                report.cancelled.push(path.clone());
                continue;
            }

            let file_name = path.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.summarize_file_with_progress(path, options, single_input, &multi_progress).await {
                Ok(FileOutcome::Summarized { output, .. }) => report.written.push(output),
                Ok(FileOutcome::Skipped { output }) => report.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: format!("Summary exists: {}", output.display()),
                }),
                Err(SummarizeError::Cancelled) => {
                    warn!("Cancelled: {}", file_name);
                    report.cancelled.push(path.clone());
                }
                Err(e) if e.is_skip() => {
                    let reason = Self::skip_reason(&e);
                    warn!("Skipped {}: {}", file_name, reason);
                    report.skipped.push(SkippedFile { path: path.clone(), reason });
                }
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    report.failures.push(FileFailure { path: path.clone(), error: e });
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        report.elapsed = start_time.elapsed();

        if paths.len() > 1 || report.has_failures() {
            info!("Batch completed: {}", report.summary_line());
        }
        if !report.failures.is_empty() || !report.skipped.is_empty() {
            self.write_issues_log(paths, options, &report);
        }

        report
    }

    /// Short reason for a skip-class error
    fn skip_reason(error: &SummarizeError) -> String {
        match error {
            SummarizeError::TooLong { actual, max } => {
                format!("Content too long ({} > {} characters)", actual, max)
            }
            other => other.to_string(),
        }
    }

    /// Append skipped and failed files to the issues log
    fn write_issues_log(&self, paths: &[PathBuf], options: &RunOptions, report: &BatchReport) {
        let log_dir = match (&options.output, paths.first()) {
            (Some(out), _) if out.is_dir() => out.clone(),
            (_, Some(first)) => first.parent().map(Path::to_path_buf).unwrap_or_default(),
            _ => return,
        };
        let log_path = log_dir.join(ISSUES_LOG_FILE);

        let mut lines = vec![format!(
            "Run ({} - {}): {}",
            self.config.provider,
            self.config.active_provider_config().effective_model(),
            report.summary_line()
        )];
        lines.extend(report.skipped.iter().map(|s| format!("  SKIPPED {}: {}", s.path.display(), s.reason)));
        lines.extend(report.failures.iter().map(|f| format!("  FAILED {}: {}", f.path.display(), f.error)));

        if let Err(e) = FileManager::append_to_log_file(&log_path, &lines.join("\n")) {
            warn!("Failed to write issues log: {}", e);
        } else {
            debug!("Issues written to {}", log_path.display());
        }
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
