// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use txtsum::app_config::{self, Config};
use txtsum::app_controller::Controller;
use txtsum::file_utils::FileManager;
use txtsum::normalizer::SourceFormat;
use txtsum::summary::{CancellationToken, RunOptions};
use txtsum::templates::{TemplateStore, resolve_template_id};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// txtsum - summarize subtitles and text files with AI
///
/// Normalizes subtitle (SRT, WebVTT, ASS/SSA) and plain text files, splits
/// long content into chunks, and writes a Markdown summary produced by a
/// local or hosted LLM.
#[derive(Parser, Debug)]
#[command(name = "txtsum")]
#[command(version)]
#[command(about = "AI-powered subtitle and text summarizer")]
#[command(long_about = "txtsum turns subtitle and text files into Markdown summaries using AI providers.

EXAMPLES:
    txtsum summarize talk.srt                       # Summary written to talk.md
    txtsum summarize -l fr -t detailed talk.srt     # Detailed summary in French
    txtsum summarize --format blog notes.txt        # Blog-style summary
    txtsum summarize -r -o summaries/ lectures/     # Whole directory tree
    txtsum summarize -p ollama -m llama3.2:3b a.vtt # Specific provider and model
    txtsum config test                              # Check the provider answers
    txtsum template list                            # Show available templates
    txtsum completions bash > txtsum.bash           # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json in the working directory, or from the
    user configuration directory. Use --config for another file. A default one
    is created when the file does not exist.

SUPPORTED PROVIDERS:
    lm_studio - LM Studio local server (default, http://localhost:1234/v1)
    ollama    - Local Ollama server
    openai    - OpenAI API (requires API key)
    qwen      - Qwen through DashScope (requires API key)
    anthropic - Anthropic Claude API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true, env = "TXTSUM_CONFIG")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize subtitle or text files
    #[command(alias = "sum")]
    Summarize(SummarizeArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage prompt templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Generate shell completions for txtsum
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// Input files or directories
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Output directory, or output file when summarizing a single input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary format, a template category such as short, long or blog
    #[arg(long)]
    format: Option<String>,

    /// Template name or `category:name` id
    #[arg(short, long)]
    template: Option<String>,

    /// Template category the template name belongs to
    #[arg(long)]
    category: Option<String>,

    /// Provider to use (lm_studio, ollama, openai, qwen, anthropic)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// Summary language code (e.g. 'en', 'fr', 'zh')
    #[arg(short, long)]
    language: Option<String>,

    /// Extra context for the summary, inline text or a file path
    #[arg(short, long)]
    context: Option<String>,

    /// Force overwrite of existing summaries
    #[arg(short, long)]
    force: bool,

    /// Decode files that look binary anyway
    #[arg(long)]
    force_text: bool,

    /// Keep timestamps and structure instead of extracting the spoken text
    #[arg(long)]
    full_context: bool,

    /// Input format, inferred from the extension or content when absent
    #[arg(long, value_parser = parse_source_format)]
    input_format: Option<SourceFormat>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Check that the configured provider answers
    Test,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// List prompts and categories
    List {
        /// Only list templates of this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print a template
    Show {
        /// Template id, plain or `category:name`
        id: String,
    },
    /// Add or replace a user template
    Create {
        /// Template id, plain or `category:name`
        id: String,
        /// Template body, must contain {content}
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        body: Option<String>,
        /// Read the template body from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Write the built-in templates to the user templates file
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_source_format(value: &str) -> std::result::Result<SourceFormat, String> {
    value.parse()
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => "",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The max level is lowered or raised once the config is known
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {}{}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "txtsum", &mut std::io::stdout());
            Ok(())
        }
        Commands::Summarize(args) => {
            let code = run_summarize(args, &config_path, cli.log_level.is_some()).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Config(command) => run_config(command, &config_path).await,
        Commands::Template(command) => run_template(command, &config_path),
    }
}

/// Load the config, applying its log level unless the CLI set one
fn load_config(config_path: &Path, log_level_from_cli: bool) -> Result<Config> {
    let config = Config::load_or_create(config_path)?;
    if !log_level_from_cli {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Ok(config)
}

async fn run_summarize(args: SummarizeArgs, config_path: &Path, log_level_from_cli: bool) -> Result<i32> {
    let mut config = load_config(config_path, log_level_from_cli)?;

    // Override config with CLI options if provided
    if let Some(provider) = &args.provider {
        config.provider = provider.clone();
    }
    if let Some(model) = &args.model {
        config.active_provider_config_mut().model = model.clone();
    }
    if let Some(language) = &args.language {
        config.summary.language = language.clone();
    }

    config.validate()
        .context("Configuration validation failed")?;

    let mut options = RunOptions::from_config(&config);
    options.template = resolve_template_id(
        args.template.as_deref(),
        args.category.as_deref(),
        args.format.as_deref(),
        &config.summary.default_template,
    );
    options.context = match &args.context {
        Some(value) => Some(FileManager::read_context(value)?),
        None => None,
    };
    options.force_overwrite = args.force;
    options.full_context = args.full_context;
    options.force_text = args.force_text;
    options.input_format = args.input_format;
    if let Some(output) = args.output {
        options.output = Some(output);
    }

    let files = Controller::collect_inputs(&args.files, args.recursive, args.force_text)?;
    if files.is_empty() {
        return Err(anyhow!("No input files to summarize"));
    }

    let templates = TemplateStore::load(config.templates_path(config_path))
        .context("Failed to load user templates")?;

    let cancel = CancellationToken::new();
    let watcher_token = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle_interrupt(&watcher_token) {
                std::process::exit(130);
            }
        }
    });

    let controller = Controller::with_config(config)?
        .with_templates(templates)
        .with_cancellation(cancel)
        .with_progress(true);

    let report = controller.run_batch(&files, &options).await;

    for written in &report.written {
        info!("Success: {}", written.display());
    }
    for failure in &report.failures {
        error!("Failed: {} ({})", failure.path.display(), failure.error);
    }

    if report.was_cancelled() {
        warn!("{} file(s) not processed due to cancellation", report.cancelled.len());
        return Ok(130);
    }
    Ok(if report.has_failures() { 1 } else { 0 })
}

/// First interrupt cancels the run; returns false when the run was already cancelled
fn handle_interrupt(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        warn!("Interrupted again, exiting");
        return false;
    }
    warn!("Interrupted, finishing requests in flight (press Ctrl-C again to quit)");
    token.cancel();
    true
}

async fn run_config(command: ConfigCommand, config_path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                warn!("Config file already exists: {}. Use -f to replace it.", config_path.display());
                return Ok(());
            }
            Config::default().save(config_path)?;
            info!("Wrote default config to {}", config_path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let mut config = Config::load_or_create(config_path)?;
            for provider in &mut config.available_providers {
                if !provider.api_key.is_empty() {
                    provider.api_key = "********".to_string();
                }
            }
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommand::Test => {
            let config = load_config(config_path, false)?;
            config.validate()
                .context("Configuration validation failed")?;
            let controller = Controller::with_config(config)?;
            controller.test_provider().await
                .map_err(|e| anyhow!("Provider test failed: {}", e))?;
            info!("Provider connection OK");
            Ok(())
        }
    }
}

fn run_template(command: TemplateCommand, config_path: &Path) -> Result<()> {
    let config = if config_path.exists() { Config::load(config_path)? } else { Config::default() };
    let templates_path = config.templates_path(config_path);

    match command {
        TemplateCommand::List { category } => {
            let store = TemplateStore::load(&templates_path)?;
            let categories = match category {
                Some(category) => vec![category],
                None => {
                    println!("Prompts:");
                    for (name, source) in store.list_prompts() {
                        println!("  {:<20} ({})", name, source);
                    }
                    store.list_categories()
                }
            };
            for category in categories {
                println!("Category {}:", category);
                for (name, source) in store.list_templates_in_category(&category) {
                    println!("  {:<20} ({})", format!("{}:{}", category, name), source);
                }
            }
            Ok(())
        }
        TemplateCommand::Show { id } => {
            let store = TemplateStore::load(&templates_path)?;
            let template = store.resolve(&id)?;
            println!("# {} ({})", template.id, template.source);
            println!("{}", template.body);
            Ok(())
        }
        TemplateCommand::Create { id, body, file } => {
            let body = match (body, file) {
                (Some(body), _) => body,
                (None, Some(file)) => FileManager::read_to_string(&file)?,
                (None, None) => return Err(anyhow!("Either --body or --file is required")),
            };
            let mut store = TemplateStore::load(&templates_path)?;
            store.save_template(&id, &body)?;
            Ok(())
        }
        TemplateCommand::Init { force } => {
            if !TemplateStore::init_default_templates(&templates_path, force)? {
                warn!("Templates file already exists: {}. Use -f to replace it.", templates_path.display());
            }
            Ok(())
        }
    }
}
