use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Identifier of the active provider (see `ProviderKind`)
    #[serde(default = "default_provider_id")]
    pub provider: String,

    /// Settings for every known provider
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Summarization settings
    #[serde(default)]
    pub summary: SummaryConfig,

    /// User templates file; relative paths resolve against the config file
    #[serde(default)]
    pub templates_file: Option<String>,

    /// Default output directory; next to the input when absent
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Known provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    // @provider: LM Studio (OpenAI-compatible local server)
    #[default]
    LmStudio,
    // @provider: Ollama
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Qwen via DashScope (OpenAI-compatible)
    Qwen,
    // @provider: Anthropic
    Anthropic,
}

impl ProviderKind {
    /// Every built-in provider, in display order
    pub const ALL: [ProviderKind; 5] = [
        Self::LmStudio,
        Self::Ollama,
        Self::OpenAI,
        Self::Qwen,
        Self::Anthropic,
    ];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::LmStudio => "LM Studio",
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Qwen => "Qwen",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Registry identifier
    pub fn id(&self) -> &'static str {
        match self {
            Self::LmStudio => "lm_studio",
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::Qwen => "qwen",
            Self::Anthropic => "anthropic",
        }
    }

    /// Whether calls without an API key are rejected by the service
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Qwen | Self::Anthropic)
    }

    fn default_model(&self) -> String {
        match self {
            // Placeholder; users should set it to the model loaded in LM Studio
            Self::LmStudio => "local-model".to_string(),
            Self::Ollama => "llama3.2:3b".to_string(),
            Self::OpenAI => "gpt-3.5-turbo".to_string(),
            Self::Qwen => "qwen-turbo".to_string(),
            Self::Anthropic => "claude-3-haiku-20240307".to_string(),
        }
    }

    fn default_endpoint(&self) -> String {
        match self {
            Self::LmStudio => "http://localhost:1234/v1".to_string(),
            Self::Ollama => "http://localhost:11434".to_string(),
            Self::OpenAI => "https://api.openai.com/v1".to_string(),
            Self::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            Self::Anthropic => "https://api.anthropic.com".to_string(),
        }
    }

    fn default_rate_limit(&self) -> Option<u32> {
        match self {
            // Local servers are not throttled
            Self::LmStudio | Self::Ollama => None,
            Self::OpenAI | Self::Qwen => Some(60),
            // Slightly below Anthropic's standard 50 requests per minute
            Self::Anthropic => Some(45),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "lm_studio" | "lmstudio" => Ok(Self::LmStudio),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "qwen" => Ok(Self::Qwen),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param kind: Provider enum
    // @returns: Provider config with defaults
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            provider_type: kind.id().to_string(),
            model: kind.default_model(),
            api_key: String::new(),
            endpoint: kind.default_endpoint(),
            timeout_secs: default_timeout_secs(),
            rate_limit: kind.default_rate_limit(),
        }
    }

    /// Provider kind, when the identifier is a built-in one
    pub fn kind(&self) -> Option<ProviderKind> {
        self.provider_type.parse().ok()
    }

    /// Model, falling back to the provider default
    pub fn effective_model(&self) -> String {
        match (self.model.is_empty(), self.kind()) {
            (true, Some(kind)) => kind.default_model(),
            _ => self.model.clone(),
        }
    }

    /// Endpoint, falling back to the provider default
    pub fn effective_endpoint(&self) -> String {
        match (self.endpoint.is_empty(), self.kind()) {
            (true, Some(kind)) => kind.default_endpoint(),
            _ => self.endpoint.clone(),
        }
    }

    /// API key from the config, or from the provider's environment variable
    pub fn effective_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        let var = match self.kind() {
            Some(ProviderKind::OpenAI) => "OPENAI_API_KEY",
            Some(ProviderKind::Qwen) => "DASHSCOPE_API_KEY",
            Some(ProviderKind::Anthropic) => "ANTHROPIC_API_KEY",
            _ => return String::new(),
        };
        std::env::var(var).unwrap_or_default()
    }
}

/// Summarization settings shared by all providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SummaryConfig {
    /// Language code of the summary
    #[serde(default = "default_language")]
    pub language: String,

    /// Template id used when none is given on the command line
    #[serde(default = "default_template")]
    pub default_template: String,

    /// Maximum normalized characters accepted per file
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Maximum characters sent in one summarization request
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Upper bound on recursive reduction passes
    #[serde(default = "default_max_reduction_depth")]
    pub max_reduction_depth: usize,

    /// Maximum number of concurrent chunk requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            default_template: default_template(),
            max_text_length: default_max_text_length(),
            max_chunk_chars: default_max_chunk_chars(),
            max_reduction_depth: default_max_reduction_depth(),
            concurrent_requests: default_concurrent_requests(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_provider_id() -> String {
    ProviderKind::default().id().to_string()
}

fn default_available_providers() -> Vec<ProviderConfig> {
    ProviderKind::ALL.iter().map(|kind| ProviderConfig::new(*kind)).collect()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_language() -> String {
    "en".to_string()
}

fn default_template() -> String {
    "default".to_string()
}

fn default_max_text_length() -> usize {
    100_000
}

fn default_max_chunk_chars() -> usize {
    10_000
}

fn default_max_reduction_depth() -> usize {
    8
}

fn default_concurrent_requests() -> usize {
    2
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            provider: default_provider_id(),
            available_providers: default_available_providers(),
            summary: SummaryConfig::default(),
            templates_file: None,
            output_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Default config location: `conf.json` in the working directory when it
    /// exists, otherwise under the user configuration directory
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("conf.json");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("txtsum").join("conf.json"))
            .unwrap_or(local)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        crate::file_utils::FileManager::write_to_file(path, &json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load the file when it exists, otherwise write and return the defaults
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        log::warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        let kind: ProviderKind = self.provider.parse()
            .map_err(|e: anyhow::Error| AppError::Config(e.to_string()))?;

        let summary = &self.summary;
        if summary.max_text_length == 0 {
            return Err(AppError::Config("summary.max_text_length must be greater than 0".to_string()));
        }
        if summary.max_chunk_chars == 0 {
            return Err(AppError::Config("summary.max_chunk_chars must be greater than 0".to_string()));
        }
        if summary.concurrent_requests == 0 {
            return Err(AppError::Config("summary.concurrent_requests must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&summary.temperature) {
            return Err(AppError::Config(format!(
                "summary.temperature must be between 0.0 and 2.0, got {}", summary.temperature
            )));
        }
        if summary.language.trim().is_empty() {
            return Err(AppError::Config("summary.language must not be empty".to_string()));
        }

        if kind.requires_api_key() && self.active_provider_config().effective_api_key().is_empty() {
            return Err(AppError::Config(format!(
                "API key is required for {} provider", kind.display_name()
            )));
        }

        Ok(())
    }

    /// Kind of the active provider
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    /// Settings of the active provider, defaults when it is not listed
    pub fn active_provider_config(&self) -> ProviderConfig {
        self.get_provider_config(&self.provider)
    }

    /// Settings of a provider by identifier, defaults when it is not listed
    pub fn get_provider_config(&self, id: &str) -> ProviderConfig {
        let kind: Option<ProviderKind> = id.parse().ok();
        self.available_providers.iter()
            .find(|p| p.provider_type == id || (kind.is_some() && p.kind() == kind))
            .cloned()
            .or_else(|| kind.map(ProviderConfig::new))
            .unwrap_or_else(|| ProviderConfig {
                provider_type: id.to_string(),
                model: String::new(),
                api_key: String::new(),
                endpoint: String::new(),
                timeout_secs: default_timeout_secs(),
                rate_limit: None,
            })
    }

    /// Mutable settings of the active provider, inserting defaults if needed
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let config = self.active_provider_config();
        let index = match self.available_providers.iter().position(|p| p == &config) {
            Some(index) => index,
            None => {
                self.available_providers.push(config);
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Resolve the templates file against the config file location
    pub fn templates_path(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or(Path::new("."));
        match &self.templates_file {
            Some(file) => {
                let path = PathBuf::from(file);
                if path.is_absolute() { path } else { base.join(path) }
            }
            None => base.join("templates.json"),
        }
    }
}
