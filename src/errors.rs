/*!
 * Error types for the txtsum application.
 *
 * This module contains custom error types for the different stages of the
 * summarization pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider rejected our credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The provider throttled the request
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// The response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The provider settings are unusable (missing key, bad endpoint)
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and its body to an error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimit(message),
            _ => Self::Api { status_code, message },
        }
    }

    /// Whether another attempt of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimit(_) | Self::InvalidResponse(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            Self::Auth(_) | Self::InvalidConfig(_) => false,
        }
    }

    /// Short kind label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Auth(_) => "auth",
            Self::RateLimit(_) => "rate_limit",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Api { .. } => "api",
            Self::InvalidConfig(_) => "config",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// A completion that is empty once reasoning and boilerplate are stripped
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Model response was empty after sanitizing ({raw_chars} raw characters)")]
pub struct SanitizeError {
    /// Length of the completion before cleanup
    pub raw_chars: usize,
}

/// Errors raised by the template store
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No layer defines the requested id
    #[error("Template not found: {0}")]
    NotFound(String),

    /// A template body lacks the {content} placeholder
    #[error("Template '{0}' must contain a {{content}} placeholder")]
    MissingContentPlaceholder(String),

    /// The user templates file could not be read or written
    #[error("Templates file error: {0}")]
    Io(#[from] std::io::Error),

    /// The user templates file is not valid JSON
    #[error("Templates file is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors that end the summarization of a single file
#[derive(Error, Debug)]
pub enum SummarizeError {
    /// Binary or undecodable input
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Normalized text is over the configured limit
    #[error("Content too long: {actual} characters exceeds maximum limit of {max} characters")]
    TooLong {
        /// Normalized length in characters
        actual: usize,
        /// Configured maximum
        max: usize,
    },

    /// Nothing left to summarize after normalization
    #[error("File is empty or contains no text")]
    EmptyContent,

    /// LLM call failed after retries
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A reduction pass did not shrink its input
    #[error("Reduction diverged at pass {pass}: {before} -> {after} characters")]
    ReductionDiverged {
        /// 1-based reduction pass
        pass: usize,
        /// Characters entering the pass
        before: usize,
        /// Characters leaving the pass
        after: usize,
    },

    /// Model kept returning empty completions
    #[error("Sanitize error: {0}")]
    Sanitize(#[from] SanitizeError),

    /// Unknown template id
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Any other template store failure
    #[error("Template error: {0}")]
    Template(String),

    /// User interrupted the run
    #[error("Cancelled by user")]
    Cancelled,

    /// Reading the input or writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SummarizeError {
    /// Errors that a batch reports as "skipped" rather than "failed"
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::TooLong { .. })
    }

    /// Errors worth another attempt of the same LLM call
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Sanitize(_) => true,
            _ => false,
        }
    }
}

impl From<TemplateError> for SummarizeError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::NotFound(id) => Self::TemplateNotFound(id),
            other => Self::Template(other.to_string()),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the template store
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Error from the summarization pipeline
    #[error("Summarize error: {0}")]
    Summarize(#[from] SummarizeError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
