//! Error types for the Freshdesk source
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the Freshdesk source
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // API Errors
    // ============================================================================
    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Endpoint not found: {path}")]
    NotFound { path: String },

    #[error("Rate limited (HTTP {status}), retry after {retry_after_seconds:?}s")]
    RateLimited {
        status: u16,
        retry_after_seconds: Option<u64>,
    },

    #[error("Max retries ({max_retries}) exceeded for '{path}'")]
    ExhaustedRetries { max_retries: u32, path: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid endpoint path '{path}': must be relative to the API root")]
    InvalidPath { path: String },

    // ============================================================================
    // Sync Errors
    // ============================================================================
    #[error("Stream '{stream}' failed: {source}")]
    Stream {
        stream: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Output sink error: {message}")]
    Sink { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used for retry and abort decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials rejected (401/403)
    Auth,
    /// Endpoint missing for this account (404)
    NotFound,
    /// Transient throttling or server error (429/5xx)
    RateLimited,
    /// Retry bound exceeded
    ExhaustedRetries,
    /// Response body violated the API contract
    Decode,
    /// Network failure or unexpected status
    Transport,
    /// Invalid configuration or input
    Config,
    /// State load/save failure
    State,
    /// Downstream sink failure
    Sink,
    /// Anything else
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Attach the name of the stream that failed
    pub fn in_stream(self, stream: impl Into<String>) -> Self {
        Self::Stream {
            stream: stream.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error, looking through stream wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Stream { source, .. } => source.kind(),
            Error::Auth { .. } => ErrorKind::Auth,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            Error::Decode { .. } | Error::JsonParse(_) => ErrorKind::Decode,
            Error::HttpStatus { .. } | Error::Http(_) => ErrorKind::Transport,
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::InvalidUrl(_)
            | Error::InvalidPath { .. }
            | Error::StreamNotFound { .. } => ErrorKind::Config,
            Error::State { .. } => ErrorKind::State,
            Error::Sink { .. } => ErrorKind::Sink,
            Error::Io(_) | Error::Other(_) => ErrorKind::Other,
        }
    }

    /// The stream this error is attributed to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Error::Stream { stream, .. } => Some(stream),
            _ => None,
        }
    }

    /// Check if this error is retryable
    ///
    /// Only throttling and server-side failures are; everything else is
    /// surfaced on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

/// Result type alias for the Freshdesk source
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
