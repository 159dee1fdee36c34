//! Source configuration
//!
//! The configuration is supplied once by the caller (CLI flag, file or
//! inline JSON), validated, and never mutated afterwards.

use crate::error::{Error, Result, ResultExt};
use crate::stream::Cursor;
use crate::types::NotFoundPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// API version prefix appended to the account origin
const API_ROOT: &str = "/api/v2/";

/// Validated connector configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Freshdesk domain, e.g. `acme.freshdesk.com`, or a full origin
    pub domain: String,

    /// API key, used as the Basic auth username
    pub api_key: String,

    /// Lower bound for the first incremental sync
    #[serde(default)]
    pub start_date: Option<Cursor>,

    /// Proactive client-side request budget
    #[serde(default)]
    pub requests_per_minute: Option<u32>,

    /// Behaviour when an endpoint answers 404
    #[serde(default)]
    pub not_found_policy: NotFoundPolicy,
}

impl SourceConfig {
    /// Create a config with the required fields
    pub fn new(domain: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            api_key: api_key.into(),
            start_date: None,
            requests_per_minute: None,
            not_found_policy: NotFoundPolicy::default(),
        }
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: Cursor) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Set the request budget
    #[must_use]
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }

    /// Set the 404 policy
    #[must_use]
    pub fn with_not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found_policy = policy;
        self
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Load a config file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::config("Config must be an object"))?;
        for field in ["domain", "api_key"] {
            if !object.contains_key(field) {
                return Err(Error::missing_field(field));
            }
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field-level constraints
    pub fn validate(&self) -> Result<()> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(Error::invalid_value("domain", "must not be empty"));
        }
        if domain.chars().any(char::is_whitespace) {
            return Err(Error::invalid_value("domain", "must not contain whitespace"));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::invalid_value("api_key", "must not be empty"));
        }
        if self.requests_per_minute == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_minute",
                "must be greater than zero",
            ));
        }
        self.api_root()?;
        Ok(())
    }

    /// Account origin, e.g. `https://acme.freshdesk.com`
    pub fn origin(&self) -> String {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// Base URL every endpoint path is joined onto
    pub fn api_root(&self) -> Result<Url> {
        let url = Url::parse(&format!("{}{API_ROOT}", self.origin()))?;
        if url.host_str().is_none() {
            return Err(Error::invalid_value("domain", "has no host"));
        }
        Ok(url)
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visible: String = self.api_key.chars().take(4).collect();
        f.debug_struct("SourceConfig")
            .field("domain", &self.domain)
            .field("api_key", &format!("{visible}***"))
            .field("start_date", &self.start_date)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("not_found_policy", &self.not_found_policy)
            .finish()
    }
}
