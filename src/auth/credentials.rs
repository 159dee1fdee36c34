//! Immutable Basic auth credentials

use base64::Engine as _;
use reqwest::header::HeaderValue;
use reqwest::RequestBuilder;

/// Placeholder password sent alongside the API key
pub const API_KEY_PASSWORD: &str = "unused_with_api_key";

/// Basic auth credentials with a pre-encoded `Authorization` header
#[derive(Clone)]
pub struct Credentials {
    username: String,
    header: HeaderValue,
}

impl Credentials {
    /// Credentials for an API key
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self::basic(api_key, API_KEY_PASSWORD)
    }

    /// Arbitrary username/password pair
    pub fn basic(username: impl Into<String>, password: &str) -> Self {
        let username = username.into();
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        let mut header = HeaderValue::from_str(&format!("Basic {encoded}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        header.set_sensitive(true);
        Self { username, header }
    }

    /// The `Authorization` header value
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }

    /// Attach the credentials to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, self.header.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visible: String = self.username.chars().take(4).collect();
        f.debug_struct("Credentials")
            .field("username", &format!("{visible}***"))
            .finish_non_exhaustive()
    }
}
