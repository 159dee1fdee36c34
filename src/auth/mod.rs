//! Authentication module
//!
//! Freshdesk authenticates API keys with HTTP Basic auth: the key is the
//! username and the password is ignored by the server. The `Credentials`
//! value is built once from config and shared read-only by every request.

mod credentials;

pub use credentials::{Credentials, API_KEY_PASSWORD};
