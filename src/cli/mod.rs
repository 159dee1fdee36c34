//! CLI module
//!
//! Command-line interface for the Freshdesk source.
//!
//! # Commands
//!
//! - `check` - Test connection to the API
//! - `discover` - List available streams
//! - `read` - Extract data from streams

mod commands;
mod runner;

pub use commands::{parse_stream_list, Cli, Commands, OutputFormat};
pub use runner::Runner;
