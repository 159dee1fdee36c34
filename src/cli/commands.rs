//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Freshdesk source connector
#[derive(Parser, Debug)]
#[command(name = "freshdesk-source")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Where checkpoints are written (defaults to --state)
    #[arg(long, global = true)]
    pub state_out: Option<PathBuf>,

    /// Output format for check and discover
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test connection to the API
    Check,

    /// Discover available streams
    Discover,

    /// Read data from streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Pages between checkpoints on streams sorted by cursor
        #[arg(long)]
        checkpoint_interval: Option<u32>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Split a comma-separated stream list, dropping blanks
pub fn parse_stream_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read_command() {
        let cli = Cli::parse_from([
            "freshdesk-source",
            "read",
            "--config-json",
            r#"{"domain":"acme.freshdesk.com","api_key":"k"}"#,
            "--streams",
            "tickets, contacts",
            "--state-out",
            "state.json",
        ]);

        assert!(cli.config_json.is_some());
        assert_eq!(cli.state_out, Some(PathBuf::from("state.json")));
        match cli.command {
            Commands::Read {
                streams,
                checkpoint_interval,
            } => {
                assert_eq!(
                    parse_stream_list(&streams.unwrap()),
                    vec!["tickets".to_string(), "contacts".to_string()]
                );
                assert!(checkpoint_interval.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_with_verbose() {
        let cli = Cli::parse_from(["freshdesk-source", "-v", "check", "-C", "config.yaml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("config.yaml")));
        assert!(matches!(cli.command, Commands::Check));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_stream_list_drops_blanks() {
        assert_eq!(parse_stream_list(" ,agents,,"), vec!["agents".to_string()]);
        assert!(parse_stream_list("").is_empty());
    }
}
