//! CLI runner - executes commands

use crate::cli::commands::{parse_stream_list, Cli, Commands, OutputFormat};
use crate::config::SourceConfig;
use crate::connector::FreshdeskSource;
use crate::engine::{CheckpointingSink, JsonLinesSink, SyncConfig};
use crate::error::{Error, Result};
use crate::state::StateManager;
use serde_json::{json, Value};
use std::io::{BufWriter, Write};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Read {
                streams,
                checkpoint_interval,
            } => self.read(streams.as_deref(), *checkpoint_interval).await,
        }
    }

    /// Load configuration
    fn load_config(&self) -> Result<SourceConfig> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return SourceConfig::from_json(json_str);
        }

        if let Some(path) = &self.cli.config {
            return SourceConfig::from_file(path);
        }

        Err(Error::config(
            "No configuration given (use --config or --config-json)",
        ))
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        let manager = if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)?
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)?
        } else {
            StateManager::in_memory()
        };

        Ok(match &self.cli.state_out {
            Some(path) => manager.persist_to(path),
            None => manager,
        })
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let source = FreshdeskSource::new(self.load_config()?)?;
        let result = source.check().await;

        let status = if result.success { "SUCCEEDED" } else { "FAILED" };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": status,
                "message": result.message,
            }
        }));

        Ok(())
    }

    /// Discover streams
    fn discover(&self) -> Result<()> {
        let source = FreshdeskSource::new(self.load_config()?)?;
        let catalog = serde_json::to_value(source.discover())?;

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": catalog,
        }));

        Ok(())
    }

    /// Read streams, writing messages to stdout
    async fn read(&self, streams: Option<&str>, checkpoint_interval: Option<u32>) -> Result<()> {
        let mut source = FreshdeskSource::new(self.load_config()?)?;
        if let Some(pages) = checkpoint_interval {
            source = source.with_sync_config(SyncConfig::new().with_checkpoint_interval(pages));
        }

        let selected = streams.map(parse_stream_list).filter(|s| !s.is_empty());
        let state = self.load_state()?;
        let prior = state.snapshot().await;

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current page");
                ctrl_c.cancel();
            }
        });

        let output = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
        let outcome = if state.is_in_memory() {
            let mut sink = output;
            let outcome = source.read(prior, selected.as_deref(), &mut sink, cancel).await;
            flush(sink.into_inner())?;
            outcome?
        } else {
            let mut sink = CheckpointingSink::new(output, state.clone());
            let outcome = source.read(prior, selected.as_deref(), &mut sink, cancel).await;
            flush(sink.into_inner().into_inner())?;
            outcome?
        };

        if outcome.cancelled {
            warn!("read cancelled; resume from the last emitted state");
        }
        info!(
            records = outcome.stats.records_synced,
            checkpoints = outcome.stats.checkpoints,
            "read complete"
        );
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn flush<W: Write>(mut writer: W) -> Result<()> {
    writer
        .flush()
        .map_err(|e| Error::sink(format!("Failed to flush output: {e}")))
}
