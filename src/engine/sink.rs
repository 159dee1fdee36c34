//! Message sinks
//!
//! The engine hands every message to a [`MessageSink`] as soon as it is
//! produced; the sink decides where it goes.

use super::types::Message;
use crate::error::{Error, Result};
use crate::state::StateManager;
use async_trait::async_trait;
use std::io::Write;
use tokio::sync::mpsc;

/// Downstream consumer of sync messages
#[async_trait]
pub trait MessageSink: Send {
    /// Accept one message; an error aborts the sync
    async fn send(&mut self, message: Message) -> Result<()>;
}

#[async_trait]
impl MessageSink for Vec<Message> {
    async fn send(&mut self, message: Message) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

#[async_trait]
impl MessageSink for mpsc::Sender<Message> {
    async fn send(&mut self, message: Message) -> Result<()> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| Error::sink("message receiver dropped"))
    }
}

/// Writes one JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> MessageSink for JsonLinesSink<W> {
    async fn send(&mut self, message: Message) -> Result<()> {
        let line = serde_json::to_string(&message.to_json())?;
        writeln!(self.writer, "{line}")
            .map_err(|e| Error::sink(format!("Failed to write message: {e}")))?;

        // state lines must reach the consumer before the next record
        if message.is_state() {
            self.writer
                .flush()
                .map_err(|e| Error::sink(format!("Failed to flush output: {e}")))?;
        }
        Ok(())
    }
}

/// Forwards messages and persists every checkpoint through a [`StateManager`]
#[derive(Debug)]
pub struct CheckpointingSink<S> {
    inner: S,
    state: StateManager,
}

impl<S: MessageSink> CheckpointingSink<S> {
    /// Wrap `inner`, saving checkpoints with `state`
    pub fn new(inner: S, state: StateManager) -> Self {
        Self { inner, state }
    }

    /// Recover the wrapped sink
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: MessageSink> MessageSink for CheckpointingSink<S> {
    async fn send(&mut self, message: Message) -> Result<()> {
        let checkpoint = match &message {
            Message::State(state) => Some(state.clone()),
            Message::Record { .. } => None,
        };

        self.inner.send(message).await?;

        if let Some(state) = checkpoint {
            self.state.replace(state).await?;
        }
        Ok(())
    }
}
