// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote realtime channel trait for cross-device replication.
//!
//! The remote backend is an optional, pluggable collaborator. When no
//! backend is configured the queue runs with [`NullRemoteChannel`], which
//! accepts every mutation and never produces inbound changes, so the rest
//! of the service needs no capability probing.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::error::HavenError;
use crate::types::QueueEvent;

/// Discriminator for row-level change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change received from a remote backend.
///
/// `new_row` carries the row payload for inserts/updates; `old_row` carries
/// the prior payload (at minimum the id) for deletes.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub kind: RemoteChangeKind,
    pub new_row: Option<Value>,
    pub old_row: Option<Value>,
}

/// Capability interface for an optional remote replication backend.
#[async_trait]
pub trait RemoteChannel: Send + Sync + 'static {
    /// Human-readable name of this channel implementation.
    fn name(&self) -> &str;

    /// Whether this channel has real backing configuration.
    fn is_configured(&self) -> bool;

    /// Establish the connection. Failures degrade the queue to
    /// local-broadcast-only mode; they never fail queue construction.
    async fn connect(&self) -> Result<(), HavenError>;

    /// Subscribe to row-level changes. The receiver stays open for the
    /// lifetime of the channel.
    async fn subscribe_changes(&self) -> Result<mpsc::Receiver<RemoteChange>, HavenError>;

    /// Push one locally-originated mutation to the backend.
    async fn apply_mutation(&self, event: &QueueEvent) -> Result<(), HavenError>;

    /// Tear down the connection.
    async fn close(&self) -> Result<(), HavenError>;
}

/// Null-object remote channel used when no backend is configured.
pub struct NullRemoteChannel {
    // Held so the receiver handed out by subscribe_changes never closes.
    keepalive: Mutex<Option<mpsc::Sender<RemoteChange>>>,
}

impl NullRemoteChannel {
    pub fn new() -> Self {
        Self {
            keepalive: Mutex::new(None),
        }
    }
}

impl Default for NullRemoteChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteChannel for NullRemoteChannel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<(), HavenError> {
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<mpsc::Receiver<RemoteChange>, HavenError> {
        let (tx, rx) = mpsc::channel(1);
        *self.keepalive.lock().await = Some(tx);
        Ok(rx)
    }

    async fn apply_mutation(&self, _event: &QueueEvent) -> Result<(), HavenError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), HavenError> {
        self.keepalive.lock().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_remote_is_unconfigured_and_silent() {
        let remote = NullRemoteChannel::new();
        assert!(!remote.is_configured());
        remote.connect().await.unwrap();

        let mut rx = remote.subscribe_changes().await.unwrap();
        // No change may ever arrive while the channel is open.
        assert!(rx.try_recv().is_err());

        remote.close().await.unwrap();
        // After close the stream ends.
        assert!(rx.recv().await.is_none());
    }
}
