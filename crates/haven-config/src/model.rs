// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Haven crisis queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every section is optional and defaults to a
//! local-only queue: no persistence path, local broadcast enabled, no
//! remote backend.

use serde::{Deserialize, Serialize};

/// Top-level Haven configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HavenConfig {
    /// Queue service settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Snapshot persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Local broadcast transport settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Optional remote realtime backend settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Queue service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Default request time-to-live in milliseconds when the caller does
    /// not supply one. The enforced minimum TTL is a hard constant and is
    /// deliberately not configurable.
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
        }
    }
}

fn default_ttl_ms() -> i64 {
    900_000
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file. `None` runs without persistence.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Key under which the serialized request set is stored.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            snapshot_key: default_snapshot_key(),
        }
    }
}

fn default_snapshot_key() -> String {
    "crisis_queue_requests".to_string()
}

/// Local broadcast transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Whether to attach to the named broadcast channel at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of the broadcast channel shared by queue instances.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Buffered event capacity per receiver before lagging.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            channel: default_channel(),
            capacity: default_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_channel() -> String {
    "crisis_queue".to_string()
}

fn default_capacity() -> usize {
    64
}

/// Remote realtime backend configuration.
///
/// Both `url` and `api_key` must be present for a remote channel to be
/// selected; otherwise the queue runs in local-broadcast-only mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Backend endpoint URL. `None` disables remote replication.
    #[serde(default)]
    pub url: Option<String>,

    /// Backend API key. `None` disables remote replication.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Table/collection holding crisis request rows.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
        }
    }
}

impl RemoteConfig {
    /// True when enough configuration is present to attempt a connection.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }
}

fn default_table() -> String {
    "crisis_requests".to_string()
}
