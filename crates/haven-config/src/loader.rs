// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./haven.toml` > `~/.config/haven/haven.toml` >
//! `/etc/haven/haven.toml` with environment variable overrides via the
//! `HAVEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HavenConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/haven/haven.toml` (system-wide)
/// 3. `~/.config/haven/haven.toml` (user XDG config)
/// 4. `./haven.toml` (local directory)
/// 5. `HAVEN_*` environment variables
pub fn load_config() -> Result<HavenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HavenConfig::default()))
        .merge(Toml::file("/etc/haven/haven.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("haven/haven.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("haven.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<HavenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HavenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HavenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HavenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `HAVEN_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("HAVEN_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("queue_", "queue.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("broadcast_", "broadcast.", 1)
            .replacen("remote_", "remote.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_local_only_queue() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.queue.default_ttl_ms, 900_000);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.snapshot_key, "crisis_queue_requests");
        assert!(config.broadcast.enabled);
        assert_eq!(config.broadcast.channel, "crisis_queue");
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = load_config_from_str(
            r#"
            [queue]
            default_ttl_ms = 120000

            [storage]
            database_path = "/tmp/haven.db"

            [broadcast]
            enabled = false
            channel = "test_channel"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.default_ttl_ms, 120_000);
        assert_eq!(config.storage.database_path.as_deref(), Some("/tmp/haven.db"));
        assert!(!config.broadcast.enabled);
        assert_eq!(config.broadcast.channel, "test_channel");
    }

    #[test]
    fn remote_requires_both_url_and_key() {
        let config = load_config_from_str(
            r#"
            [remote]
            url = "https://example.invalid"
            "#,
        )
        .unwrap();
        assert!(!config.remote.is_configured());

        let config = load_config_from_str(
            r#"
            [remote]
            url = "https://example.invalid"
            api_key = "k"
            "#,
        )
        .unwrap();
        assert!(config.remote.is_configured());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [queue]
            default_tll_ms = 5
            "#,
        );
        assert!(result.is_err(), "typoed key should be rejected");
    }
}
