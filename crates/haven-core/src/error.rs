// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Haven crisis queue.

use thiserror::Error;

/// The primary error type used across the crisis queue and its adapters.
///
/// Validation and not-found errors are returned directly to the caller and
/// never produce events. Everything else is a side-channel failure: it is
/// normalized to this type and delivered through the registered error
/// handlers while the triggering mutation proceeds.
#[derive(Debug, Error)]
pub enum HavenError {
    /// Caller misuse (empty student id, malformed input).
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced crisis request does not exist.
    #[error("crisis request not found: {0}")]
    NotFound(String),

    /// Snapshot store errors (open failure, write failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Local broadcast transport errors (channel open or send failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote realtime channel errors (connect, subscribe, or send failure).
    #[error("remote channel error: {message}")]
    Remote {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A subscriber callback failed during event delivery.
    #[error("subscriber {subscriber_id} failed: {source}")]
    Subscriber {
        subscriber_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// The queue service was destroyed; obtain a fresh instance.
    #[error("crisis queue service destroyed")]
    Destroyed,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HavenError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        HavenError::Storage {
            source: source.into(),
        }
    }
}
