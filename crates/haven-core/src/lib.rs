// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Haven crisis queue.
//!
//! This crate provides the data model, error type, normalization helpers,
//! and the adapter traits (snapshot store, remote channel) implemented by
//! the other workspace crates.

pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HavenError;
pub use normalize::{normalize_request, normalize_snapshot};
pub use traits::{
    NullRemoteChannel, RemoteChange, RemoteChangeKind, RemoteChannel, SnapshotStore,
};
pub use types::{
    clamp_ttl, now_ms, CrisisLevel, CrisisRequest, CrisisStatus, QueueEvent, RequestId,
    DEFAULT_TTL_MS, MIN_TTL_MS,
};
