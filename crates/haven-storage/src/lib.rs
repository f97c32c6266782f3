// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot persistence adapters for the Haven crisis queue.
//!
//! Three [`SnapshotStore`](haven_core::SnapshotStore) implementations:
//! SQLite-backed (durable), in-memory (ephemeral/tests), and null
//! (persistence absent).

pub mod database;
pub mod memory;
pub mod null;
pub mod snapshot;

pub use database::Database;
pub use memory::MemorySnapshotStore;
pub use null::NullSnapshotStore;
pub use snapshot::SqliteSnapshotStore;
