// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams of the crisis queue.

pub mod remote;
pub mod store;

pub use remote::{NullRemoteChannel, RemoteChange, RemoteChangeKind, RemoteChannel};
pub use store::SnapshotStore;
