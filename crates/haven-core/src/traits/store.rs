// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot store trait for persistence backends.

use async_trait::async_trait;

use crate::error::HavenError;
use crate::types::CrisisRequest;

/// Best-effort durability for the full crisis-request set.
///
/// A store holds one serialized snapshot of all current requests under a
/// fixed key and overwrites it on every mutation. Implementations must
/// tolerate the underlying medium being absent: loads degrade to an empty
/// set, while saves may fail with a [`HavenError::Storage`] that the queue
/// routes to its error handlers without rolling back the mutation.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Human-readable name of this store implementation.
    fn name(&self) -> &str;

    /// Whether the backing medium initialized successfully.
    fn is_available(&self) -> bool;

    /// Load and normalize the persisted snapshot, sorted by ascending
    /// creation timestamp. Missing or malformed data yields an empty set.
    async fn load(&self) -> Result<Vec<CrisisRequest>, HavenError>;

    /// Overwrite the persisted snapshot with the full current set.
    async fn save(&self, requests: &[CrisisRequest]) -> Result<(), HavenError>;

    /// Release the backing medium, flushing pending writes.
    async fn close(&self) -> Result<(), HavenError>;
}
