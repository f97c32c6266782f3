// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Null snapshot store for contexts with no persistence medium at all.

use async_trait::async_trait;

use haven_core::{CrisisRequest, HavenError, SnapshotStore};

/// The storage-absent case.
///
/// Loading tolerates the absence (empty set); saving reports it, so the
/// queue's error-handler channel observes every failed persistence attempt
/// while the in-memory mutation proceeds untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSnapshotStore;

impl NullSnapshotStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotStore for NullSnapshotStore {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Vec<CrisisRequest>, HavenError> {
        Ok(Vec::new())
    }

    async fn save(&self, _requests: &[CrisisRequest]) -> Result<(), HavenError> {
        Err(HavenError::storage("snapshot store unavailable"))
    }

    async fn close(&self) -> Result<(), HavenError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_empty_and_fails_saves() {
        let store = NullSnapshotStore::new();
        assert!(!store.is_available());
        assert!(store.load().await.unwrap().is_empty());
        assert!(matches!(
            store.save(&[]).await,
            Err(HavenError::Storage { .. })
        ));
        store.close().await.unwrap();
    }
}
