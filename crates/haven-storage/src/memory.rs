// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory snapshot store for tests and ephemeral deployments.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use haven_core::{CrisisRequest, HavenError, SnapshotStore};

/// Snapshot store backed by process memory.
///
/// Tracks how many saves occurred so tests can assert on persistence
/// side effects without a real database.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Vec<CrisisRequest>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed saves since construction.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The most recently saved snapshot.
    pub fn last_snapshot(&self) -> Vec<CrisisRequest> {
        self.snapshot.lock().expect("snapshot lock poisoned").clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<Vec<CrisisRequest>, HavenError> {
        let mut requests = self.snapshot.lock().expect("snapshot lock poisoned").clone();
        requests.sort_by_key(|r| r.timestamp);
        Ok(requests)
    }

    async fn save(&self, requests: &[CrisisRequest]) -> Result<(), HavenError> {
        *self.snapshot.lock().expect("snapshot lock poisoned") = requests.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), HavenError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{CrisisLevel, CrisisStatus, RequestId, DEFAULT_TTL_MS};

    #[tokio::test]
    async fn counts_saves_and_returns_last_snapshot() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.save_count(), 0);

        let request = CrisisRequest {
            id: RequestId::from("r1"),
            student_id: "s1".to_string(),
            crisis_level: CrisisLevel::Critical,
            status: CrisisStatus::Pending,
            timestamp: 1,
            ttl: DEFAULT_TTL_MS,
            expires_at: 1 + DEFAULT_TTL_MS,
            post_id: None,
            volunteer_id: None,
            metadata: None,
        };

        store.save(std::slice::from_ref(&request)).await.unwrap();
        store.save(&[]).await.unwrap();

        assert_eq!(store.save_count(), 2);
        assert!(store.last_snapshot().is_empty());
        assert!(store.load().await.unwrap().is_empty());
    }
}
