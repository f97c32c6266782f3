// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live per-viewer mirror of the crisis request map.
//!
//! A [`QueueMirror`] consumes queue events and maintains the consumer-side
//! picture: the full request map, the viewer's own active requests, the
//! viewer's session expiry, and the audit trail. [`attach_mirror`] wires a
//! shared mirror into a running [`CrisisQueue`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use haven_core::{now_ms, CrisisRequest, CrisisStatus, QueueEvent, RequestId};
use haven_queue::CrisisQueue;

use crate::log::{AuditAction, AuditLog, CrisisAuditEntry};

/// Derived read model over the queue's event stream for one viewer.
pub struct QueueMirror {
    viewer: String,
    requests: HashMap<RequestId, CrisisRequest>,
    audit: AuditLog,
    session_expires_at: Option<i64>,
}

impl QueueMirror {
    pub fn new(viewer: impl Into<String>) -> Self {
        Self {
            viewer: viewer.into(),
            requests: HashMap::new(),
            audit: AuditLog::new(),
            session_expires_at: None,
        }
    }

    /// Fold one queue event into the mirror, classifying the transition
    /// for the audit trail.
    pub fn apply(&mut self, event: &QueueEvent) {
        let now = now_ms();
        match event {
            QueueEvent::Upsert { request } => {
                let previous = self.requests.insert(request.id.clone(), request.clone());
                let action = match previous {
                    None => AuditAction::Created,
                    Some(prev) if prev.status != request.status => match request.status {
                        CrisisStatus::Assigned => AuditAction::Assigned,
                        CrisisStatus::Resolved => AuditAction::Resolved,
                        CrisisStatus::Expired => AuditAction::Expired,
                        CrisisStatus::Pending => AuditAction::Updated,
                    },
                    Some(_) => AuditAction::Updated,
                };
                let mut entry = CrisisAuditEntry::new(request.id.clone(), action, now);
                if action == AuditAction::Assigned {
                    if let Some(volunteer) = &request.volunteer_id {
                        entry = entry.with_details(format!("volunteer {volunteer}"));
                    }
                }
                debug!(id = %request.id, action = %action, "mirror applied upsert");
                self.audit.record(entry);
            }
            QueueEvent::Delete { request_id } => {
                // Deletes for requests we never saw carry no information.
                if self.requests.remove(request_id).is_some() {
                    self.audit.record(CrisisAuditEntry::new(
                        request_id.clone(),
                        AuditAction::Deleted,
                        now,
                    ));
                }
            }
        }
        self.audit.purge_expired(now);
        self.refresh_session();
    }

    /// The viewer's own non-terminal requests, oldest first.
    pub fn active_requests(&self) -> Vec<CrisisRequest> {
        let mut active: Vec<CrisisRequest> = self
            .requests
            .values()
            .filter(|r| r.student_id == self.viewer && !r.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|r| r.timestamp);
        active
    }

    /// Expiry of the viewer's most recently created active request, or
    /// `None` once every one of them terminated or was deleted.
    pub fn session_expires_at(&self) -> Option<i64> {
        self.session_expires_at
    }

    /// The audit trail, oldest entry first.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// All mirrored requests, regardless of viewer.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn refresh_session(&mut self) {
        self.session_expires_at = self
            .requests
            .values()
            .filter(|r| r.student_id == self.viewer && !r.status.is_terminal())
            .max_by_key(|r| r.timestamp)
            .map(|r| r.expires_at);
    }
}

/// Subscribe a shared mirror to a queue.
///
/// Returns the mirror handle and the unsubscribe closure. The mirror only
/// sees events applied after attachment; seed it from
/// [`CrisisQueue::snapshot`] first if the queue is already populated.
pub fn attach_mirror(
    queue: &CrisisQueue,
    viewer: impl Into<String>,
) -> (Arc<Mutex<QueueMirror>>, impl FnOnce() + Send) {
    let viewer = viewer.into();
    let mirror = Arc::new(Mutex::new(QueueMirror::new(viewer.clone())));
    let handle = mirror.clone();
    let unsubscribe = queue.subscribe(format!("mirror:{viewer}"), move |event| {
        let mut mirror = handle
            .lock()
            .map_err(|_| "mirror lock poisoned".to_string())?;
        mirror.apply(event);
        Ok(())
    });
    (mirror, unsubscribe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{CrisisLevel, DEFAULT_TTL_MS};

    fn request(id: &str, student: &str, status: CrisisStatus, timestamp: i64) -> CrisisRequest {
        CrisisRequest {
            id: RequestId::from(id),
            student_id: student.to_string(),
            crisis_level: CrisisLevel::High,
            status,
            timestamp,
            ttl: DEFAULT_TTL_MS,
            expires_at: timestamp + DEFAULT_TTL_MS,
            post_id: None,
            volunteer_id: None,
            metadata: None,
        }
    }

    fn upsert(request: CrisisRequest) -> QueueEvent {
        QueueEvent::Upsert { request }
    }

    #[test]
    fn classifies_the_full_lifecycle() {
        let mut mirror = QueueMirror::new("s1");
        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Pending, 1)));

        let mut assigned = request("r1", "s1", CrisisStatus::Assigned, 1);
        assigned.volunteer_id = Some("v1".to_string());
        mirror.apply(&upsert(assigned));

        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Resolved, 1)));
        mirror.apply(&QueueEvent::Delete {
            request_id: RequestId::from("r1"),
        });

        let actions: Vec<AuditAction> = mirror.audit().entries().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Created,
                AuditAction::Assigned,
                AuditAction::Resolved,
                AuditAction::Deleted,
            ]
        );
        assert_eq!(
            mirror.audit().entries().nth(1).unwrap().details.as_deref(),
            Some("volunteer v1")
        );
        assert!(mirror.is_empty());
    }

    #[test]
    fn same_status_upsert_is_an_update() {
        let mut mirror = QueueMirror::new("s1");
        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Pending, 1)));

        let mut with_metadata = request("r1", "s1", CrisisStatus::Pending, 1);
        with_metadata.metadata = Some(serde_json::Map::new());
        mirror.apply(&upsert(with_metadata));

        let actions: Vec<AuditAction> = mirror.audit().entries().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Created, AuditAction::Updated]);
    }

    #[test]
    fn expiry_is_classified_and_clears_the_session() {
        let mut mirror = QueueMirror::new("s1");
        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Pending, 1)));
        assert_eq!(mirror.session_expires_at(), Some(1 + DEFAULT_TTL_MS));

        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Expired, 1)));
        assert_eq!(
            mirror.audit().entries().last().unwrap().action,
            AuditAction::Expired
        );
        assert_eq!(mirror.session_expires_at(), None);
    }

    #[test]
    fn session_tracks_the_most_recent_active_request() {
        let mut mirror = QueueMirror::new("s1");
        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Pending, 1)));
        mirror.apply(&upsert(request("r2", "s1", CrisisStatus::Pending, 2)));
        assert_eq!(mirror.session_expires_at(), Some(2 + DEFAULT_TTL_MS));

        mirror.apply(&QueueEvent::Delete {
            request_id: RequestId::from("r2"),
        });
        assert_eq!(mirror.session_expires_at(), Some(1 + DEFAULT_TTL_MS));
    }

    #[test]
    fn active_requests_are_scoped_to_the_viewer() {
        let mut mirror = QueueMirror::new("s1");
        mirror.apply(&upsert(request("r1", "s1", CrisisStatus::Pending, 1)));
        mirror.apply(&upsert(request("r2", "someone-else", CrisisStatus::Pending, 2)));
        mirror.apply(&upsert(request("r3", "s1", CrisisStatus::Resolved, 3)));

        let active = mirror.active_requests();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.as_str(), "r1");
        // The mirror itself still holds everything.
        assert_eq!(mirror.len(), 3);
    }

    #[tokio::test]
    async fn attached_mirror_follows_a_live_queue() {
        use haven_queue::{CreateOptions, CrisisQueueBuilder, RequestUpdate};
        use haven_storage::MemorySnapshotStore;

        let mut config = haven_config::HavenConfig::default();
        config.broadcast.channel = "audit-live".to_string();
        let queue = CrisisQueueBuilder::new(config)
            .with_store(Arc::new(MemorySnapshotStore::new()))
            .build()
            .await
            .unwrap();

        let (mirror, unsubscribe) = attach_mirror(&queue, "s1");
        let created = queue
            .create_request("s1", CrisisLevel::Critical, CreateOptions::default())
            .await
            .unwrap();
        queue
            .update_request(
                &created.id,
                RequestUpdate {
                    status: Some(CrisisStatus::Assigned),
                    volunteer_id: Some("v9".to_string()),
                    ..RequestUpdate::default()
                },
            )
            .await
            .unwrap();

        {
            let mirror = mirror.lock().unwrap();
            assert_eq!(mirror.len(), 1);
            assert_eq!(mirror.active_requests().len(), 1);
            assert_eq!(mirror.session_expires_at(), Some(created.expires_at));
            assert_eq!(mirror.audit().len(), 2);
        }

        unsubscribe();
        queue.delete_request(&created.id).await.unwrap();
        // Detached: the delete was never applied.
        assert_eq!(mirror.lock().unwrap().len(), 1);
    }
}
