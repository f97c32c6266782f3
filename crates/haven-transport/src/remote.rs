// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of remote row-change notifications into queue events.

use tracing::warn;

use haven_core::{
    normalize_request, QueueEvent, RemoteChange, RemoteChangeKind, RequestId,
};

/// Translate one row-level change into the internal event union.
///
/// Inserts and updates take the new row through the same defensive
/// normalization as persisted snapshots; deletes only need an id from the
/// old row. Untranslatable changes are dropped with a warning rather than
/// surfaced as errors, matching the best-effort replication policy.
pub fn translate_remote_change(change: &RemoteChange) -> Option<QueueEvent> {
    match change.kind {
        RemoteChangeKind::Insert | RemoteChangeKind::Update => {
            let request = change.new_row.as_ref().and_then(normalize_request);
            if request.is_none() {
                warn!(kind = ?change.kind, "dropping untranslatable remote row change");
            }
            request.map(|request| QueueEvent::Upsert { request })
        }
        RemoteChangeKind::Delete => {
            let id = change
                .old_row
                .as_ref()
                .and_then(|row| row.get("id"))
                .and_then(|v| v.as_str());
            if id.is_none() {
                warn!("dropping remote delete without an old-row id");
            }
            id.map(|id| QueueEvent::Delete {
                request_id: RequestId::from(id),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{CrisisStatus, MIN_TTL_MS};
    use serde_json::json;

    #[test]
    fn insert_translates_to_upsert_with_normalization() {
        let change = RemoteChange {
            kind: RemoteChangeKind::Insert,
            new_row: Some(json!({"id": "r1", "status": "weird", "ttl": 1})),
            old_row: None,
        };
        let event = translate_remote_change(&change).unwrap();
        match event {
            QueueEvent::Upsert { request } => {
                assert_eq!(request.id.as_str(), "r1");
                assert_eq!(request.status, CrisisStatus::Pending);
                assert_eq!(request.ttl, MIN_TTL_MS);
            }
            other => panic!("expected upsert, got {other:?}"),
        }
    }

    #[test]
    fn delete_takes_id_from_old_row() {
        let change = RemoteChange {
            kind: RemoteChangeKind::Delete,
            new_row: None,
            old_row: Some(json!({"id": "r2"})),
        };
        let event = translate_remote_change(&change).unwrap();
        assert_eq!(event.request_id().as_str(), "r2");
    }

    #[test]
    fn untranslatable_changes_are_dropped() {
        let no_row = RemoteChange {
            kind: RemoteChangeKind::Update,
            new_row: None,
            old_row: None,
        };
        assert!(translate_remote_change(&no_row).is_none());

        let delete_without_id = RemoteChange {
            kind: RemoteChangeKind::Delete,
            new_row: None,
            old_row: Some(json!({"not_id": true})),
        };
        assert!(translate_remote_change(&delete_without_id).is_none());
    }
}
