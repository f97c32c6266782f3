// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Defensive normalization of request-shaped JSON.
//!
//! Persisted snapshots carry no version field; schema evolution relies on
//! per-field coercion at load time. The same rules apply to rows arriving
//! from a remote channel, so the helpers live here rather than in the
//! storage crate.

use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

use crate::types::{
    clamp_ttl, now_ms, CrisisLevel, CrisisRequest, CrisisStatus, RequestId, DEFAULT_TTL_MS,
};

/// Normalize one request-shaped JSON value.
///
/// Returns `None` for values that cannot represent a request at all
/// (non-objects, or objects without a string `id`). Everything else is
/// coerced field by field:
/// - unrecognized or missing `status` becomes `pending`
/// - unrecognized or missing `crisisLevel` becomes `high`
/// - non-numeric `timestamp` becomes the current time
/// - non-numeric `ttl` becomes the default TTL; the result is clamped to
///   the enforced minimum
/// - non-numeric `expiresAt` becomes now + default TTL
/// - a null `metadata` becomes absent
pub fn normalize_request(value: &Value) -> Option<CrisisRequest> {
    let obj = value.as_object()?;
    let id = obj.get("id")?.as_str()?.to_string();

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| CrisisStatus::from_str(s).ok())
        .unwrap_or(CrisisStatus::Pending);
    let crisis_level = obj
        .get("crisisLevel")
        .and_then(Value::as_str)
        .and_then(|s| CrisisLevel::from_str(s).ok())
        .unwrap_or(CrisisLevel::High);

    let now = now_ms();
    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_i64)
        .unwrap_or(now);
    let ttl = clamp_ttl(
        obj.get("ttl")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_TTL_MS),
    );
    let expires_at = obj
        .get("expiresAt")
        .and_then(Value::as_i64)
        .unwrap_or(now + DEFAULT_TTL_MS);

    let metadata = match obj.get("metadata") {
        Some(Value::Object(map)) => Some(map.clone()),
        _ => None,
    };

    Some(CrisisRequest {
        id: RequestId(id),
        student_id: obj
            .get("studentId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        crisis_level,
        status,
        timestamp,
        ttl,
        expires_at,
        post_id: obj
            .get("postId")
            .and_then(Value::as_str)
            .map(str::to_string),
        volunteer_id: obj
            .get("volunteerId")
            .and_then(Value::as_str)
            .map(str::to_string),
        metadata,
    })
}

/// Normalize a full persisted snapshot.
///
/// A missing, malformed, or non-array value is treated as an empty set.
/// Entries that fail [`normalize_request`] are dropped. The result is
/// sorted by ascending creation timestamp.
pub fn normalize_snapshot(value: &Value) -> Vec<CrisisRequest> {
    let Some(entries) = value.as_array() else {
        warn!("persisted snapshot is not an array, treating as empty");
        return Vec::new();
    };

    let mut requests: Vec<CrisisRequest> =
        entries.iter().filter_map(normalize_request).collect();
    if requests.len() < entries.len() {
        warn!(
            dropped = entries.len() - requests.len(),
            "dropped malformed snapshot entries"
        );
    }
    requests.sort_by_key(|r| r.timestamp);
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::types::MIN_TTL_MS;

    #[test]
    fn non_object_entries_are_dropped() {
        assert!(normalize_request(&json!(null)).is_none());
        assert!(normalize_request(&json!(42)).is_none());
        assert!(normalize_request(&json!("req-1")).is_none());
    }

    #[test]
    fn entry_without_id_is_dropped() {
        assert!(normalize_request(&json!({"studentId": "s1"})).is_none());
    }

    #[test]
    fn unknown_status_coerces_to_pending() {
        let req = normalize_request(&json!({
            "id": "r1",
            "studentId": "s1",
            "status": "bogus"
        }))
        .unwrap();
        assert_eq!(req.status, CrisisStatus::Pending);
    }

    #[test]
    fn non_numeric_fields_coerce_to_defaults() {
        let before = now_ms();
        let req = normalize_request(&json!({
            "id": "r1",
            "timestamp": "not-a-number",
            "ttl": "huh",
            "expiresAt": null
        }))
        .unwrap();
        let after = now_ms();

        assert!(req.timestamp >= before && req.timestamp <= after);
        assert_eq!(req.ttl, DEFAULT_TTL_MS);
        assert!(req.expires_at >= before + DEFAULT_TTL_MS);
        assert!(req.expires_at <= after + DEFAULT_TTL_MS);
    }

    #[test]
    fn tiny_persisted_ttl_is_clamped() {
        let req = normalize_request(&json!({"id": "r1", "ttl": 5})).unwrap();
        assert_eq!(req.ttl, MIN_TTL_MS);
    }

    #[test]
    fn null_metadata_becomes_absent() {
        let req = normalize_request(&json!({"id": "r1", "metadata": null})).unwrap();
        assert!(req.metadata.is_none());

        let req = normalize_request(&json!({"id": "r1", "metadata": {"note": "x"}})).unwrap();
        assert_eq!(req.metadata.unwrap()["note"], "x");
    }

    #[test]
    fn snapshot_sorts_by_timestamp_and_drops_garbage() {
        let snapshot = json!([
            {"id": "b", "timestamp": 200},
            null,
            {"id": "a", "timestamp": 100},
            "junk",
            {"id": "c", "timestamp": 150}
        ]);
        let requests = normalize_snapshot(&snapshot);
        let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn non_array_snapshot_is_empty() {
        assert!(normalize_snapshot(&json!({"oops": true})).is_empty());
        assert!(normalize_snapshot(&json!("[]")).is_empty());
    }
}
