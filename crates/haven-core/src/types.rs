// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types for the crisis queue: the request record, its status and
//! level enums, and the event union delivered to subscribers and transports.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Hard floor for a request's time-to-live, in milliseconds. Enforced on
/// every input path (creation, persisted snapshots, remote rows).
pub const MIN_TTL_MS: i64 = 60_000;

/// Default time-to-live when the caller does not supply one (15 minutes).
pub const DEFAULT_TTL_MS: i64 = 900_000;

/// Current logical clock value: milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Clamp a requested TTL to the enforced minimum.
pub fn clamp_ttl(ttl_ms: i64) -> i64 {
    ttl_ms.max(MIN_TTL_MS)
}

/// Opaque unique identifier for a crisis request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh identifier (UUIDv4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Severity of a crisis escalation. Immutable after creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CrisisLevel {
    High,
    Critical,
}

/// Lifecycle state of a crisis request.
///
/// `Resolved` and `Expired` are terminal: once reached, no automatic
/// transition ever fires for the request again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CrisisStatus {
    Pending,
    Assigned,
    Resolved,
    Expired,
}

impl CrisisStatus {
    /// True for statuses after which no expiry timer may run.
    pub fn is_terminal(self) -> bool {
        matches!(self, CrisisStatus::Resolved | CrisisStatus::Expired)
    }
}

/// One active or historical crisis-support escalation.
///
/// Serializes with the camelCase field names used by the persisted snapshot
/// layout and the broadcast wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisRequest {
    pub id: RequestId,
    pub student_id: String,
    pub crisis_level: CrisisLevel,
    pub status: CrisisStatus,
    /// Creation time (ms since epoch). Immutable.
    pub timestamp: i64,
    /// Time-to-live in ms; always >= [`MIN_TTL_MS`] after normalization.
    pub ttl: i64,
    /// `timestamp + ttl`, fixed at creation. Updates never recompute it.
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_id: Option<String>,
    /// Open contextual key/value map; shallow-merged on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Event union delivered to subscribers and sent over the replication
/// transports.
///
/// Wire shape: `{"type":"upsert","request":{...}}` or
/// `{"type":"delete","requestId":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueEvent {
    /// The request was created or changed; carries its full current state.
    Upsert { request: CrisisRequest },
    /// The request no longer exists; carries only its id.
    Delete {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
}

impl QueueEvent {
    /// The id of the request this event concerns.
    pub fn request_id(&self) -> &RequestId {
        match self {
            QueueEvent::Upsert { request } => &request.id,
            QueueEvent::Delete { request_id } => request_id,
        }
    }
}
