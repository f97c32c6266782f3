// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, short-retention audit trail of crisis queue activity.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum::Display;

use haven_core::RequestId;

/// Default maximum number of retained entries.
pub const DEFAULT_AUDIT_CAP: usize = 50;

/// Entries older than this are purged (24 hours, in milliseconds).
pub const AUDIT_RETENTION_MS: i64 = 24 * 60 * 60 * 1000;

/// What happened to a crisis request, from the consumer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuditAction {
    Created,
    Assigned,
    Resolved,
    Expired,
    Updated,
    Deleted,
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisAuditEntry {
    pub id: String,
    pub request_id: RequestId,
    pub action: AuditAction,
    /// Milliseconds since the Unix epoch.
    pub at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CrisisAuditEntry {
    pub fn new(request_id: RequestId, action: AuditAction, at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            action,
            at,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Capped FIFO audit log. Crisis data is sensitive: retention is bounded
/// both by entry count and by age, and eviction is silent.
#[derive(Debug)]
pub struct AuditLog {
    entries: VecDeque<CrisisAuditEntry>,
    cap: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.max(1)),
            cap: cap.max(1),
        }
    }

    /// Append an entry, evicting the oldest when at capacity.
    pub fn record(&mut self, entry: CrisisAuditEntry) {
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Drop entries older than [`AUDIT_RETENTION_MS`] relative to `now`.
    pub fn purge_expired(&mut self, now: i64) {
        while let Some(front) = self.entries.front() {
            if now - front.at >= AUDIT_RETENTION_MS {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Entries in insertion order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &CrisisAuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
