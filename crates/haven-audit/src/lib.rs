// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consumer adapter for the Haven crisis queue.
//!
//! Applications that render or review crisis activity subscribe to the
//! queue and keep two derived views: a live mirror of the request map
//! scoped to a viewing identity, and a bounded, short-retention audit
//! trail of what happened. Neither view ever mutates the queue.

pub mod log;
pub mod mirror;

pub use log::{AuditAction, AuditLog, CrisisAuditEntry, AUDIT_RETENTION_MS, DEFAULT_AUDIT_CAP};
pub use mirror::{attach_mirror, QueueMirror};
