// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide shared queue accessor.
//!
//! Explicit, caller-owned instances built through [`CrisisQueueBuilder`]
//! are the primary API; this module covers embedders that want the
//! one-instance-per-process lifecycle without threading a handle through
//! every call site. The shared instance is lazily constructed from the
//! default configuration on first access and reset on destroy, so the next
//! access builds a fresh one.

use tokio::sync::Mutex;

use haven_config::HavenConfig;
use haven_core::HavenError;

use crate::service::{CrisisQueue, CrisisQueueBuilder};

static SHARED: Mutex<Option<CrisisQueue>> = Mutex::const_new(None);

/// Get the shared queue, constructing it if absent or destroyed.
pub async fn shared_queue() -> Result<CrisisQueue, HavenError> {
    let mut guard = SHARED.lock().await;
    if let Some(queue) = guard.as_ref() {
        if !queue.is_destroyed() {
            return Ok(queue.clone());
        }
    }
    let queue = CrisisQueueBuilder::new(HavenConfig::default())
        .build()
        .await?;
    *guard = Some(queue.clone());
    Ok(queue)
}

/// Destroy the shared queue if one exists. Idempotent.
pub async fn destroy_shared_queue() {
    let mut guard = SHARED.lock().await;
    if let Some(queue) = guard.take() {
        queue.destroy().await;
    }
}
