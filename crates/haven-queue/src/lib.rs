// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Haven crisis queue service.
//!
//! Tracks active crisis-support requests, replicates mutations to other
//! queue instances over the local broadcast bus (and optionally a remote
//! backend), enforces per-request TTL with automatic expiry, and exposes a
//! subscription API for application state.

pub mod service;
pub mod shared;

pub use service::{
    CallbackError, CreateOptions, CrisisQueue, CrisisQueueBuilder, ErrorHandler,
    RequestUpdate, SubscriberCallback,
};
pub use shared::{destroy_shared_queue, shared_queue};
