// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replication transports for the Haven crisis queue.
//!
//! The local broadcast bus propagates mutations between queue instances in
//! the same process; the remote module translates row changes from an
//! optional remote backend into the internal event union.

pub mod local;
pub mod remote;

pub use local::{Envelope, LocalBroadcast};
pub use remote::translate_remote_change;
