//! Scoped device resource leases.
//!
//! A lease keeps a process-wide resource alive (the CPU awake, the network
//! radio up) for as long as it is held. Leases are acquired for exactly one
//! transfer attempt and released when that attempt ends, whichever way it
//! ends. [`ResourceLease::release`] must be idempotent because the core calls
//! it from a drop guard.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kinds of device resources a transfer may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseKind {
    /// Keep the device from sleeping.
    KeepAwake,
    /// Keep the network interface active (e.g. a Wi-Fi lock).
    KeepNetwork,
}

impl LeaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseKind::KeepAwake => "keep_awake",
            LeaseKind::KeepNetwork => "keep_network",
        }
    }
}

/// A held lease.
pub trait ResourceLease: Send {
    fn kind(&self) -> LeaseKind;

    /// Gives the resource back. Calling it more than once has no effect.
    fn release(&mut self);
}

/// Hands out leases.
pub trait LeaseProvider: Send + Sync {
    /// Acquires a lease of `kind`. `tag` identifies the holder in host logs.
    fn acquire(&self, kind: LeaseKind, tag: &str) -> Result<Box<dyn ResourceLease>>;
}

/// Provider for hosts without lease semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLeaseProvider;

struct NoopLease(LeaseKind);

impl ResourceLease for NoopLease {
    fn kind(&self) -> LeaseKind {
        self.0
    }

    fn release(&mut self) {}
}

impl LeaseProvider for NoopLeaseProvider {
    fn acquire(&self, kind: LeaseKind, _tag: &str) -> Result<Box<dyn ResourceLease>> {
        Ok(Box::new(NoopLease(kind)))
    }
}
