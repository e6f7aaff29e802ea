//! Process-local resource leases.
//!
//! Desktop operating systems offer no wake or Wi-Fi locks to an ordinary
//! process, so a lease here is bookkeeping: a reference count per kind that
//! other components (an inhibitor integration, the UI) can observe.

use bridge_traits::{
    error::Result,
    lease::{LeaseKind, LeaseProvider, ResourceLease},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Holders = Arc<Mutex<HashMap<LeaseKind, usize>>>;

/// Reference-counted [`LeaseProvider`].
#[derive(Debug, Clone, Default)]
pub struct ProcessLeaseProvider {
    holders: Holders,
}

impl ProcessLeaseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding leases of `kind`.
    pub fn held(&self, kind: LeaseKind) -> usize {
        self.holders.lock().get(&kind).copied().unwrap_or(0)
    }
}

impl LeaseProvider for ProcessLeaseProvider {
    fn acquire(&self, kind: LeaseKind, tag: &str) -> Result<Box<dyn ResourceLease>> {
        let mut holders = self.holders.lock();
        let count = holders.entry(kind).or_insert(0);
        *count += 1;
        if *count == 1 {
            debug!(kind = kind.as_str(), tag, "Lease engaged");
        }

        Ok(Box::new(ProcessLease {
            kind,
            holders: Arc::clone(&self.holders),
            released: false,
        }))
    }
}

struct ProcessLease {
    kind: LeaseKind,
    holders: Holders,
    released: bool,
}

impl ResourceLease for ProcessLease {
    fn kind(&self) -> LeaseKind {
        self.kind
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut holders = self.holders.lock();
        if let Some(count) = holders.get_mut(&self.kind) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                holders.remove(&self.kind);
                debug!(kind = self.kind.as_str(), "Lease released by last holder");
            }
        }
    }
}

impl Drop for ProcessLease {
    fn drop(&mut self) {
        self.release();
    }
}
