//! Per-attempt resource leases.

use bridge_traits::{LeaseKind, LeaseProvider, ResourceLease};
use tracing::{debug, warn};

/// Leases held for the duration of one transfer attempt.
///
/// Releasing happens in `Drop`, so every exit path of the attempt (success,
/// failure, cancellation, panic unwinding) gives the resources back.
pub struct LeaseScope {
    tag: String,
    held: Vec<Box<dyn ResourceLease>>,
}

impl LeaseScope {
    /// Acquires keep-network, plus keep-awake when `keep_awake` is set.
    ///
    /// A lease the provider refuses is logged and skipped; the transfer still
    /// runs without it.
    pub fn acquire(provider: &dyn LeaseProvider, keep_awake: bool, tag: &str) -> Self {
        let mut kinds = vec![LeaseKind::KeepNetwork];
        if keep_awake {
            kinds.push(LeaseKind::KeepAwake);
        }

        let mut held = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match provider.acquire(kind, tag) {
                Ok(lease) => {
                    debug!(tag, lease = kind.as_str(), "Lease acquired");
                    held.push(lease);
                }
                Err(e) => warn!(tag, lease = kind.as_str(), error = %e, "Lease unavailable"),
            }
        }

        Self {
            tag: tag.to_string(),
            held,
        }
    }

    pub fn kinds(&self) -> Vec<LeaseKind> {
        self.held.iter().map(|lease| lease.kind()).collect()
    }

    /// Releases everything now instead of at drop.
    pub fn release(&mut self) {
        for mut lease in self.held.drain(..) {
            lease.release();
            debug!(tag = %self.tag, lease = lease.kind().as_str(), "Lease released");
        }
    }
}

impl Drop for LeaseScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LeaseScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseScope")
            .field("tag", &self.tag)
            .field("held", &self.kinds())
            .finish()
    }
}
