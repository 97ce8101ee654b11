//! Core types for the registry.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter so ids never collide across registry instances.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one subscription.
///
/// Only `subscribe*` can mint one. Handles are compared by equality only and
/// are never reused, even after the subscription is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Remaining number of invocations for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Fires on every publish until removed.
    Unbounded,
    /// Fires this many more times.
    ///
    /// `Remaining(0)` means the final invocation already happened and the
    /// subscription will be pruned by the next publish to its topic.
    Remaining(u64),
}

impl Budget {
    /// True once no further invocation is permitted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Budget::Remaining(0))
    }

    /// Consume one invocation. Returns false if already exhausted.
    pub(crate) fn consume(&mut self) -> bool {
        match self {
            Budget::Unbounded => true,
            Budget::Remaining(0) => false,
            Budget::Remaining(n) => {
                *n -= 1;
                true
            }
        }
    }

    /// Give back an invocation claimed by a call that failed.
    pub(crate) fn refund(&mut self) {
        if let Budget::Remaining(n) = self {
            *n += 1;
        }
    }
}

/// Snapshot of a single live subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub topic: String,
    pub budget: Budget,
}

/// Registry statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Topics with at least one subscription.
    pub topics: usize,
    pub subscriptions: usize,
    /// Publishes that found at least one subscriber.
    pub publishes: u64,
    /// Successful handler invocations.
    pub deliveries: u64,
}
