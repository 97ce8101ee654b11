//! Ordered subscriber list for a single topic.

use super::handler::Handler;
use crate::types::{Budget, SubscriptionId};

/// A subscription record.
pub(crate) struct Subscription<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) handler: Handler<T>,
    pub(crate) budget: Budget,
}

/// Outcome of claiming one invocation for a subscription.
pub(crate) enum Claim<T> {
    /// Budget was consumed; the caller must invoke the handler.
    Ready(Handler<T>, usize),
    /// Budget ran out on an earlier publish; the entry at this position
    /// should be pruned.
    Exhausted(usize),
    /// No such entry (removed since the publish snapshot was taken).
    Missing,
}

/// Subscriptions of one topic, in registration order.
pub(crate) struct SubscriberList<T> {
    entries: Vec<Subscription<T>>,
}

impl<T> SubscriberList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, subscription: Subscription<T>) {
        self.entries.push(subscription);
    }

    /// Ids in registration order.
    pub(crate) fn ids(&self) -> Vec<SubscriptionId> {
        self.entries.iter().map(|s| s.id).collect()
    }

    pub(crate) fn get(&self, id: SubscriptionId) -> Option<&Subscription<T>> {
        self.entries.iter().find(|s| s.id == id)
    }

    /// Position of `id`, checking `hint` before scanning.
    fn locate(&self, id: SubscriptionId, hint: usize) -> Option<usize> {
        match self.entries.get(hint) {
            Some(sub) if sub.id == id => Some(hint),
            _ => self.entries.iter().position(|s| s.id == id),
        }
    }

    /// Consume one invocation from the subscription's budget.
    ///
    /// `hint` is where the entry is expected to be; a stale hint only costs
    /// a scan.
    pub(crate) fn claim(&mut self, id: SubscriptionId, hint: usize) -> Claim<T> {
        let Some(pos) = self.locate(id, hint) else {
            return Claim::Missing;
        };
        let sub = &mut self.entries[pos];
        if sub.budget.consume() {
            Claim::Ready(sub.handler.clone(), pos)
        } else {
            Claim::Exhausted(pos)
        }
    }

    /// Return the invocation taken by [`claim`](Self::claim) after a failed call.
    pub(crate) fn refund(&mut self, id: SubscriptionId) -> bool {
        match self.entries.iter_mut().find(|s| s.id == id) {
            Some(sub) => {
                sub.budget.refund();
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_at(&mut self, pos: usize) -> Subscription<T> {
        self.entries.remove(pos)
    }

    /// Remove by handle.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<Subscription<T>> {
        let pos = self.entries.iter().position(|s| s.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Remove the earliest subscription whose handler is `handler`.
    pub(crate) fn remove_handler(&mut self, handler: &Handler<T>) -> Option<Subscription<T>> {
        let pos = self
            .entries
            .iter()
            .position(|s| s.handler.same_as(handler))?;
        Some(self.entries.remove(pos))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Subscription<T>> {
        self.entries.iter()
    }

    /// Drop every subscription, returning how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}
