//! Registry struct tying topics and subscriptions together.

use crate::error::{RegistryError, Result};
use crate::subscriptions::{Claim, Handler, SubscriberList, Subscription};
use crate::types::{Budget, RegistryStats, SubscriptionId, SubscriptionInfo};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Drop a topic's entry as soon as its last subscription is removed.
    /// When false, emptied topics linger as empty entries.
    pub prune_empty_topics: bool,

    /// Upper bound on live subscriptions per topic (None = unlimited).
    pub max_subscribers_per_topic: Option<usize>,
}

/// An in-process publish/subscribe registry.
///
/// Publishers broadcast a `&T` to every live subscription of a topic, in
/// registration order. Subscriptions are removed explicitly through
/// [`unsubscribe`](Self::unsubscribe) or
/// [`unsubscribe_handler`](Self::unsubscribe_handler), or implicitly once
/// their invocation budget is used up.
///
/// Handlers run with no internal lock held, so they may call back into the
/// same registry. Changes made from inside a handler do not affect which
/// subscriptions the in-progress publish visits, except that removed ones
/// are skipped.
pub struct Registry<T> {
    config: RegistryConfig,

    /// Subscriber lists by topic name.
    topics: Mutex<HashMap<String, SubscriberList<T>>>,

    publishes: AtomicU64,
    deliveries: AtomicU64,
}

impl<T: 'static> Registry<T> {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with a custom configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            topics: Mutex::new(HashMap::new()),
            publishes: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Subscribe ---

    /// Subscribe `handler` to `topic` with no invocation limit.
    pub fn subscribe(&self, topic: &str, handler: Handler<T>) -> Result<SubscriptionId> {
        self.insert(topic, handler, Budget::Unbounded)
    }

    /// Subscribe `handler` to `topic` for at most `times` invocations.
    ///
    /// The final invocation fires normally; the spent subscription is then
    /// pruned by the next publish to `topic`.
    pub fn subscribe_limited(
        &self,
        topic: &str,
        handler: Handler<T>,
        times: u64,
    ) -> Result<SubscriptionId> {
        if times == 0 {
            return Err(RegistryError::invalid(
                "invocation budget must be at least 1",
            ));
        }
        self.insert(topic, handler, Budget::Remaining(times))
    }

    /// Subscribe `handler` to `topic` for a single invocation.
    pub fn subscribe_once(&self, topic: &str, handler: Handler<T>) -> Result<SubscriptionId> {
        self.subscribe_limited(topic, handler, 1)
    }

    fn insert(&self, topic: &str, handler: Handler<T>, budget: Budget) -> Result<SubscriptionId> {
        validate_topic(topic)?;

        let mut topics = self.topics.lock();
        if let Some(limit) = self.config.max_subscribers_per_topic {
            let current = topics.get(topic).map_or(0, SubscriberList::len);
            if current >= limit {
                return Err(RegistryError::TopicFull {
                    topic: topic.to_string(),
                    limit,
                });
            }
        }

        let id = SubscriptionId::next();
        topics
            .entry(topic.to_string())
            .or_insert_with(SubscriberList::new)
            .push(Subscription {
                id,
                handler,
                budget,
            });

        tracing::debug!(topic, ?id, ?budget, "subscribed");
        Ok(id)
    }

    // --- Publish ---

    /// Invoke every live subscription of `topic` with `args`.
    ///
    /// Returns `Ok(false)` when the topic had no subscriptions at call time,
    /// `Ok(true)` otherwise, even if every subscription found was spent and
    /// got pruned instead of invoked.
    ///
    /// A handler error aborts the pass: later subscriptions are not invoked
    /// and the error is returned. A failed or panicking call does not count
    /// against the subscription's budget.
    pub fn publish(&self, topic: &str, args: &T) -> Result<bool> {
        validate_topic(topic)?;

        let pending = {
            let topics = self.topics.lock();
            match topics.get(topic) {
                Some(list) if !list.is_empty() => list.ids(),
                _ => {
                    tracing::trace!(topic, "publish with no subscribers");
                    return Ok(false);
                }
            }
        };

        self.publishes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(topic, subscribers = pending.len(), "publishing");

        // Expected position of the next pending id.
        let mut cursor = 0;
        for id in pending {
            let handler = {
                let mut topics = self.topics.lock();
                let Some(list) = topics.get_mut(topic) else {
                    // Topic dropped by a handler earlier in this pass.
                    break;
                };
                match list.claim(id, cursor) {
                    Claim::Ready(handler, pos) => {
                        cursor = pos + 1;
                        handler
                    }
                    Claim::Missing => continue,
                    Claim::Exhausted(pos) => {
                        list.remove_at(pos);
                        cursor = pos;
                        tracing::debug!(topic, ?id, "pruned exhausted subscription");
                        self.prune_if_empty(&mut topics, topic);
                        continue;
                    }
                }
            };

            // Only successful invocations count against the budget.
            let mut refund = RefundGuard {
                topics: &self.topics,
                topic,
                id,
                armed: true,
            };
            let result = handler.call(args);
            refund.armed = result.is_err();
            drop(refund);

            if let Err(source) = result {
                tracing::warn!(topic, ?id, error = %source, "handler failed");
                return Err(RegistryError::HandlerFailed {
                    topic: topic.to_string(),
                    source,
                });
            }
            self.deliveries.fetch_add(1, Ordering::Relaxed);
        }

        Ok(true)
    }

    // --- Unsubscribe ---

    /// Remove the subscription identified by `id`.
    ///
    /// Returns false if it was already removed or belongs to another registry.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.lock();
        let found = topics
            .iter_mut()
            .find_map(|(name, list)| list.remove(id).map(|_| name.clone()));

        match found {
            Some(topic) => {
                tracing::debug!(topic = %topic, ?id, "unsubscribed by handle");
                self.prune_if_empty(&mut topics, &topic);
                true
            }
            None => false,
        }
    }

    /// Remove the earliest subscription of `handler` on `topic`.
    ///
    /// Later subscriptions of the same handler to the same topic remain.
    pub fn unsubscribe_handler(&self, topic: &str, handler: &Handler<T>) -> Result<bool> {
        validate_topic(topic)?;

        let mut topics = self.topics.lock();
        let Some(list) = topics.get_mut(topic) else {
            return Ok(false);
        };
        let Some(removed) = list.remove_handler(handler) else {
            return Ok(false);
        };

        tracing::debug!(topic, id = ?removed.id, "unsubscribed by handler");
        self.prune_if_empty(&mut topics, topic);
        Ok(true)
    }

    /// Remove every subscription of `topic`, returning how many were removed.
    pub fn clear_topic(&self, topic: &str) -> Result<usize> {
        validate_topic(topic)?;

        let mut topics = self.topics.lock();
        let removed = topics.get_mut(topic).map_or(0, SubscriberList::clear);
        if removed > 0 {
            tracing::debug!(topic, removed, "cleared topic");
        }
        self.prune_if_empty(&mut topics, topic);
        Ok(removed)
    }

    /// Remove every subscription on every topic.
    pub fn clear(&self) -> usize {
        let mut topics = self.topics.lock();
        let removed = topics.values().map(SubscriberList::len).sum();
        topics.clear();
        tracing::debug!(removed, "cleared registry");
        removed
    }

    // --- Inspection ---

    /// Live subscriptions on `topic`, including spent ones awaiting pruning.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, SubscriberList::len)
    }

    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Subscriptions across all topics.
    pub fn subscription_count(&self) -> usize {
        self.topics.lock().values().map(SubscriberList::len).sum()
    }

    /// Names of topics with at least one subscription, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .topics
            .lock()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Look up a live subscription by handle.
    pub fn subscription(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        let topics = self.topics.lock();
        topics.iter().find_map(|(name, list)| {
            list.get(id).map(|sub| SubscriptionInfo {
                id,
                topic: name.clone(),
                budget: sub.budget,
            })
        })
    }

    /// Live subscriptions of `topic`, in registration order.
    pub fn subscriptions(&self, topic: &str) -> Vec<SubscriptionInfo> {
        let topics = self.topics.lock();
        topics.get(topic).map_or_else(Vec::new, |list| {
            list.iter()
                .map(|sub| SubscriptionInfo {
                    id: sub.id,
                    topic: topic.to_string(),
                    budget: sub.budget,
                })
                .collect()
        })
    }

    pub fn stats(&self) -> RegistryStats {
        let topics = self.topics.lock();
        RegistryStats {
            topics: topics.values().filter(|list| !list.is_empty()).count(),
            subscriptions: topics.values().map(SubscriberList::len).sum(),
            publishes: self.publishes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
        }
    }

    fn prune_if_empty(&self, topics: &mut HashMap<String, SubscriberList<T>>, topic: &str) {
        if !self.config.prune_empty_topics {
            return;
        }
        if topics.get(topic).is_some_and(SubscriberList::is_empty) {
            topics.remove(topic);
        }
    }
}

impl<T: 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a claimed invocation unless disarmed, including when the handler
/// panics.
struct RefundGuard<'a, T> {
    topics: &'a Mutex<HashMap<String, SubscriberList<T>>>,
    topic: &'a str,
    id: SubscriptionId,
    armed: bool,
}

impl<T> Drop for RefundGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(list) = self.topics.lock().get_mut(self.topic) {
            list.refund(self.id);
        }
    }
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(RegistryError::invalid("topic must be a non-empty string"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Handler<i32>, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Handler::new(move |v: &i32| sink.lock().push(*v)), seen)
    }

    #[test]
    fn test_publish_without_subscribers() {
        let registry: Registry<i32> = Registry::new();
        assert!(!registry.publish("a", &1).unwrap());
        assert_eq!(registry.stats().publishes, 0);
    }

    #[test]
    fn test_single_use_subscription_lifecycle() {
        let registry = Registry::new();
        let (h, seen) = recorder();
        let id = registry.subscribe_limited("a", h, 1).unwrap();

        assert!(registry.publish("a", &42).unwrap());
        assert_eq!(*seen.lock(), vec![42]);

        // Spent but still present until the next publish.
        let info = registry.subscription(id).unwrap();
        assert_eq!(info.budget, Budget::Remaining(0));
        assert_eq!(registry.subscriber_count("a"), 1);

        assert!(registry.publish("a", &99).unwrap());
        assert_eq!(*seen.lock(), vec![42]);
        assert_eq!(registry.subscriber_count("a"), 0);
        assert!(registry.subscription(id).is_none());

        assert!(!registry.publish("a", &7).unwrap());
    }

    #[test]
    fn test_empty_topic_entry_lingers_by_default() {
        let registry = Registry::new();
        let (h, _) = recorder();
        let id = registry.subscribe("a", h).unwrap();
        assert!(registry.unsubscribe(id));

        assert_eq!(registry.topics.lock().len(), 1);
        assert!(registry.topics().is_empty());
        assert!(!registry.publish("a", &1).unwrap());
    }

    #[test]
    fn test_prune_empty_topics() {
        let registry = Registry::with_config(RegistryConfig {
            prune_empty_topics: true,
            ..Default::default()
        });
        let (h, _) = recorder();
        registry.subscribe_once("a", h.clone()).unwrap();
        registry.subscribe("b", h.clone()).unwrap();

        registry.publish("a", &1).unwrap();
        registry.publish("a", &2).unwrap();
        assert!(!registry.topics.lock().contains_key("a"));

        assert!(registry.unsubscribe_handler("b", &h).unwrap());
        assert!(registry.topics.lock().is_empty());
    }

    #[test]
    fn test_topic_capacity() {
        let registry = Registry::with_config(RegistryConfig {
            max_subscribers_per_topic: Some(2),
            ..Default::default()
        });
        let (h, _) = recorder();
        registry.subscribe("a", h.clone()).unwrap();
        registry.subscribe("a", h.clone()).unwrap();

        let result = registry.subscribe("a", h.clone());
        assert!(matches!(
            result,
            Err(RegistryError::TopicFull { limit: 2, .. })
        ));
        assert_eq!(registry.subscriber_count("a"), 2);

        // Other topics are unaffected.
        registry.subscribe("b", h).unwrap();
    }

    #[test]
    fn test_subscriptions_listing() {
        let registry = Registry::new();
        let (h, _) = recorder();
        let a = registry.subscribe("t", h.clone()).unwrap();
        let b = registry.subscribe_limited("t", h, 2).unwrap();

        assert!(registry.has_subscribers("t"));
        assert!(!registry.has_subscribers("u"));

        let listed = registry.subscriptions("t");
        assert_eq!(listed.len(), 2);
        assert_eq!((listed[0].id, listed[0].budget), (a, Budget::Unbounded));
        assert_eq!((listed[1].id, listed[1].budget), (b, Budget::Remaining(2)));
        assert!(registry.subscriptions("u").is_empty());
    }

    #[test]
    fn test_stats_track_deliveries() {
        let registry = Registry::new();
        let (h, _) = recorder();
        registry.subscribe("a", h.clone()).unwrap();
        registry.subscribe("a", h).unwrap();

        registry.publish("a", &1).unwrap();
        registry.publish("a", &2).unwrap();
        registry.publish("b", &3).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.topics, 1);
        assert_eq!(stats.subscriptions, 2);
        assert_eq!(stats.publishes, 2);
        assert_eq!(stats.deliveries, 4);
    }
}
