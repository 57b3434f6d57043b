//! Client subscriptions and change fan-out

use crate::{Entry, Envelope, HandleId, RegistryError, Result, SharedHandle, SubscriberHandle};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// SubscriptionRegistry tracks which handles want pushes for which service id
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    subscribers: Arc<DashMap<String, HashMap<HandleId, SharedHandle>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start pushing changes of `requester.service_id` to `handle`
    ///
    /// `requester` only names the service and identifies the subscriber in
    /// logs. Subscribing the same handle twice changes nothing.
    pub fn subscribe(&self, requester: &Entry, handle: SharedHandle) -> Result<()> {
        requester.validate()?;

        let handle_id = handle.id();
        let mut set = self
            .subscribers
            .entry(requester.service_id.clone())
            .or_default();
        if set.contains_key(&handle_id) {
            debug!("Handle {} already subscribed: {}", handle_id, requester);
        } else {
            set.insert(handle_id, handle);
            debug!("Handle {} subscribed: {}", handle_id, requester);
        }
        Ok(())
    }

    /// Stop pushing changes of `requester.service_id` to `handle`
    pub fn unsubscribe(&self, requester: &Entry, handle: &dyn SubscriberHandle) -> Result<()> {
        requester.validate()?;

        let handle_id = handle.id();
        let now_empty = match self.subscribers.get_mut(&requester.service_id) {
            Some(mut set) if !set.is_empty() => {
                if set.remove(&handle_id).is_some() {
                    debug!("Handle {} unsubscribed: {}", handle_id, requester);
                } else {
                    info!("Handle {} was not subscribed: {}", handle_id, requester);
                }
                set.is_empty()
            }
            _ => {
                info!("Subscriber set is empty, nothing to remove: {}", requester);
                return Ok(());
            }
        };

        if now_empty {
            self.subscribers
                .remove_if(&requester.service_id, |_, set| set.is_empty());
        }
        Ok(())
    }

    /// Push `entries` to every handle subscribed to `service_id`
    ///
    /// The subscriber set is snapshotted first, so concurrent (un)subscribes
    /// are never blocked by delivery. Each handle gets its own envelope with a
    /// fresh seq id. A failing handle is logged and skipped; the returned count
    /// is the number of handles that accepted the envelope.
    pub fn notify(&self, service_id: &str, entries: &[Entry]) -> Result<usize> {
        if service_id.is_empty() {
            return Err(RegistryError::empty_field("serviceId"));
        }

        let snapshot = self.snapshot(service_id);
        if snapshot.is_empty() {
            info!("No subscribers to notify for service: {}", service_id);
            return Ok(0);
        }

        let mut delivered = 0;
        for handle in &snapshot {
            match handle.send(Envelope::notify(entries.to_vec())) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Notify {} for service {} failed: {}", handle.id(), service_id, e),
            }
        }

        debug!(
            "Notified {}/{} subscribers of service {} ({} endpoints)",
            delivered,
            snapshot.len(),
            service_id,
            entries.len()
        );
        Ok(delivered)
    }

    /// Drop a closed handle from every subscriber set
    ///
    /// Returns the service ids the handle was subscribed to.
    pub fn on_handle_closed(&self, handle_id: HandleId) -> Vec<String> {
        let mut removed_from = Vec::new();
        self.subscribers.retain(|service_id, set| {
            if set.remove(&handle_id).is_some() {
                removed_from.push(service_id.clone());
            }
            !set.is_empty()
        });
        removed_from.sort();

        if removed_from.is_empty() {
            debug!("Closed handle {} had no subscriptions", handle_id);
        } else {
            info!("Closed handle {} removed from {:?}", handle_id, removed_from);
        }
        removed_from
    }

    pub fn subscriber_count(&self, service_id: &str) -> usize {
        self.subscribers
            .get(service_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    fn snapshot(&self, service_id: &str) -> Vec<SharedHandle> {
        self.subscribers
            .get(service_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageType;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingHandle {
        id: HandleId,
        fail: bool,
        sent: Mutex<Vec<Envelope>>,
    }

    impl RecordingHandle {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::new(),
                fail: false,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::new(),
                fail: true,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<Envelope> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl SubscriberHandle for RecordingHandle {
        fn id(&self) -> HandleId {
            self.id
        }

        fn send(&self, envelope: Envelope) -> Result<()> {
            if self.fail {
                return Err(RegistryError::Delivery {
                    handle: self.id.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            self.sent.lock().unwrap().push(envelope);
            Ok(())
        }
    }

    fn requester() -> Entry {
        Entry::new("svc-A", "10.0.1.1", 7000)
    }

    #[test]
    fn test_notify_fans_out_to_all_subscribers() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        let c2 = RecordingHandle::new();
        registry.subscribe(&requester(), c1.clone()).unwrap();
        registry.subscribe(&requester(), c2.clone()).unwrap();

        let list = vec![Entry::new("svc-A", "10.0.0.1", 8080)];
        assert_eq!(registry.notify("svc-A", &list).unwrap(), 2);

        for handle in [&c1, &c2] {
            let sent = handle.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].message_type(), MessageType::RegisterNotify);
            assert_eq!(sent[0].body, list);
        }
        assert_ne!(c1.sent()[0].seq_id(), c2.sent()[0].seq_id());
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        registry.subscribe(&requester(), c1.clone()).unwrap();
        registry.subscribe(&requester(), c1.clone()).unwrap();

        assert_eq!(registry.subscriber_count("svc-A"), 1);
        registry.notify("svc-A", &[]).unwrap();
        assert_eq!(c1.sent().len(), 1);
    }

    #[test]
    fn test_unsubscribed_handle_is_skipped() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        let c2 = RecordingHandle::new();
        registry.subscribe(&requester(), c1.clone()).unwrap();
        registry.subscribe(&requester(), c2.clone()).unwrap();

        registry.unsubscribe(&requester(), &*c1).unwrap();
        assert_eq!(registry.notify("svc-A", &[]).unwrap(), 1);

        assert!(c1.sent().is_empty());
        assert_eq!(c2.sent().len(), 1);
    }

    #[test]
    fn test_unsubscribe_without_subscribers_is_noop() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        registry.unsubscribe(&requester(), &*c1).unwrap();
        assert_eq!(registry.subscriber_count("svc-A"), 0);

        let other = Entry::new("svc-B", "10.0.1.1", 7000);
        registry.subscribe(&other, c1.clone()).unwrap();
        registry.unsubscribe(&requester(), &*c1).unwrap();
        assert_eq!(registry.subscriber_count("svc-B"), 1);
    }

    #[test]
    fn test_notify_without_subscribers_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.notify("svc-A", &[]).unwrap(), 0);
    }

    #[test]
    fn test_failing_handle_does_not_block_others() {
        let registry = SubscriptionRegistry::new();
        let broken = RecordingHandle::failing();
        let healthy = RecordingHandle::new();
        registry.subscribe(&requester(), broken.clone()).unwrap();
        registry.subscribe(&requester(), healthy.clone()).unwrap();

        assert_eq!(registry.notify("svc-A", &[]).unwrap(), 1);
        assert_eq!(healthy.sent().len(), 1);
        assert_eq!(registry.subscriber_count("svc-A"), 2);
    }

    #[test]
    fn test_invalid_arguments() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        assert!(matches!(
            registry.subscribe(&Entry::new("", "10.0.1.1", 7000), c1.clone()),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.unsubscribe(&Entry::new("svc-A", "", 7000), &*c1),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(matches!(registry.notify("", &[]), Err(RegistryError::InvalidArgument(_))));
        assert_eq!(registry.subscriber_count(""), 0);
    }

    #[test]
    fn test_closed_handle_removed_everywhere() {
        let registry = SubscriptionRegistry::new();
        let c1 = RecordingHandle::new();
        let c2 = RecordingHandle::new();
        registry.subscribe(&requester(), c1.clone()).unwrap();
        registry.subscribe(&Entry::new("svc-B", "10.0.1.1", 7000), c1.clone()).unwrap();
        registry.subscribe(&requester(), c2.clone()).unwrap();

        let removed = registry.on_handle_closed(c1.id());
        assert_eq!(removed, vec!["svc-A".to_string(), "svc-B".to_string()]);
        assert_eq!(registry.subscriber_count("svc-A"), 1);
        assert_eq!(registry.subscriber_count("svc-B"), 0);

        assert!(registry.on_handle_closed(c1.id()).is_empty());
    }

    #[test]
    fn test_subscribe_during_fan_out() {
        let registry = SubscriptionRegistry::new();
        for _ in 0..16 {
            registry.subscribe(&requester(), RecordingHandle::new()).unwrap();
        }

        std::thread::scope(|scope| {
            let notifier = registry.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    let delivered = notifier.notify("svc-A", &[]).unwrap();
                    assert!(delivered >= 16);
                }
            });
            let subscriber = registry.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    subscriber.subscribe(&requester(), RecordingHandle::new()).unwrap();
                }
            });
        });

        assert_eq!(registry.subscriber_count("svc-A"), 116);
    }
}
