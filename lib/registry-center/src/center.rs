//! Registry center: ties endpoint changes to subscriber pushes

use crate::{CenterConfig, ChannelHandle};
use registry_core::{
    Entry, Envelope, HandleId, MessageType, RegistryError, Result, ServiceRegistry, SharedHandle,
    SubscriberHandle, SubscriptionRegistry,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// RegistryCenter owns both registries and is the surface a transport binds to
#[derive(Clone, Default)]
pub struct RegistryCenter {
    services: ServiceRegistry,
    subscriptions: SubscriptionRegistry,
    config: CenterConfig,
}

impl RegistryCenter {
    pub fn new(config: CenterConfig) -> Self {
        Self {
            services: ServiceRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &CenterConfig {
        &self.config
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Register an endpoint and push the updated list to subscribers
    pub fn register(&self, entry: Entry) -> Result<Vec<Entry>> {
        let service_id = entry.service_id.clone();
        let list = self.services.register(entry)?;
        self.publish(&service_id, &list);
        Ok(list)
    }

    /// Remove an endpoint and push the remaining list to subscribers
    pub fn unregister(&self, entry: &Entry) -> Result<Vec<Entry>> {
        let list = self.services.unregister(entry)?;
        self.publish(&entry.service_id, &list);
        Ok(list)
    }

    pub fn lookup(&self, service_id: &str) -> Result<Vec<Entry>> {
        self.services.lookup(service_id)
    }

    /// Subscribe `handle` and return the current list as the initial pull
    pub fn subscribe(&self, requester: &Entry, handle: SharedHandle) -> Result<Vec<Entry>> {
        self.subscriptions.subscribe(requester, handle)?;
        self.services.lookup(&requester.service_id)
    }

    pub fn unsubscribe(&self, requester: &Entry, handle: &dyn SubscriberHandle) -> Result<()> {
        self.subscriptions.unsubscribe(requester, handle)
    }

    /// Create a queue-backed handle for a newly accepted peer connection
    pub fn open_handle(&self, peer: impl Into<String>) -> (Arc<ChannelHandle>, mpsc::Receiver<Envelope>) {
        ChannelHandle::channel(peer, self.config.outbound_capacity)
    }

    /// Called by the transport when a connection goes away
    pub fn on_handle_closed(&self, handle_id: HandleId) -> Vec<String> {
        self.subscriptions.on_handle_closed(handle_id)
    }

    /// Answer one inbound request envelope received on `origin`'s connection
    ///
    /// The reply carries the request's seq id: RESPONSE with the resulting
    /// endpoint list, or ERROR when the request was rejected.
    pub fn handle_message(&self, envelope: Envelope, origin: &SharedHandle) -> Envelope {
        let seq_id = envelope.header.seq_id.clone();
        let message_type = envelope.message_type();

        match self.dispatch(envelope, origin) {
            Ok(body) => Envelope::response(seq_id, body),
            Err(e) => {
                warn!("Rejected {:?} request {} from {}: {}", message_type, seq_id, origin.id(), e);
                Envelope::error(seq_id)
            }
        }
    }

    fn dispatch(&self, envelope: Envelope, origin: &SharedHandle) -> Result<Vec<Entry>> {
        let message_type = envelope.message_type();
        if !message_type.is_request() {
            return Err(RegistryError::UnsupportedMessage(format!(
                "{:?} is not a registry request",
                message_type
            )));
        }

        let entry = envelope
            .body
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::InvalidArgument("entry must be present".to_string()))?;

        debug!("Handling {:?} for {} from {}", message_type, entry, origin.id());
        match message_type {
            MessageType::Register => self.register(entry),
            MessageType::UnRegister => self.unregister(&entry),
            MessageType::Subscribe => self.subscribe(&entry, origin.clone()),
            MessageType::UnSubscribe => {
                self.unsubscribe(&entry, &**origin)?;
                Ok(Vec::new())
            }
            MessageType::LookUp => self.lookup(&entry.service_id),
            MessageType::RegisterNotify | MessageType::Response | MessageType::Error => {
                Err(RegistryError::UnsupportedMessage(format!("{:?}", message_type)))
            }
        }
    }

    fn publish(&self, service_id: &str, list: &[Entry]) {
        if !self.config.notify_on_change {
            debug!("Change notification disabled, not notifying {}", service_id);
            return;
        }
        if let Err(e) = self.subscriptions.notify(service_id, list) {
            warn!("Failed to notify subscribers of {}: {}", service_id, e);
        }
    }
}
