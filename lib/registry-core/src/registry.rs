//! Service registry for provider endpoints

use crate::{Entry, RegistryError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// ServiceRegistry maintains the endpoints registered under each service id
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    // service_id -> endpoint list. Lists are replaced wholesale under the
    // per-key write guard, so readers see either the old or the new list.
    services: Arc<DashMap<String, Arc<Vec<Entry>>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update an endpoint, returning the service's full list
    ///
    /// An entry with the same `(service_id, ip, port)` is overwritten in
    /// place, keeping its position in the list.
    pub fn register(&self, entry: Entry) -> Result<Vec<Entry>> {
        entry.validate()?;

        let service_id = entry.service_id.clone();
        let endpoint_display = entry.to_string();

        let mut slot = self.services.entry(service_id.clone()).or_default();
        let mut next: Vec<Entry> = Vec::clone(&slot);
        match next.iter_mut().find(|existing| existing.same_endpoint(&entry)) {
            Some(existing) => {
                *existing = entry;
                debug!("Updated endpoint: {}", endpoint_display);
            }
            None => {
                next.push(entry);
                debug!("Registered endpoint: {}", endpoint_display);
            }
        }
        let next = Arc::new(next);
        *slot = next.clone();
        drop(slot);

        Ok(Vec::clone(&next))
    }

    /// Remove an endpoint, returning what is left for its service
    ///
    /// Removing an endpoint that was never registered is not an error.
    pub fn unregister(&self, entry: &Entry) -> Result<Vec<Entry>> {
        entry.validate()?;

        let remaining = match self.services.get_mut(&entry.service_id) {
            Some(mut slot) => {
                let next: Vec<Entry> = slot
                    .iter()
                    .filter(|existing| !existing.same_endpoint(entry))
                    .cloned()
                    .collect();
                if next.len() == slot.len() {
                    info!("Endpoint not registered, nothing to remove: {}", entry);
                } else {
                    debug!("Deregistered endpoint: {}", entry);
                }
                let next = Arc::new(next);
                *slot = next.clone();
                next
            }
            None => {
                info!("Service has no endpoints, nothing to remove: {}", entry);
                return Ok(Vec::new());
            }
        };

        if remaining.is_empty() {
            self.services
                .remove_if(&entry.service_id, |_, list| list.is_empty());
        }

        Ok(Vec::clone(&remaining))
    }

    /// Get the endpoints of a service; unknown services yield an empty list
    pub fn lookup(&self, service_id: &str) -> Result<Vec<Entry>> {
        if service_id.is_empty() {
            return Err(RegistryError::empty_field("serviceId"));
        }

        let snapshot = self.services.get(service_id).map(|slot| Arc::clone(slot.value()));
        match snapshot {
            Some(list) => Ok(Vec::clone(&list)),
            None => {
                info!("No endpoints registered for service: {}", service_id);
                Ok(Vec::new())
            }
        }
    }

    /// List the ids of all services with at least one endpoint
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .services
            .iter()
            .map(|slot| slot.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Get count of registered services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
