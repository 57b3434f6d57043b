//! Registered provider endpoints
use crate::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One endpoint a provider registered under a service id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub service_id: String,
    pub ip: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Identity of an entry: two entries with the same key are the same endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub service_id: String,
    pub ip: String,
    pub port: u16,
}

impl Entry {
    pub fn new(service_id: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            service_id: service_id.into(),
            ip: ip.into(),
            port,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Reject entries missing a service id or address
    pub fn validate(&self) -> Result<()> {
        if self.service_id.is_empty() {
            return Err(RegistryError::empty_field("entry.serviceId"));
        }
        if self.ip.is_empty() {
            return Err(RegistryError::empty_field("entry.ip"));
        }
        Ok(())
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            service_id: self.service_id.clone(),
            ip: self.ip.clone(),
            port: self.port,
        }
    }

    /// Metadata is ignored: only `(service_id, ip, port)` decides identity
    pub fn same_endpoint(&self, other: &Entry) -> bool {
        self.port == other.port && self.ip == other.ip && self.service_id == other.service_id
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service_id, self.ip, self.port)
    }
}
