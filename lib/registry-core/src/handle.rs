//! Subscriber handles supplied by the transport
use crate::{Envelope, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Set-membership key of a subscriber handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A consumer connection able to receive pushed envelopes.
///
/// `send` hands the envelope to the transport and returns immediately; it
/// must never wait on the peer. Two handles are the same subscriber iff their
/// ids are equal.
pub trait SubscriberHandle: Send + Sync + fmt::Debug {
    fn id(&self) -> HandleId;

    fn send(&self, envelope: Envelope) -> Result<()>;
}

pub type SharedHandle = Arc<dyn SubscriberHandle>;
