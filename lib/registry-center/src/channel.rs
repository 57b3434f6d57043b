//! In-process subscriber handle backed by a bounded queue

use registry_core::{Envelope, HandleId, RegistryError, Result, SubscriberHandle};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Subscriber handle whose envelopes land in a bounded tokio channel.
///
/// The receiving half is drained by whatever writes to the peer connection.
/// A full queue or a dropped receiver fails the push immediately instead of
/// waiting.
pub struct ChannelHandle {
    id: HandleId,
    peer: String,
    tx: mpsc::Sender<Envelope>,
}

impl ChannelHandle {
    pub fn channel(peer: impl Into<String>, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Arc::new(Self {
            id: HandleId::new(),
            peer: peer.into(),
            tx,
        });
        (handle, rx)
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// True once the receiving half has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish()
    }
}

impl SubscriberHandle for ChannelHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        self.tx.try_send(envelope).map_err(|e| {
            let reason = match e {
                TrySendError::Full(_) => "outbound queue full",
                TrySendError::Closed(_) => "peer closed",
            };
            RegistryError::Delivery {
                handle: format!("{} ({})", self.id, self.peer),
                reason: reason.to_string(),
            }
        })
    }
}
