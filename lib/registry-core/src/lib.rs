//! Core service registry functionality
//!
//! This library provides:
//! - Service registry for provider endpoints (register/unregister/lookup)
//! - Subscription registry with push fan-out of endpoint changes
//! - The envelope shape all registry traffic travels in

pub mod entry;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod registry;
pub mod subscription;

pub use entry::{Entry, EntryKey};
pub use envelope::{new_seq_id, Envelope, Header, MessageType};
pub use error::{RegistryError, Result};
pub use handle::{HandleId, SharedHandle, SubscriberHandle};
pub use registry::ServiceRegistry;
pub use subscription::SubscriptionRegistry;
