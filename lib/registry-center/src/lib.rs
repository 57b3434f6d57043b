//! Registry center for provider registration and consumer push updates
//!
//! This library provides:
//! - RegistryCenter, which pushes endpoint changes to subscribers and answers
//!   inbound registry envelopes
//! - ChannelHandle, a queue-backed subscriber handle for transports
//! - CenterConfig loaded from YAML or the environment

pub mod center;
pub mod channel;
pub mod config;

pub use center::RegistryCenter;
pub use channel::ChannelHandle;
pub use config::CenterConfig;
