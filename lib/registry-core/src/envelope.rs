//! Registry protocol messages
//!
//! Every piece of registry traffic (provider requests, client subscriptions,
//! pushed notifications and their replies) travels as an [`Envelope`] so a
//! transport can multiplex all of it over one connection.

use crate::{Entry, RegistryError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message discriminant, carried on the wire as an int32
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum MessageType {
    /// Provider registers an endpoint
    Register,
    /// Provider removes an endpoint
    UnRegister,
    /// Client starts receiving pushes for a service id
    Subscribe,
    /// Client stops receiving pushes for a service id
    UnSubscribe,
    /// Client pulls the current endpoint list
    LookUp,
    /// Server pushes a changed endpoint list
    RegisterNotify,
    /// Reply to a request, correlated by seq id
    Response,
    /// Failed reply to a request, correlated by seq id
    Error,
}

impl MessageType {
    pub fn code(self) -> i32 {
        match self {
            MessageType::Register => 1,
            MessageType::UnRegister => 2,
            MessageType::Subscribe => 3,
            MessageType::UnSubscribe => 4,
            MessageType::LookUp => 5,
            MessageType::RegisterNotify => 6,
            MessageType::Response => 7,
            MessageType::Error => 8,
        }
    }

    /// Whether a peer may send this type as a request to the registry
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageType::Register
                | MessageType::UnRegister
                | MessageType::Subscribe
                | MessageType::UnSubscribe
                | MessageType::LookUp
        )
    }
}

impl From<MessageType> for i32 {
    fn from(message_type: MessageType) -> Self {
        message_type.code()
    }
}

impl TryFrom<i32> for MessageType {
    type Error = RegistryError;

    fn try_from(code: i32) -> Result<Self, <MessageType as TryFrom<i32>>::Error> {
        match code {
            1 => Ok(MessageType::Register),
            2 => Ok(MessageType::UnRegister),
            3 => Ok(MessageType::Subscribe),
            4 => Ok(MessageType::UnSubscribe),
            5 => Ok(MessageType::LookUp),
            6 => Ok(MessageType::RegisterNotify),
            7 => Ok(MessageType::Response),
            8 => Ok(MessageType::Error),
            other => Err(RegistryError::InvalidMessageType(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub seq_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    #[serde(default)]
    pub body: Vec<Entry>,
}

/// Fresh correlation id: 32 lowercase hex chars
pub fn new_seq_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Envelope {
    pub fn new(message_type: MessageType, body: Vec<Entry>) -> Self {
        Self::with_seq_id(message_type, new_seq_id(), body)
    }

    pub fn with_seq_id(message_type: MessageType, seq_id: impl Into<String>, body: Vec<Entry>) -> Self {
        Self {
            header: Header {
                message_type,
                seq_id: seq_id.into(),
            },
            body,
        }
    }

    /// Single-entry request, as sent by providers and subscribing clients
    pub fn request(message_type: MessageType, entry: Entry) -> Self {
        Self::new(message_type, vec![entry])
    }

    pub fn notify(body: Vec<Entry>) -> Self {
        Self::new(MessageType::RegisterNotify, body)
    }

    pub fn response(seq_id: impl Into<String>, body: Vec<Entry>) -> Self {
        Self::with_seq_id(MessageType::Response, seq_id, body)
    }

    pub fn error(seq_id: impl Into<String>) -> Self {
        Self::with_seq_id(MessageType::Error, seq_id, Vec::new())
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    pub fn seq_id(&self) -> &str {
        &self.header.seq_id
    }
}
