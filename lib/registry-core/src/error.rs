use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid message type: {0}")]
    InvalidMessageType(i32),

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    #[error("Delivery to {handle} failed: {reason}")]
    Delivery { handle: String, reason: String },
}

impl RegistryError {
    pub(crate) fn empty_field(field: &str) -> Self {
        RegistryError::InvalidArgument(format!("{} must not be empty", field))
    }
}
