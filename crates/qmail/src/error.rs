//! Error types for dispatch and configuration.

use thiserror::Error;

/// Errors that can occur while sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// The message has no sender address.
    #[error("Message has no sender")]
    MissingSender,

    /// The message has no to, cc or bcc recipients.
    #[error("Message has no recipients")]
    NoRecipients,

    /// Composing or serializing the message failed.
    #[error("Compose error: {0}")]
    Compose(#[from] qmail_mime::Error),

    /// The relay transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] qmail_smtp::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
