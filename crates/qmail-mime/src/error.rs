//! Error types for message composition.

use std::io;

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A content source could not be read to completion.
    #[error("Failed to read content: {0}")]
    Read(#[from] io::Error),

    /// The unique-token source failed to produce a token.
    #[error("Token generation failed: {0}")]
    Token(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl Error {
    /// Creates a token generation error.
    #[must_use]
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token(message.into())
    }
}
