//! Error types for SMTP delivery.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid relay or envelope address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Credentials would be sent over an unencrypted connection.
    #[error("Refusing to authenticate over an unencrypted connection to {0}")]
    InsecureAuth(String),

    /// Message too large.
    #[error("Message exceeds size limit: {size} bytes (limit {limit})")]
    MessageTooLarge {
        /// Encoded message size.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::smtp_error(550, "no such user").is_permanent());
        assert!(!Error::smtp_error(550, "no such user").is_transient());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::Protocol("x".into()).is_permanent());
    }

    #[test]
    fn test_display() {
        let err = Error::smtp_error(554, "rejected");
        assert_eq!(err.to_string(), "SMTP error 554: rejected");

        let err = Error::MessageTooLarge {
            size: 20,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "Message exceeds size limit: 20 bytes (limit 10)"
        );
    }
}
