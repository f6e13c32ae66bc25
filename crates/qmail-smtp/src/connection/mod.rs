//! SMTP connection management.

mod client;
mod stream;

pub use client::Client;
pub use stream::{connect, connect_tls, upgrade_to_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if 8BITMIME is supported.
    #[must_use]
    pub fn supports_8bitmime(&self) -> bool {
        self.supports(&Extension::EightBitMime)
    }

    /// Checks if AUTH was advertised at all.
    #[must_use]
    pub fn supports_auth(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(_)))
    }

    /// Returns the maximum message size, if advertised and non-zero.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(size)) if *size > 0 => Some(*size),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[AuthMechanism] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "mx.example.com".to_string(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_capabilities() {
        let server = info(&["STARTTLS", "8BITMIME", "AUTH PLAIN XOAUTH2", "SIZE 1000"]);
        assert!(server.supports_starttls());
        assert!(server.supports_8bitmime());
        assert!(server.supports_auth());
        assert_eq!(server.max_message_size(), Some(1000));
        assert_eq!(
            server.auth_mechanisms(),
            &[AuthMechanism::Plain, AuthMechanism::XOAuth2]
        );
    }

    #[test]
    fn test_no_capabilities() {
        let server = info(&["SIZE 0"]);
        assert!(!server.supports_starttls());
        assert!(!server.supports_auth());
        assert_eq!(server.max_message_size(), None);
        assert!(server.auth_mechanisms().is_empty());
    }
}
