//! Relay configuration loaded from a JSON file.

use crate::error::{Error, Result};
use qmail_smtp::{Credentials, RelayAddress, Security, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// SMTP relay configuration.
///
/// ```json
/// {
///   "host": "smtp.example.com",
///   "security": "starttls",
///   "username": "alice@example.com",
///   "password": "app-password"
/// }
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay hostname.
    pub host: String,
    /// Relay port (default depends on `security`).
    pub port: Option<u16>,
    /// Connection security mode.
    pub security: Security,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for PLAIN/LOGIN authentication.
    pub password: Option<String>,
    /// `OAuth2` access token; takes precedence over `password`.
    pub oauth_token: Option<String>,
    /// Hostname announced with EHLO.
    pub client_hostname: Option<String>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("oauth_token", &self.oauth_token.as_ref().map(|_| "<redacted>"))
            .field("client_hostname", &self.client_hostname)
            .finish()
    }
}

impl RelayConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        security.default_port()
    }

    /// Default configuration file location (`<config dir>/qmail/relay.json`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qmail").join("relay.json"))
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// names no host.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading relay config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses and validates a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or names no host.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the port is zero.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("relay host is not set".into()));
        }
        if self.port == Some(0) {
            return Err(Error::Config("relay port must be non-zero".into()));
        }
        Ok(())
    }

    /// Effective port: the configured one or the security default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| Self::default_port(self.security))
    }

    /// Relay endpoint.
    #[must_use]
    pub fn address(&self) -> RelayAddress {
        RelayAddress::new(self.host.trim(), self.port())
    }

    /// Credentials for the relay; none when no username is set.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) else {
            return Credentials::None;
        };

        match &self.oauth_token {
            Some(token) => Credentials::xoauth2(username, token.as_str()),
            None => Credentials::plain(username, self.password.clone().unwrap_or_default()),
        }
    }

    /// Transport configured with this relay's security and EHLO hostname.
    #[must_use]
    pub fn transport(&self) -> SmtpTransport {
        let transport = SmtpTransport::new().with_security(self.security);
        match &self.client_hostname {
            Some(hostname) if !hostname.is_empty() => {
                transport.with_client_hostname(hostname.as_str())
            }
            _ => transport,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(RelayConfig::default_port(Security::Tls), 465);
        assert_eq!(RelayConfig::default_port(Security::StartTls), 587);
        assert_eq!(RelayConfig::default_port(Security::None), 25);
        assert_eq!(RelayConfig::default_port(Security::Opportunistic), 25);
    }

    #[test]
    fn test_minimal_config() {
        let config = RelayConfig::from_json(r#"{"host": "mail.example.com"}"#).unwrap();
        assert_eq!(config.security, Security::Opportunistic);
        assert_eq!(config.address().to_string(), "mail.example.com:25");
        assert_eq!(config.credentials(), Credentials::None);
    }

    #[test]
    fn test_full_config() {
        let config = RelayConfig::from_json(
            r#"{
                "host": "smtp.example.com",
                "port": 2525,
                "security": "starttls",
                "username": "alice",
                "password": "secret",
                "client_hostname": "laptop.example.com"
            }"#,
        )
        .unwrap();

        assert_eq!(config.port(), 2525);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.credentials(), Credentials::plain("alice", "secret"));
        assert_eq!(config.transport().security(), Security::StartTls);
    }

    #[test]
    fn test_oauth_token_preferred() {
        let config = RelayConfig {
            host: "smtp.gmail.com".into(),
            security: Security::Tls,
            username: Some("alice@gmail.com".into()),
            password: Some("unused".into()),
            oauth_token: Some("ya29.token".into()),
            ..RelayConfig::default()
        };
        assert_eq!(
            config.credentials(),
            Credentials::xoauth2("alice@gmail.com", "ya29.token")
        );
        assert_eq!(config.port(), 465);
    }

    #[test]
    fn test_empty_username_means_no_credentials() {
        let config = RelayConfig {
            host: "localhost".into(),
            username: Some(String::new()),
            password: Some("pw".into()),
            ..RelayConfig::default()
        };
        assert_eq!(config.credentials(), Credentials::None);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            RelayConfig::from_json(r#"{"host": "  "}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RelayConfig::from_json(r#"{"host": "h", "port": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RelayConfig::from_json(r#"{"host": "h", "security": "carrier-pigeon"}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = RelayConfig {
            host: "h".into(),
            password: Some("hunter2".into()),
            oauth_token: Some("tok".into()),
            ..RelayConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"tok\""));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("qmail-relay-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"host": "relay.example.com", "security": "tls"}"#).unwrap();

        let config = RelayConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.address(), RelayAddress::new("relay.example.com", 465));
        assert!(matches!(RelayConfig::load(&path), Err(Error::Io(_))));
    }
}
