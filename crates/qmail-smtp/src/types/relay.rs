//! Relay endpoint, credentials and connection security.

use crate::error::{Error, Result};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Mail relay endpoint (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayAddress {
    host: String,
    port: u16,
}

impl RelayAddress {
    /// Creates a relay address from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host:port`, accepting bracketed IPv6 hosts (`[::1]:25`).
    ///
    /// # Errors
    ///
    /// Returns an error if the host or port is missing or the port is not a
    /// number.
    pub fn parse(s: &str) -> Result<Self> {
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, port) = rest
                .split_once("]:")
                .ok_or_else(|| Error::InvalidAddress(format!("missing port in {s}")))?;
            (host, port)
        } else {
            s.rsplit_once(':')
                .ok_or_else(|| Error::InvalidAddress(format!("missing port in {s}")))?
        };

        if host.is_empty() {
            return Err(Error::InvalidAddress(format!("missing host in {s}")));
        }
        let port = port
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid port in {s}")))?;

        Ok(Self::new(host, port))
    }

    /// Returns the host name or IP literal (without brackets).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns true if the host is `localhost` or a loopback IP.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.host.eq_ignore_ascii_case("localhost")
            || self.host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    }
}

impl FromStr for RelayAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RelayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Authentication credentials for the relay.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Send without authenticating.
    #[default]
    None,
    /// Username and password (AUTH PLAIN, or LOGIN when PLAIN is not offered).
    Plain {
        /// Authentication username.
        username: String,
        /// Authentication password.
        password: String,
    },
    /// `OAuth2` bearer token (AUTH XOAUTH2).
    XOAuth2 {
        /// Account email address.
        user: String,
        /// Access token.
        token: String,
    },
}

impl Credentials {
    /// Creates username/password credentials.
    #[must_use]
    pub fn plain(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Plain {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates `OAuth2` bearer credentials.
    #[must_use]
    pub fn xoauth2(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self::XOAuth2 {
            user: user.into(),
            token: token.into(),
        }
    }

    /// Returns true if these credentials require an AUTH exchange.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Plain { username, .. } => f
                .debug_struct("Plain")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::XOAuth2 { user, .. } => f
                .debug_struct("XOAuth2")
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Security {
    /// Upgrade with STARTTLS when the server offers it.
    #[default]
    Opportunistic,
    /// STARTTLS upgrade, failing if the server does not offer it.
    StartTls,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// No encryption (not recommended).
    None,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Opportunistic => "STARTTLS if available",
            Self::StartTls => "STARTTLS",
            Self::Tls => "SSL/TLS",
            Self::None => "None (insecure)",
        }
    }

    /// Get the conventional relay port for the security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Opportunistic | Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
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

    mod relay_address_tests {
        use super::*;

        #[test]
        fn parse_host_port() {
            let addr = RelayAddress::parse("smtp.example.com:587").unwrap();
            assert_eq!(addr.host(), "smtp.example.com");
            assert_eq!(addr.port(), 587);
        }

        #[test]
        fn parse_ipv6() {
            let addr: RelayAddress = "[::1]:25".parse().unwrap();
            assert_eq!(addr.host(), "::1");
            assert_eq!(addr.port(), 25);
            assert_eq!(addr.to_string(), "[::1]:25");
        }

        #[test]
        fn parse_errors() {
            assert!(RelayAddress::parse("smtp.example.com").is_err());
            assert!(RelayAddress::parse(":25").is_err());
            assert!(RelayAddress::parse("smtp.example.com:smtp").is_err());
            assert!(RelayAddress::parse("smtp.example.com:70000").is_err());
            assert!(RelayAddress::parse("[::1]").is_err());
        }

        #[test]
        fn display_round_trip() {
            let addr = RelayAddress::new("mx.example.com", 25);
            assert_eq!(addr.to_string(), "mx.example.com:25");
            assert_eq!(RelayAddress::parse(&addr.to_string()).unwrap(), addr);
        }

        #[test]
        fn loopback_detection() {
            assert!(RelayAddress::new("localhost", 25).is_loopback());
            assert!(RelayAddress::new("LocalHost", 25).is_loopback());
            assert!(RelayAddress::new("127.0.0.1", 25).is_loopback());
            assert!(RelayAddress::new("::1", 25).is_loopback());
            assert!(!RelayAddress::new("smtp.example.com", 25).is_loopback());
            assert!(!RelayAddress::new("10.0.0.1", 25).is_loopback());
        }
    }

    mod credentials_tests {
        use super::*;

        #[test]
        fn is_some() {
            assert!(!Credentials::None.is_some());
            assert!(Credentials::plain("u", "p").is_some());
            assert!(Credentials::xoauth2("u", "t").is_some());
        }

        #[test]
        fn debug_redacts_secrets() {
            let debug = format!("{:?}", Credentials::plain("alice", "hunter2"));
            assert!(debug.contains("alice"));
            assert!(!debug.contains("hunter2"));

            let debug = format!("{:?}", Credentials::xoauth2("alice", "ya29.token"));
            assert!(!debug.contains("ya29"));
        }
    }

    #[test]
    fn security_default_ports() {
        assert_eq!(Security::default(), Security::Opportunistic);
        assert_eq!(Security::Opportunistic.default_port(), 25);
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::Tls.default_port(), 465);
        assert_eq!(Security::Tls.display_name(), "SSL/TLS");
    }
}
