//! Header address types.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Email address with an optional display name.
///
/// No syntax validation is performed; the address is rendered exactly as
/// given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (optional).
    pub name: Option<String>,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns true if the email part is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_empty()
    }

    /// Returns the display name, treating an empty name as absent.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// Parses `Name <email>` or a bare `email`.
impl FromStr for Address {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(stripped) = s.strip_suffix('>')
            && let Some((name, email)) = stripped.rsplit_once('<')
        {
            let name = name.trim().trim_matches('"');
            let email = email.trim();
            return Ok(if name.is_empty() {
                Self::new(email)
            } else {
                Self::with_name(name, email)
            });
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(address) => address,
            Err(never) => match never {},
        }
    }
}

/// Renders a list of addresses as a header value: each address per
/// [`Address`]'s `Display`, joined by `;`.
#[must_use]
pub fn render_list(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
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
    fn test_display_bare() {
        let addr = Address::new("user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");
    }

    #[test]
    fn test_display_with_name() {
        let addr = Address::with_name("John Doe", "john@example.com");
        assert_eq!(addr.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_display_empty_name_is_bare() {
        let addr = Address::with_name("", "john@example.com");
        assert_eq!(addr.to_string(), "john@example.com");
        assert_eq!(addr.display_name(), None);
    }

    #[test]
    fn test_no_validation() {
        let addr = Address::new("not an address");
        assert_eq!(addr.to_string(), "not an address");
        assert!(!addr.is_empty());
        assert!(Address::default().is_empty());
    }

    #[test]
    fn test_parse_bare() {
        let addr: Address = "user@example.com".parse().unwrap();
        assert_eq!(addr, Address::new("user@example.com"));
    }

    #[test]
    fn test_parse_with_name() {
        let addr: Address = "John Doe <john@example.com>".parse().unwrap();
        assert_eq!(addr, Address::with_name("John Doe", "john@example.com"));
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = Address::from("\"Doe, John\" <john@example.com>");
        assert_eq!(addr.name.as_deref(), Some("Doe, John"));
        assert_eq!(addr.email, "john@example.com");
    }

    #[test]
    fn test_parse_angle_only() {
        let addr = Address::from("<john@example.com>");
        assert_eq!(addr, Address::new("john@example.com"));
    }

    #[test]
    fn test_render_list() {
        let list = vec![
            Address::new("a@example.com"),
            Address::with_name("B", "b@example.com"),
        ];
        assert_eq!(render_list(&list), "a@example.com;B <b@example.com>");
        assert_eq!(render_list(&[]), "");
    }
}
