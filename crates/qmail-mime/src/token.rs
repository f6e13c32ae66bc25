//! Unique token generation for MIME boundaries and Content-IDs.

use crate::error::Result;
use uuid::Uuid;

/// Source of fresh unique tokens.
///
/// Tokens must be safe to use both as a MIME boundary value and inside an
/// angle-bracketed `Content-ID`.
pub trait TokenSource: Send + Sync {
    /// Generates a fresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot produce a token.
    fn new_token(&self) -> Result<String>;
}

/// Random (version 4) UUID tokens in hyphenated lowercase form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokens;

impl TokenSource for UuidTokens {
    fn new_token(&self) -> Result<String> {
        Ok(Uuid::new_v4().hyphenated().to_string())
    }
}

impl<F> TokenSource for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn new_token(&self) -> Result<String> {
        self()
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
    use crate::error::Error;

    #[test]
    fn test_uuid_tokens_are_unique() {
        let a = UuidTokens.new_token().unwrap();
        let b = UuidTokens.new_token().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_uuid_token_charset() {
        let token = UuidTokens.new_token().unwrap();
        assert_eq!(token.len(), 36);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-')
        );
    }

    #[test]
    fn test_closure_source() {
        let source = || -> Result<String> { Ok("fixed".to_string()) };
        assert_eq!(source.new_token().unwrap(), "fixed");
    }

    #[test]
    fn test_closure_source_error() {
        let source = || -> Result<String> { Err(Error::token("no entropy")) };
        assert!(matches!(source.new_token(), Err(Error::Token(_))));
    }
}
