//! Relay delivery: the transport call that hands a serialized message to an
//! SMTP server.

use crate::command::{data_size, encode_data};
use crate::connection::{Client, connect, connect_tls, upgrade_to_tls};
use crate::error::{Error, Result};
use crate::types::{Credentials, RelayAddress, Security};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

/// Delivers raw message bytes to a relay.
///
/// Implemented by [`SmtpTransport`]; callers that need to run without a
/// mail server can supply their own implementation.
pub trait Transport: Send + Sync {
    /// Sends `message` from `from` to every address in `recipients`.
    ///
    /// `recipients` is the envelope list; it may contain addresses that do
    /// not appear in any header of `message`.
    fn send_mail(
        &self,
        relay: &RelayAddress,
        credentials: &Credentials,
        from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Envelope sender and recipients, checked for line breaks.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    from: &'a str,
    recipients: &'a [String],
}

impl<'a> Envelope<'a> {
    /// Validates and wraps the envelope addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if any address contains CR or LF.
    pub fn new(from: &'a str, recipients: &'a [String]) -> Result<Self> {
        validate_line(from)?;
        for rcpt in recipients {
            validate_line(rcpt)?;
        }
        Ok(Self { from, recipients })
    }

    /// Returns the envelope sender.
    #[must_use]
    pub const fn from(&self) -> &'a str {
        self.from
    }

    /// Returns the envelope recipients.
    #[must_use]
    pub const fn recipients(&self) -> &'a [String] {
        self.recipients
    }
}

fn validate_line(addr: &str) -> Result<()> {
    if addr.contains(['\r', '\n']) {
        return Err(Error::InvalidAddress(
            "address contains CR or LF".to_string(),
        ));
    }
    Ok(())
}

/// SMTP relay transport.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    security: Security,
    client_hostname: String,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtpTransport {
    /// Creates a transport using opportunistic STARTTLS and announcing
    /// itself as `localhost`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            security: Security::default(),
            client_hostname: "localhost".to_string(),
        }
    }

    /// Sets the connection security mode.
    #[must_use]
    pub const fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the hostname sent with EHLO.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Returns the configured security mode.
    #[must_use]
    pub const fn security(&self) -> Security {
        self.security
    }

    async fn send(
        &self,
        relay: &RelayAddress,
        credentials: &Credentials,
        envelope: &Envelope<'_>,
        message: &[u8],
    ) -> Result<()> {
        let hostname = self.client_hostname.as_str();
        debug!(relay = %relay, security = self.security.display_name(), "delivering");

        if self.security == Security::Tls {
            let stream = connect_tls(relay).await?;
            let mut client = Client::from_stream(stream).await?;
            client.ehlo(hostname).await?;
            return deliver(client, relay, credentials, true, envelope, message).await;
        }

        let stream = connect(relay).await?;
        let mut client = Client::from_stream(stream).await?;
        client.ehlo(hostname).await?;

        let upgrade = match self.security {
            Security::StartTls => true,
            Security::Opportunistic => client.server_info().supports_starttls(),
            Security::Tls | Security::None => false,
        };
        if !upgrade {
            return deliver(client, relay, credentials, false, envelope, message).await;
        }

        client.starttls().await?;
        let (tcp, server_info) = client.into_parts();
        let tls = upgrade_to_tls(tcp, relay.host()).await?;
        let mut client = Client::resume(tls, server_info);
        client.ehlo(hostname).await?;
        deliver(client, relay, credentials, true, envelope, message).await
    }
}

impl Transport for SmtpTransport {
    async fn send_mail(
        &self,
        relay: &RelayAddress,
        credentials: &Credentials,
        from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<()> {
        let envelope = Envelope::new(from, recipients)?;
        self.send(relay, credentials, &envelope, message).await
    }
}

/// Runs a mail transaction on a session that has completed EHLO (and TLS,
/// if any).
///
/// Authenticates when credentials are given, then sends MAIL FROM, one
/// RCPT TO per recipient, the DATA payload, and QUIT. The message is
/// encoded for DATA before MAIL FROM so the SIZE check and the declared
/// `SIZE=` both use the CRLF-framed length.
///
/// # Errors
///
/// Returns [`Error::NotSupported`] if credentials are given but the server
/// offers no AUTH, [`Error::InsecureAuth`] if credentials would travel in
/// the clear to a non-loopback relay, or the first error reported by the
/// server.
pub async fn deliver<S>(
    mut client: Client<S>,
    relay: &RelayAddress,
    credentials: &Credentials,
    encrypted: bool,
    envelope: &Envelope<'_>,
    message: &[u8],
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if credentials.is_some() {
        if !client.server_info().supports_auth() {
            return Err(Error::NotSupported("AUTH".into()));
        }
        if !encrypted && !relay.is_loopback() {
            return Err(Error::InsecureAuth(relay.host().to_string()));
        }
        client.authenticate(credentials).await?;
    }

    let payload = encode_data(message);
    client.mail_from(envelope.from(), data_size(&payload)).await?;
    for rcpt in envelope.recipients() {
        client.rcpt_to(rcpt).await?;
    }
    client.send_data(&payload).await?;
    client.quit().await?;

    info!(
        relay = %relay,
        recipients = envelope.recipients().len(),
        bytes = payload.len(),
        "message accepted by relay"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_rejects_line_breaks() {
        let rcpts = vec!["a@example.com".to_string()];
        assert!(Envelope::new("s@example.com", &rcpts).is_ok());
        assert!(matches!(
            Envelope::new("s@example.com\r\nRCPT TO:<x>", &rcpts),
            Err(Error::InvalidAddress(_))
        ));

        let bad = vec!["a@example.com".to_string(), "b@example.com\n".to_string()];
        assert!(Envelope::new("s@example.com", &bad).is_err());
    }

    #[test]
    fn test_transport_builder() {
        let transport = SmtpTransport::new()
            .with_security(Security::Tls)
            .with_client_hostname("client.example.com");
        assert_eq!(transport.security(), Security::Tls);
        assert_eq!(transport.client_hostname, "client.example.com");
        assert_eq!(SmtpTransport::default().security(), Security::Opportunistic);
    }
}
