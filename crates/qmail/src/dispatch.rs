//! Envelope validation and hand-off to the transport.

use crate::error::{Error, Result};
use qmail_mime::Message;
use qmail_smtp::{Credentials, RelayAddress, Transport};
use tracing::{debug, info, warn};

/// Sends composed messages through a [`Transport`].
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher around a transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates the envelope, serializes `message` and passes it to the
    /// transport.
    ///
    /// The envelope recipients are every non-empty `to`, then `cc`, then
    /// `bcc` email. Bcc addresses travel only in the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] or [`Error::NoRecipients`] before
    /// the transport is touched, [`Error::Compose`] if serialization fails,
    /// and [`Error::Transport`] carrying the transport's error unchanged.
    pub async fn send(
        &self,
        relay: &RelayAddress,
        credentials: &Credentials,
        message: &mut Message,
    ) -> Result<()> {
        if message.from.email.is_empty() {
            warn!("refusing to send: no sender");
            return Err(Error::MissingSender);
        }

        let recipients = message.envelope_recipients();
        if recipients.is_empty() {
            warn!(from = %message.from.email, "refusing to send: no recipients");
            return Err(Error::NoRecipients);
        }

        let bytes = message.serialize()?;
        debug!(
            relay = %relay,
            recipients = recipients.len(),
            bytes = bytes.len(),
            "dispatching message"
        );

        self.transport
            .send_mail(relay, credentials, &message.from.email, &recipients, &bytes)
            .await?;

        info!(relay = %relay, recipients = recipients.len(), "message sent");
        Ok(())
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
    use qmail_mime::Address;
    use std::sync::Mutex;

    /// One recorded transport call.
    #[derive(Debug, Clone)]
    struct Call {
        relay: String,
        from: String,
        recipients: Vec<String>,
        message: Vec<u8>,
    }

    /// Transport that records calls and optionally fails.
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<Call>>,
        fail_with: Option<u16>,
    }

    impl RecordingTransport {
        fn failing(code: u16) -> Self {
            Self {
                calls: Mutex::default(),
                fail_with: Some(code),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        async fn send_mail(
            &self,
            relay: &RelayAddress,
            _credentials: &Credentials,
            from: &str,
            recipients: &[String],
            message: &[u8],
        ) -> qmail_smtp::Result<()> {
            self.calls.lock().unwrap().push(Call {
                relay: relay.to_string(),
                from: from.to_string(),
                recipients: recipients.to_vec(),
                message: message.to_vec(),
            });
            match self.fail_with {
                Some(code) => Err(qmail_smtp::Error::smtp_error(code, "rejected")),
                None => Ok(()),
            }
        }
    }

    fn relay() -> RelayAddress {
        RelayAddress::new("smtp.example.com", 587)
    }

    #[tokio::test]
    async fn test_missing_sender_never_reaches_transport() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new().to("bob@example.com");

        let err = dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingSender));
        assert!(dispatcher.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_never_reaches_transport() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new().from("alice@example.com");

        let err = dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoRecipients));
        assert_ne!(err.to_string(), Error::MissingSender.to_string());
        assert!(dispatcher.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recipient_emails_count_as_none() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new()
            .from("alice@example.com")
            .to(Address::new(""))
            .bcc(Address::with_name("Nobody", ""));

        let err = dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoRecipients));
        assert!(dispatcher.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recipient_emails_left_out_of_envelope() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new()
            .from("alice@example.com")
            .to(Address::new(""))
            .cc("carol@example.com");

        dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap();

        assert_eq!(
            dispatcher.transport().calls()[0].recipients,
            vec!["carol@example.com"]
        );
    }

    #[tokio::test]
    async fn test_bcc_only_is_enough() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new()
            .from("alice@example.com")
            .bcc("hidden@example.com");

        dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap();

        let calls = dispatcher.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].recipients, vec!["hidden@example.com"]);
    }

    #[tokio::test]
    async fn test_envelope_order_and_bcc_hidden() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let mut message = Message::new()
            .from("Alice <alice@example.com>")
            .to("to1@example.com")
            .to("to2@example.com")
            .cc("cc@example.com")
            .bcc("bcc@example.com")
            .subject("Quarterly report")
            .html_body("<p>see attached</p>");
        message.attach("report.csv", &b"a,b\n1,2\n"[..]).unwrap();

        dispatcher
            .send(&relay(), &Credentials::plain("alice", "pw"), &mut message)
            .await
            .unwrap();

        let call = &dispatcher.transport().calls()[0];
        assert_eq!(call.relay, "smtp.example.com:587");
        assert_eq!(call.from, "alice@example.com");
        assert_eq!(
            call.recipients,
            vec![
                "to1@example.com",
                "to2@example.com",
                "cc@example.com",
                "bcc@example.com"
            ]
        );

        let text = String::from_utf8(call.message.clone()).unwrap();
        assert!(text.contains("Subject: Quarterly report\n"));
        assert!(text.contains("filename=\"report.csv\""));
        assert!(!text.contains("bcc@example.com"));
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let dispatcher = Dispatcher::new(RecordingTransport::failing(550));
        let mut message = Message::new()
            .from("alice@example.com")
            .to("bob@example.com");

        let err = dispatcher
            .send(&relay(), &Credentials::None, &mut message)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transport(qmail_smtp::Error::SmtpError { code: 550, .. })
        ));
        assert_eq!(dispatcher.transport().calls().len(), 1);
    }
}
