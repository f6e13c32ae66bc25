//! Integration tests for the SMTP client and delivery flow.
//!
//! These tests use a mock stream to simulate relay replies without
//! requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use qmail_smtp::command::encode_data;
use qmail_smtp::{Client, Credentials, Envelope, Error, RelayAddress, deliver};

/// Mock stream that returns predefined replies and records what the client
/// wrote.
#[derive(Debug)]
struct MockStream {
    /// Replies to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.as_bytes().to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = self.responses.position() as usize;

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

const GREETING: &str = "220 mx.example.com ESMTP ready\r\n";

async fn session(replies: &str) -> (Client<MockStream>, Arc<Mutex<Vec<u8>>>) {
    let (stream, sent) = MockStream::new(replies);
    let mut client = Client::from_stream(stream).await.unwrap();
    client.ehlo("client.example.com").await.unwrap();
    (client, sent)
}

#[tokio::test]
async fn test_greeting_and_ehlo() {
    let (client, sent) = session(&format!(
        "{GREETING}250-mx.example.com hello\r\n250-STARTTLS\r\n250-SIZE 1024\r\n250 AUTH PLAIN LOGIN\r\n"
    ))
    .await;

    let info = client.server_info();
    assert_eq!(info.hostname, "mx.example.com");
    assert!(info.supports_starttls());
    assert_eq!(info.max_message_size(), Some(1024));
    assert_eq!(info.auth_mechanisms().len(), 2);
    assert_eq!(sent_text(&sent), "EHLO client.example.com\r\n");
}

#[tokio::test]
async fn test_rejects_bad_greeting() {
    let (stream, _) = MockStream::new("554 no service\r\n");
    let err = Client::from_stream(stream).await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 554, .. }));
}

#[tokio::test]
async fn test_full_delivery_without_auth() {
    let replies = format!(
        "{GREETING}250-mx.example.com\r\n250 8BITMIME\r\n\
         250 sender ok\r\n250 rcpt ok\r\n250 rcpt ok\r\n\
         354 go ahead\r\n250 queued\r\n221 bye\r\n"
    );
    let (client, sent) = session(&replies).await;

    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string(), "hidden@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();
    let message = b"Subject: hi\n\n.dot line\nbody\n";

    deliver(client, &relay, &Credentials::None, false, &envelope, message)
        .await
        .unwrap();

    assert_eq!(
        sent_text(&sent),
        "EHLO client.example.com\r\n\
         MAIL FROM:<from@example.com> BODY=8BITMIME\r\n\
         RCPT TO:<to@example.com>\r\n\
         RCPT TO:<hidden@example.com>\r\n\
         DATA\r\n\
         Subject: hi\r\n\r\n..dot line\r\nbody\r\n.\r\n\
         QUIT\r\n"
    );
}

#[tokio::test]
async fn test_auth_plain_then_delivery() {
    let replies = format!(
        "{GREETING}250-mx.example.com\r\n250 AUTH PLAIN\r\n\
         235 authenticated\r\n250 ok\r\n250 ok\r\n354 go\r\n250 ok\r\n221 bye\r\n"
    );
    let (client, sent) = session(&replies).await;

    let relay = RelayAddress::new("mx.example.com", 587);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("user@example.com", &rcpts).unwrap();
    let creds = Credentials::plain("user", "pass");

    deliver(client, &relay, &creds, true, &envelope, b"x")
        .await
        .unwrap();

    // base64("\0user\0pass")
    assert!(sent_text(&sent).contains("AUTH PLAIN AHVzZXIAcGFzcw==\r\n"));
}

#[tokio::test]
async fn test_auth_login_fallback() {
    let replies = format!(
        "{GREETING}250-mx.example.com\r\n250 AUTH LOGIN\r\n\
         334 VXNlcm5hbWU6\r\n334 UGFzc3dvcmQ6\r\n235 ok\r\n"
    );
    let (mut client, sent) = session(&replies).await;

    client
        .authenticate(&Credentials::plain("user", "pass"))
        .await
        .unwrap();

    assert_eq!(
        sent_text(&sent),
        "EHLO client.example.com\r\nAUTH LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\n"
    );
}

#[tokio::test]
async fn test_xoauth2_failure_reports_server_reply() {
    let replies = format!(
        "{GREETING}250-mx.example.com\r\n250 AUTH XOAUTH2\r\n\
         334 eyJzdGF0dXMiOiI0MDEifQ==\r\n535 invalid credentials\r\n"
    );
    let (mut client, sent) = session(&replies).await;

    let err = client
        .authenticate(&Credentials::xoauth2("user@example.com", "tok"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SmtpError { code: 535, .. }));
    // The challenge is answered with an empty line.
    assert!(sent_text(&sent).ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_credentials_require_advertised_auth() {
    let (client, _) = session(&format!("{GREETING}250 mx.example.com\r\n")).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();

    let err = deliver(
        client,
        &relay,
        &Credentials::plain("u", "p"),
        true,
        &envelope,
        b"x",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref ext) if ext == "AUTH"));
}

#[tokio::test]
async fn test_credentials_refused_in_the_clear() {
    let replies = format!("{GREETING}250-mx.example.com\r\n250 AUTH PLAIN\r\n");
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();
    let creds = Credentials::plain("u", "p");

    let (client, sent) = session(&replies).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let err = deliver(client, &relay, &creds, false, &envelope, b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsecureAuth(ref host) if host == "mx.example.com"));
    assert!(!sent_text(&sent).contains("AUTH"));

    // Loopback relays may authenticate without TLS.
    let replies = format!("{replies}235 ok\r\n250 ok\r\n250 ok\r\n354 go\r\n250 ok\r\n221 bye\r\n");
    let (client, _) = session(&replies).await;
    let relay = RelayAddress::new("127.0.0.1", 25);
    deliver(client, &relay, &creds, false, &envelope, b"x")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_recipient_rejected() {
    let replies = format!(
        "{GREETING}250 mx.example.com\r\n250 ok\r\n550 5.1.1 no such user\r\n"
    );
    let (client, sent) = session(&replies).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["nobody@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();

    let err = deliver(client, &relay, &Credentials::None, false, &envelope, b"x")
        .await
        .unwrap_err();

    assert!(err.is_permanent());
    assert!(matches!(err, Error::SmtpError { code: 550, ref message } if message.contains("no such user")));
    assert!(!sent_text(&sent).contains("DATA"));
}

#[tokio::test]
async fn test_message_too_large() {
    let replies = format!("{GREETING}250-mx.example.com\r\n250 SIZE 4\r\n");
    let (client, sent) = session(&replies).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();

    let err = deliver(client, &relay, &Credentials::None, false, &envelope, b"too big")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MessageTooLarge { size: 9, limit: 4 }));
    assert!(!sent_text(&sent).contains("MAIL FROM"));
}

#[tokio::test]
async fn test_size_limit_uses_crlf_length() {
    let replies = format!("{GREETING}250-mx.example.com\r\n250 SIZE 120\r\n");
    let (client, sent) = session(&replies).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();
    let message = "a\n".repeat(50);
    assert_eq!(message.len(), 100);

    let err = deliver(client, &relay, &Credentials::None, false, &envelope, message.as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MessageTooLarge { size: 150, limit: 120 }));
    assert!(!sent_text(&sent).contains("MAIL FROM"));
}

#[tokio::test]
async fn test_declared_size_matches_data_on_the_wire() {
    let replies = format!(
        "{GREETING}250-mx.example.com\r\n250 SIZE 1000\r\n\
         250 ok\r\n250 ok\r\n354 go\r\n250 queued\r\n221 bye\r\n"
    );
    let (client, sent) = session(&replies).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();

    deliver(client, &relay, &Credentials::None, false, &envelope, b"a\nb\n")
        .await
        .unwrap();

    let text = sent_text(&sent);
    assert!(text.contains("MAIL FROM:<from@example.com> SIZE=6\r\n"));
    assert!(text.contains("DATA\r\na\r\nb\r\n.\r\nQUIT\r\n"));
}

#[tokio::test]
async fn test_size_parameter_sent_when_advertised() {
    let replies = format!("{GREETING}250-mx.example.com\r\n250 SIZE 1000\r\n250 ok\r\n");
    let (mut client, sent) = session(&replies).await;

    client.mail_from("from@example.com", 42).await.unwrap();
    assert!(sent_text(&sent).ends_with("MAIL FROM:<from@example.com> SIZE=42\r\n"));
}

#[tokio::test]
async fn test_connection_closed_is_protocol_error() {
    let (client, _) = session(&format!("{GREETING}250 mx.example.com\r\n")).await;
    let relay = RelayAddress::new("mx.example.com", 25);
    let rcpts = vec!["to@example.com".to_string()];
    let envelope = Envelope::new("from@example.com", &rcpts).unwrap();

    let err = deliver(client, &relay, &Credentials::None, false, &envelope, b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_starttls_requires_advertisement() {
    let (mut client, _) = session(&format!("{GREETING}250 mx.example.com\r\n")).await;
    let err = client.starttls().await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}

proptest! {
    #[test]
    fn encoded_data_never_ends_early(lines in prop::collection::vec("[ -~]{0,20}", 0..12)) {
        let message = lines.join("\n");
        let encoded = encode_data(message.as_bytes());
        let text = String::from_utf8(encoded).unwrap();

        prop_assert!(text.ends_with(".\r\n"));
        // The only bare "." line is the terminator.
        let body = &text[..text.len() - 3];
        prop_assert!(!body.split("\r\n").any(|line| line == "."));
        prop_assert!(!body.replace("\r\n", "").contains('\n'));
    }
}
