//! Message composition and serialization.

use crate::address::{Address, render_list};
use crate::encoding::encode_base64_into;
use crate::error::{Error, Result};
use crate::token::{TokenSource, UuidTokens};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use tracing::debug;

/// How a non-body part is presented to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Downloadable attachment.
    Attachment,
    /// Inline resource referenced from the body via `cid:`.
    Inline,
}

impl Disposition {
    /// Returns the `Content-Disposition` type token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline resource payload and its Content-ID.
#[derive(Debug, Clone)]
struct Inline {
    data: Vec<u8>,
    content_id: String,
}

/// Borrowed view of one pending attachment or inline part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRef<'a> {
    /// File name (map key).
    pub name: &'a str,
    /// Attachment or inline.
    pub disposition: Disposition,
    /// Content-ID, present for inline parts only.
    pub content_id: Option<&'a str>,
    /// Raw (unencoded) payload.
    pub data: &'a [u8],
}

impl PartRef<'_> {
    /// Returns the raw payload size in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outgoing HTML email with optional attachments and inline resources.
///
/// Attachments and inline resources are kept ordered by name, so the part
/// order of the serialized message is deterministic: attachments first,
/// then inline resources.
pub struct Message {
    /// Sender.
    pub from: Address,
    /// Primary recipients.
    pub to: Vec<Address>,
    /// Carbon-copy recipients.
    pub cc: Vec<Address>,
    /// Blind carbon-copy recipients. Never rendered into headers.
    pub bcc: Vec<Address>,
    /// Subject line.
    pub subject: String,
    /// HTML body source, consumed by the first serialization.
    pub body: Option<Box<dyn Read + Send>>,
    attachments: BTreeMap<String, Vec<u8>>,
    inlines: BTreeMap<String, Inline>,
    tokens: Box<dyn TokenSource>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("bcc", &self.bcc)
            .field("subject", &self.subject)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .field("attachments", &self.attachments.keys().collect::<Vec<_>>())
            .field("inlines", &self.inlines.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Message {
    /// Creates an empty message that draws tokens from random UUIDs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token_source(UuidTokens)
    }

    /// Creates an empty message with a custom token source.
    #[must_use]
    pub fn with_token_source(tokens: impl TokenSource + 'static) -> Self {
        Self {
            from: Address::default(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            body: None,
            attachments: BTreeMap::new(),
            inlines: BTreeMap::new(),
            tokens: Box::new(tokens),
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<Address>) -> Self {
        self.from = address.into();
        self
    }

    /// Adds a primary recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<Address>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn cc(mut self, address: impl Into<Address>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a blind carbon-copy recipient.
    #[must_use]
    pub fn bcc(mut self, address: impl Into<Address>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the HTML body from an in-memory string.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.set_body(Cursor::new(html.into().into_bytes()));
        self
    }

    /// Sets the HTML body source. It is read once, on the next
    /// [`serialize`](Self::serialize).
    pub fn set_body(&mut self, reader: impl Read + Send + 'static) {
        self.body = Some(Box::new(reader));
    }

    /// Reads `reader` to completion and stores it as an attachment named
    /// `name`, replacing any attachment with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the source cannot be fully read; the
    /// message is left unchanged.
    pub fn attach(&mut self, name: impl Into<String>, mut reader: impl Read) -> Result<()> {
        let name = name.into();
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        debug!(name = %name, size = data.len(), "attachment added");
        self.attachments.insert(name, data);
        Ok(())
    }

    /// Reads `reader` to completion and stores it as an inline resource
    /// named `name`, replacing any inline resource with the same name.
    ///
    /// Returns the freshly generated Content-ID, which the body can
    /// reference as `cid:<id>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if no Content-ID can be generated, or
    /// [`Error::Read`] if the source cannot be fully read. The message is
    /// left unchanged in both cases.
    pub fn inline_attach(
        &mut self,
        name: impl Into<String>,
        mut reader: impl Read,
    ) -> Result<String> {
        let name = name.into();
        let content_id = self.tokens.new_token()?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        debug!(
            name = %name,
            size = data.len(),
            content_id = %content_id,
            "inline resource added"
        );
        self.inlines.insert(
            name,
            Inline {
                data,
                content_id: content_id.clone(),
            },
        );
        Ok(content_id)
    }

    /// Returns true if the message has any attachment or inline resource,
    /// i.e. serializes as `multipart/mixed`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.attachments.is_empty() || !self.inlines.is_empty()
    }

    /// Returns the Content-ID of the inline resource named `name`.
    #[must_use]
    pub fn content_id(&self, name: &str) -> Option<&str> {
        self.inlines.get(name).map(|inline| inline.content_id.as_str())
    }

    /// Iterates over pending parts in emission order: attachments by name,
    /// then inline resources by name.
    pub fn parts(&self) -> impl Iterator<Item = PartRef<'_>> {
        let attachments = self.attachments.iter().map(|(name, data)| PartRef {
            name,
            disposition: Disposition::Attachment,
            content_id: None,
            data,
        });
        let inlines = self.inlines.iter().map(|(name, inline)| PartRef {
            name,
            disposition: Disposition::Inline,
            content_id: Some(&inline.content_id),
            data: &inline.data,
        });
        attachments.chain(inlines)
    }

    /// Returns the envelope recipients: every `to`, then `cc`, then `bcc`
    /// email, in order. Addresses with an empty email are skipped.
    #[must_use]
    pub fn envelope_recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .filter(|address| !address.email.is_empty())
            .map(|address| address.email.clone())
            .collect()
    }

    /// Serializes the message into a MIME document.
    ///
    /// Lines are terminated by a single `\n`. Each call uses a fresh
    /// boundary, and the body source is consumed by the first call, so
    /// repeated calls are not byte-identical.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if no boundary can be generated, or
    /// [`Error::Read`] if the body source fails.
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        let boundary = self.tokens.new_token()?;
        let multipart = self.is_multipart();
        let mut buf = Vec::new();

        if !self.from.is_empty() {
            push_header(&mut buf, "From", &self.from.to_string());
        }
        if !self.to.is_empty() {
            push_header(&mut buf, "To", &render_list(&self.to));
        }
        if !self.cc.is_empty() {
            push_header(&mut buf, "Cc", &render_list(&self.cc));
        }
        push_header(&mut buf, "Subject", &self.subject);
        push_header(&mut buf, "MIME-Version", "1.0");

        if multipart {
            push_header(
                &mut buf,
                "Content-Type",
                &format!("multipart/mixed; boundary={boundary}"),
            );
            buf.push(b'\n');
            buf.extend_from_slice(b"--");
            buf.extend_from_slice(boundary.as_bytes());
            buf.push(b'\n');
        }

        push_header(&mut buf, "Content-Type", "text/html; charset=utf-8");
        buf.push(b'\n');
        if let Some(mut body) = self.body.take() {
            body.read_to_end(&mut buf).map_err(Error::Read)?;
        }

        if multipart {
            for part in self.parts() {
                push_part(&mut buf, &boundary, &part);
            }
            buf.extend_from_slice(b"--");
        }

        debug!(
            size = buf.len(),
            parts = self.attachments.len() + self.inlines.len(),
            "message serialized"
        );
        Ok(buf)
    }
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.push(b'\n');
}

/// Writes one base64 part, leaving an unclosed `--boundary` after it for
/// the next part or the final `--`.
fn push_part(buf: &mut Vec<u8>, boundary: &str, part: &PartRef<'_>) {
    buf.extend_from_slice(b"\n\n--");
    buf.extend_from_slice(boundary.as_bytes());
    buf.push(b'\n');
    push_header(buf, "Content-Type", "application/octet-stream");
    push_header(buf, "Content-Transfer-Encoding", "base64");
    if let Some(content_id) = part.content_id {
        push_header(buf, "Content-ID", &format!("<{content_id}>"));
    }
    push_header(
        buf,
        "Content-Disposition",
        &format!("{}; filename=\"{}\"", part.disposition, part.name),
    );
    buf.push(b'\n');
    encode_base64_into(part.data, buf);
    buf.extend_from_slice(b"\n--");
    buf.extend_from_slice(boundary.as_bytes());
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
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Token source yielding `tok-0`, `tok-1`, ...
    fn counting_tokens() -> impl TokenSource + 'static {
        let counter = AtomicUsize::new(0);
        move || -> Result<String> { Ok(format!("tok-{}", counter.fetch_add(1, Ordering::SeqCst))) }
    }

    fn failing_tokens() -> Result<String> {
        Err(Error::token("entropy exhausted"))
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"))
        }
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_single_part_exact_output() {
        let mut message = Message::with_token_source(counting_tokens())
            .from(Address::with_name("Sender", "sender@example.com"))
            .to("alice@example.com")
            .to(Address::with_name("Bob", "bob@example.com"))
            .cc("carol@example.com")
            .subject("Hello")
            .html_body("<p>Hi</p>");

        let out = text(&message.serialize().unwrap());
        assert_eq!(
            out,
            "From: Sender <sender@example.com>\n\
             To: alice@example.com;Bob <bob@example.com>\n\
             Cc: carol@example.com\n\
             Subject: Hello\n\
             MIME-Version: 1.0\n\
             Content-Type: text/html; charset=utf-8\n\
             \n\
             <p>Hi</p>"
        );
    }

    #[test]
    fn test_multipart_exact_output() {
        let mut message = Message::with_token_source(counting_tokens())
            .from("sender@example.com")
            .to("alice@example.com")
            .subject("Report")
            .html_body("<img src=\"cid:tok-0\">");
        let cid = message.inline_attach("logo.png", &b"PNG"[..]).unwrap();
        message.attach("a.txt", &b"hi"[..]).unwrap();
        assert_eq!(cid, "tok-0");

        let out = text(&message.serialize().unwrap());
        assert_eq!(
            out,
            "From: sender@example.com\n\
             To: alice@example.com\n\
             Subject: Report\n\
             MIME-Version: 1.0\n\
             Content-Type: multipart/mixed; boundary=tok-1\n\
             \n\
             --tok-1\n\
             Content-Type: text/html; charset=utf-8\n\
             \n\
             <img src=\"cid:tok-0\">\
             \n\n--tok-1\n\
             Content-Type: application/octet-stream\n\
             Content-Transfer-Encoding: base64\n\
             Content-Disposition: attachment; filename=\"a.txt\"\n\
             \n\
             aGk=\
             \n--tok-1\
             \n\n--tok-1\n\
             Content-Type: application/octet-stream\n\
             Content-Transfer-Encoding: base64\n\
             Content-ID: <tok-0>\n\
             Content-Disposition: inline; filename=\"logo.png\"\n\
             \n\
             UE5H\
             \n--tok-1--"
        );
    }

    #[test]
    fn test_minimal_message_has_no_boundary() {
        let mut message = Message::with_token_source(counting_tokens())
            .from("sender@example.com")
            .to("alice@example.com");
        let out = text(&message.serialize().unwrap());

        assert_eq!(out.matches("Content-Type:").count(), 1);
        assert!(out.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!out.contains("tok-0"));
        assert!(!out.contains("multipart"));
        assert!(out.ends_with("Content-Type: text/html; charset=utf-8\n\n"));
    }

    #[test]
    fn test_empty_sender_omits_from_header() {
        let mut message = Message::new().to("alice@example.com").subject("x");
        let out = text(&message.serialize().unwrap());
        assert!(!out.contains("From:"));
        assert!(out.starts_with("To: alice@example.com\n"));
    }

    #[test]
    fn test_empty_subject_still_emitted() {
        let mut message = Message::new().from("a@example.com");
        let out = text(&message.serialize().unwrap());
        assert!(out.contains("Subject: \n"));
        assert!(out.contains("MIME-Version: 1.0\n"));
    }

    #[test]
    fn test_bcc_never_in_headers() {
        let mut message = Message::new()
            .from("sender@example.com")
            .to("alice@example.com")
            .bcc("hidden@example.com")
            .bcc(Address::with_name("Secret", "secret@example.com"));
        let out = text(&message.serialize().unwrap());

        assert!(!out.contains("hidden@example.com"));
        assert!(!out.contains("secret@example.com"));
        assert!(!out.contains("Bcc"));
    }

    #[test]
    fn test_attachment_part() {
        let mut message = Message::new().from("sender@example.com").to("a@example.com");
        message.attach("a.txt", &b"hi"[..]).unwrap();
        let out = text(&message.serialize().unwrap());

        assert!(out.contains("Content-Disposition: attachment; filename=\"a.txt\"\n\naGk=\n"));
        assert!(!out.contains("Content-ID"));

        let boundary = out
            .lines()
            .find_map(|line| line.strip_prefix("Content-Type: multipart/mixed; boundary="))
            .unwrap()
            .to_string();
        let markers: Vec<_> = out.lines().filter(|line| line.starts_with("--")).collect();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0], format!("--{boundary}"));
        assert_eq!(markers[1], format!("--{boundary}"));
        assert_eq!(markers[2], format!("--{boundary}--"));
    }

    #[test]
    fn test_inline_part_carries_content_id() {
        let mut message = Message::new().from("sender@example.com").to("a@example.com");
        let cid = message.inline_attach("logo.png", &b"\x89PNG"[..]).unwrap();
        let out = text(&message.serialize().unwrap());

        assert!(out.contains(&format!("Content-ID: <{cid}>\n")));
        assert!(out.contains("Content-Disposition: inline; filename=\"logo.png\"\n"));
        let to_line = out.lines().find(|l| l.starts_with("To:")).unwrap();
        assert!(!to_line.contains(&cid));
    }

    #[test]
    fn test_inline_attach_uses_one_token() {
        let mut message = Message::with_token_source(counting_tokens());
        assert_eq!(message.inline_attach("a.png", &b"a"[..]).unwrap(), "tok-0");
        assert_eq!(message.inline_attach("b.png", &b"b"[..]).unwrap(), "tok-1");
        let out = text(&message.serialize().unwrap());
        assert!(out.contains("boundary=tok-2"));
    }

    #[test]
    fn test_content_id_distinct_from_boundary() {
        let mut message = Message::new().from("s@example.com").to("a@example.com");
        let cid = message.inline_attach("x.gif", &b"GIF89a"[..]).unwrap();
        let out = text(&message.serialize().unwrap());
        assert!(!out.contains(&format!("boundary={cid}")));
    }

    #[test]
    fn test_attach_overwrites_same_name() {
        let mut message = Message::new();
        message.attach("a.txt", &b"first"[..]).unwrap();
        message.attach("a.txt", &b"second"[..]).unwrap();

        let parts: Vec<_> = message.parts().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].data, b"second");
    }

    #[test]
    fn test_inline_attach_overwrites_same_name() {
        let mut message = Message::with_token_source(counting_tokens());
        message.inline_attach("logo.png", &b"old"[..]).unwrap();
        let cid = message.inline_attach("logo.png", &b"new"[..]).unwrap();

        assert_eq!(message.content_id("logo.png"), Some(cid.as_str()));
        assert_eq!(message.parts().count(), 1);
    }

    #[test]
    fn test_attach_read_failure_leaves_message_unchanged() {
        let mut message = Message::new();
        let err = message.attach("a.txt", BrokenReader).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
        assert!(!message.is_multipart());
    }

    #[test]
    fn test_inline_attach_read_failure_leaves_message_unchanged() {
        let mut message = Message::new();
        let err = message.inline_attach("a.png", BrokenReader).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
        assert_eq!(message.parts().count(), 0);
    }

    #[test]
    fn test_inline_attach_token_failure() {
        let mut message = Message::with_token_source(failing_tokens);
        let err = message.inline_attach("a.png", &b"a"[..]).unwrap_err();
        assert!(matches!(err, Error::Token(_)));
        assert!(message.content_id("a.png").is_none());
    }

    #[test]
    fn test_serialize_token_failure() {
        let mut message = Message::with_token_source(failing_tokens).from("a@example.com");
        assert!(matches!(message.serialize(), Err(Error::Token(_))));
    }

    #[test]
    fn test_body_read_failure() {
        let mut message = Message::new().from("a@example.com");
        message.set_body(BrokenReader);
        assert!(matches!(message.serialize(), Err(Error::Read(_))));
    }

    #[test]
    fn test_empty_body_is_legal() {
        let mut message = Message::new().from("a@example.com").html_body("");
        let out = message.serialize().unwrap();
        assert!(out.ends_with(b"charset=utf-8\n\n"));
    }

    #[test]
    fn test_body_copied_verbatim() {
        let body = "<html>\r\n<body>caf\u{e9}</body>\n</html>";
        let mut message = Message::new().from("a@example.com").html_body(body);
        let out = text(&message.serialize().unwrap());
        assert!(out.ends_with(body));
    }

    #[test]
    fn test_body_consumed_once() {
        let mut message = Message::new().from("a@example.com").html_body("<p>once</p>");
        let first = text(&message.serialize().unwrap());
        let second = text(&message.serialize().unwrap());
        assert!(first.contains("<p>once</p>"));
        assert!(!second.contains("<p>once</p>"));
        assert!(message.body.is_none());
    }

    #[test]
    fn test_repeated_serialize_new_boundary_same_parts() {
        let mut message = Message::new().from("a@example.com").to("b@example.com");
        message.attach("b.bin", &[1u8, 2, 3][..]).unwrap();
        message.attach("a.bin", &[4u8, 5][..]).unwrap();
        message.inline_attach("c.png", &b"png"[..]).unwrap();

        let first = text(&message.serialize().unwrap());
        let second = text(&message.serialize().unwrap());

        let boundary = |s: &str| {
            s.lines()
                .find_map(|l| l.strip_prefix("Content-Type: multipart/mixed; boundary="))
                .unwrap()
                .to_string()
        };
        let (b1, b2) = (boundary(&first), boundary(&second));
        assert_ne!(b1, b2);
        assert_eq!(first.replace(&b1, "B"), second.replace(&b2, "B"));
    }

    #[test]
    fn test_parts_order_attachments_then_inlines_by_name() {
        let mut message = Message::new();
        message.inline_attach("z.png", &b"z"[..]).unwrap();
        message.attach("b.txt", &b"b"[..]).unwrap();
        message.inline_attach("a.png", &b"a"[..]).unwrap();
        message.attach("a.txt", &b"a"[..]).unwrap();

        let names: Vec<_> = message
            .parts()
            .map(|p| (p.name, p.disposition))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt", Disposition::Attachment),
                ("b.txt", Disposition::Attachment),
                ("a.png", Disposition::Inline),
                ("z.png", Disposition::Inline),
            ]
        );
    }

    #[test]
    fn test_envelope_recipients_order() {
        let message = Message::new()
            .to("t1@example.com")
            .bcc("b1@example.com")
            .cc("c1@example.com")
            .to("t2@example.com");
        assert_eq!(
            message.envelope_recipients(),
            vec![
                "t1@example.com",
                "t2@example.com",
                "c1@example.com",
                "b1@example.com"
            ]
        );
    }

    #[test]
    fn test_envelope_recipients_skip_empty_emails() {
        let message = Message::new()
            .to(Address::new(""))
            .cc("c1@example.com")
            .bcc(Address::with_name("Nobody", ""));
        assert_eq!(message.envelope_recipients(), vec!["c1@example.com"]);

        let empty = Message::new().to(Address::new(""));
        assert!(empty.envelope_recipients().is_empty());
    }

    #[test]
    fn test_disposition_display() {
        assert_eq!(Disposition::Attachment.to_string(), "attachment");
        assert_eq!(Disposition::Inline.to_string(), "inline");
    }

    #[test]
    fn test_debug_hides_body() {
        let message = Message::new().html_body("secret body");
        let debug = format!("{message:?}");
        assert!(!debug.contains("secret body"));
    }
}
