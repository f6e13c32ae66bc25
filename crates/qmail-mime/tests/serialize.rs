//! Property tests for message serialization.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use qmail_mime::encoding::decode_base64;
use qmail_mime::{Address, Message};

fn email() -> impl Strategy<Value = String> {
    "[a-z]{1,8}@[a-z]{1,8}\\.(com|org|net)"
}

fn boundary_of(out: &str) -> Option<String> {
    out.lines()
        .find_map(|l| l.strip_prefix("Content-Type: multipart/mixed; boundary="))
        .map(ToString::to_string)
}

/// Splits a multipart document into `(headers, payload)` pairs, skipping the
/// top-level headers and the primary HTML part.
fn attachment_parts(out: &str, boundary: &str) -> Vec<(String, String)> {
    let open = format!("--{boundary}");
    let close = format!("--{boundary}--");

    let mut segments: Vec<Vec<&str>> = vec![Vec::new()];
    for line in out.lines() {
        if line == open || line == close {
            segments.push(Vec::new());
        } else if let Some(current) = segments.last_mut() {
            current.push(line);
        }
    }

    segments
        .into_iter()
        .skip(2)
        // Each part leaves an empty segment between its trailing marker and
        // the next part's opening marker.
        .filter(|segment| segment.iter().any(|line| !line.is_empty()))
        .map(|segment| {
            let split = segment.iter().position(|line| line.is_empty()).unwrap();
            (segment[..split].join("\n"), segment[split + 1..].concat())
        })
        .collect()
}

proptest! {
    #[test]
    fn bcc_never_rendered(
        to in prop::collection::vec(email(), 0..3),
        cc in prop::collection::vec(email(), 0..3),
        bcc in prop::collection::vec("[0-9]{6}@hidden\\.example", 1..4),
    ) {
        let mut message = Message::new().from("sender@example.com");
        message.to = to.iter().map(|e| Address::new(e.as_str())).collect();
        message.cc = cc.iter().map(|e| Address::new(e.as_str())).collect();
        message.bcc = bcc.iter().map(|e| Address::new(e.as_str())).collect();

        let out = String::from_utf8(message.serialize().unwrap()).unwrap();
        for hidden in &bcc {
            prop_assert!(!out.contains(hidden.as_str()));
        }

        let recipients = message.envelope_recipients();
        prop_assert_eq!(recipients.len(), to.len() + cc.len() + bcc.len());
        prop_assert_eq!(&recipients[to.len() + cc.len()..], bcc.as_slice());
    }

    #[test]
    fn attachments_round_trip(
        files in prop::collection::btree_map("[a-z]{1,10}\\.bin", prop::collection::vec(any::<u8>(), 0..64), 1..5),
    ) {
        let mut message = Message::new().from("sender@example.com").to("a@example.com");
        for (name, data) in &files {
            message.attach(name.as_str(), data.as_slice()).unwrap();
        }

        let out = String::from_utf8(message.serialize().unwrap()).unwrap();
        let boundary = boundary_of(&out).unwrap();
        let closing = format!("--{boundary}--");
        prop_assert!(out.ends_with(&closing));

        let parts = attachment_parts(&out, &boundary);
        prop_assert_eq!(parts.len(), files.len());
        for ((headers, payload), (name, data)) in parts.iter().zip(&files) {
            let disposition = format!("Content-Disposition: attachment; filename=\"{name}\"");
            prop_assert!(headers.contains(&disposition));
            prop_assert_eq!(&decode_base64(payload).unwrap(), data);
        }
    }
}

#[test]
fn inline_and_attachment_parts_share_boundary() {
    let mut message = Message::new()
        .from(Address::with_name("Sender", "sender@example.com"))
        .to("alice@example.com")
        .cc("bob@example.com");
    let cid = message.inline_attach("logo.png", &b"\x89PNG\r\n"[..]).unwrap();
    message.attach("a.txt", &b"hi"[..]).unwrap();
    message.set_body(std::io::Cursor::new(format!("<img src=\"cid:{cid}\">")));

    let out = String::from_utf8(message.serialize().unwrap()).unwrap();
    let boundary = boundary_of(&out).unwrap();
    assert_ne!(boundary, cid);

    let parts = attachment_parts(&out, &boundary);
    assert_eq!(parts.len(), 2);

    let (headers, payload) = &parts[0];
    assert!(headers.contains("Content-Disposition: attachment; filename=\"a.txt\""));
    assert!(!headers.contains("Content-ID"));
    assert_eq!(payload, "aGk=");

    let (headers, payload) = &parts[1];
    assert!(headers.contains(&format!("Content-ID: <{cid}>")));
    assert!(headers.contains("Content-Disposition: inline; filename=\"logo.png\""));
    assert_eq!(decode_base64(payload).unwrap(), b"\x89PNG\r\n");

    for line in out.lines().filter(|l| l.starts_with("--")) {
        assert!(line == format!("--{boundary}") || line == format!("--{boundary}--"));
    }
}

#[test]
fn empty_attachment_keeps_its_own_part() {
    let mut message = Message::new().from("sender@example.com").to("a@example.com");
    message.attach("a.bin", &b""[..]).unwrap();
    message.attach("b.bin", &b"hi"[..]).unwrap();

    let out = String::from_utf8(message.serialize().unwrap()).unwrap();
    let boundary = boundary_of(&out).unwrap();
    let parts = attachment_parts(&out, &boundary);

    assert_eq!(parts.len(), 2);
    assert!(parts[0].0.contains("filename=\"a.bin\""));
    assert_eq!(parts[0].1, "");
    assert!(parts[1].0.contains("filename=\"b.bin\""));
    assert_eq!(parts[1].1, "aGk=");
}
