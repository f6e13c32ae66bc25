//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One line of a (possibly multi-line) reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Three-digit reply code.
    pub code: ReplyCode,
    /// True for the final line (`250 ...`), false for continuations
    /// (`250-...`).
    pub is_last: bool,
    /// Text after the code and separator.
    pub text: &'a str,
}

/// Parses a single reply line, with or without its trailing CRLF.
///
/// # Errors
///
/// Returns an error if the line does not start with a three-digit code
/// followed by ` `, `-` or the end of the line.
pub fn parse_reply_line(line: &str) -> Result<ReplyLine<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let digits = line
        .get(..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Invalid reply line: {line}")))?;
    let code = digits
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {digits}")))?;

    let (is_last, text) = match line.as_bytes().get(3) {
        None => (true, ""),
        Some(b' ') => (true, &line[4..]),
        Some(b'-') => (false, &line[4..]),
        Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
    };

    Ok(ReplyLine {
        code: ReplyCode::new(code),
        is_last,
        text,
    })
}

/// Parses an SMTP reply from its response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is empty, a line is malformed, or the
/// lines carry different codes.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let mut code = None;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        let parsed = parse_reply_line(line)?;
        match code {
            None => code = Some(parsed.code),
            Some(first) if first != parsed.code => {
                return Err(Error::Protocol(format!(
                    "Mismatched reply codes: {first} then {}",
                    parsed.code
                )));
            }
            Some(_) => {}
        }
        message.push(parsed.text.to_string());
    }

    let code = code.ok_or_else(|| Error::Protocol("Empty reply".into()))?;
    Ok(Reply::new(code, message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the
/// last line.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    parse_reply_line(line).is_ok_and(|parsed| parsed.is_last)
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

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let reply = parse_reply(&lines(&[
            "250-mx.example.com greets you",
            "250-STARTTLS",
            "250-AUTH PLAIN LOGIN",
            "250 8BITMIME",
        ]))
        .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.message.len(), 4);
        assert_eq!(reply.message[2], "AUTH PLAIN LOGIN");
    }

    #[test]
    fn test_parse_code_only_line() {
        let reply = parse_reply(&lines(&["354"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.message, vec![""]);
    }

    #[test]
    fn test_parse_line_strips_crlf() {
        let parsed = parse_reply_line("220 ready\r\n").unwrap();
        assert_eq!(parsed.text, "ready");
        assert!(parsed.is_last);
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
        assert!(!is_last_reply_line("garbage"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["250xOK"])).is_err());
        assert!(parse_reply(&lines(&["250-one", "251 two"])).is_err());
    }
}
