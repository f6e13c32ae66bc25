//! SMTP command builder and DATA payload encoding.

use crate::types::AuthMechanism;

/// SMTP command issued during delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: &'a str,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (optional, for SASL-IR)
        initial_response: Option<&'a str>,
    },
    /// Bare SASL continuation line (base64 or empty)
    AuthResponse(&'a str),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Envelope sender
        from: &'a str,
        /// Request 8BITMIME transport
        eight_bit: bool,
        /// SIZE parameter
        size: Option<usize>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Envelope recipient
        to: &'a str,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command<'_> {
    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
                if let Some(resp) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(resp.as_bytes());
                }
            }
            Self::AuthResponse(resp) => buf.extend_from_slice(resp.as_bytes()),
            Self::MailFrom {
                from,
                eight_bit,
                size,
            } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_bytes());
                buf.push(b'>');
                if *eight_bit {
                    buf.extend_from_slice(b" BODY=8BITMIME");
                }
                if let Some(msg_size) = size {
                    buf.extend_from_slice(format!(" SIZE={msg_size}").as_bytes());
                }
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_bytes());
                buf.push(b'>');
            }
            Self::Data => buf.extend_from_slice(b"DATA"),
            Self::Quit => buf.extend_from_slice(b"QUIT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Line that ends the DATA phase.
const DATA_TERMINATOR: &[u8] = b".\r\n";

/// Encodes a message for the DATA phase.
///
/// Line endings are normalized to CRLF (bare `\n` and existing `\r\n`
/// alike), lines starting with `.` are dot-stuffed, and the terminating
/// `.` line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + message.len() / 32 + 5);
    let body = message.strip_suffix(b"\n").unwrap_or(message);

    if !message.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                buf.push(b'.');
            }
            buf.extend_from_slice(line);
            buf.extend_from_slice(b"\r\n");
        }
    }

    buf.extend_from_slice(DATA_TERMINATOR);
    buf
}

/// Size of an encoded DATA payload as declared with `SIZE=`: every byte
/// sent on the wire except the terminating `.` line.
#[must_use]
pub const fn data_size(payload: &[u8]) -> usize {
    payload.len().saturating_sub(DATA_TERMINATOR.len())
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
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com",
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_auth_plain_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw=="),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_auth_login_without_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
        assert_eq!(Command::AuthResponse("").serialize(), b"\r\n");
    }

    #[test]
    fn test_mail_from_plain() {
        let cmd = Command::MailFrom {
            from: "sender@example.com",
            eight_bit: false,
            size: None,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn test_mail_from_with_params() {
        let cmd = Command::MailFrom {
            from: "sender@example.com",
            eight_bit: true,
            size: Some(2048),
        };
        assert_eq!(
            cmd.serialize(),
            b"MAIL FROM:<sender@example.com> BODY=8BITMIME SIZE=2048\r\n"
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(
            Command::RcptTo {
                to: "rcpt@example.com"
            }
            .serialize(),
            b"RCPT TO:<rcpt@example.com>\r\n"
        );
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_encode_data_normalizes_line_endings() {
        assert_eq!(
            encode_data(b"Subject: x\nMIME-Version: 1.0\r\n\nbody"),
            b"Subject: x\r\nMIME-Version: 1.0\r\n\r\nbody\r\n.\r\n"
        );
    }

    #[test]
    fn test_encode_data_trailing_newline_not_doubled() {
        assert_eq!(encode_data(b"a\n"), b"a\r\n.\r\n");
        assert_eq!(encode_data(b"a\r\n"), b"a\r\n.\r\n");
        assert_eq!(encode_data(b"a\n\n"), b"a\r\n\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_dot_stuffing() {
        assert_eq!(
            encode_data(b".hidden\nok\n..two"),
            b"..hidden\r\nok\r\n...two\r\n.\r\n"
        );
    }

    #[test]
    fn test_data_size_counts_crlf_without_terminator() {
        assert_eq!(data_size(&encode_data(b"a\nb\n")), 6);
        assert_eq!(data_size(&encode_data(b"")), 0);
        assert_eq!(data_size(b""), 0);
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n");
    }
}
