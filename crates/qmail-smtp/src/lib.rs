//! # qmail-smtp
//!
//! SMTP relay transport: takes a serialized message plus an envelope and
//! hands it to a mail server (RFC 5321).
//!
//! ## Features
//!
//! - **Stream-generic session**: the same [`Client`] drives plain TCP, TLS,
//!   or an in-memory stream
//! - **TLS support**: implicit TLS (port 465), required STARTTLS, and
//!   opportunistic STARTTLS
//! - **Authentication**: PLAIN (LOGIN fallback) and XOAUTH2, refused over
//!   plaintext to non-loopback relays
//! - **Extensions**: 8BITMIME, SIZE, PIPELINING, SMTPUTF8 recognized in EHLO
//!
//! ## Quick Start
//!
//! ```ignore
//! use qmail_smtp::{Credentials, RelayAddress, SmtpTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> qmail_smtp::Result<()> {
//!     let relay = RelayAddress::parse("smtp.example.com:587")?;
//!     let creds = Credentials::plain("user@example.com", "password");
//!     let rcpts = vec!["friend@example.com".to_string()];
//!
//!     SmtpTransport::new()
//!         .send_mail(&relay, &creds, "user@example.com", &rcpts, b"Subject: hi\n\nhello\n")
//!         .await
//! }
//! ```
//!
//! ## Delivery flow
//!
//! ```text
//! greeting ─→ EHLO ─→ [STARTTLS ─→ EHLO] ─→ [AUTH] ─→ MAIL FROM ─→ RCPT TO* ─→ DATA ─→ QUIT
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders and DATA encoding
//! - [`connection`]: TCP/TLS setup and the session client
//! - [`parser`]: Reply parser
//! - [`transport`]: The [`Transport`] seam and [`SmtpTransport`]
//! - [`types`]: Relay addresses, credentials, extensions, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod transport;
pub mod types;

pub use connection::{Client, ServerInfo};
pub use error::{Error, Result};
pub use transport::{Envelope, SmtpTransport, Transport, deliver};
pub use types::{
    AuthMechanism, Credentials, Extension, RelayAddress, Reply, ReplyCode, Security,
};
