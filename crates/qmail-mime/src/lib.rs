//! # qmail-mime
//!
//! MIME composition for outgoing HTML email.
//!
//! ## Features
//!
//! - **HTML body**: a single `text/html; charset=utf-8` primary part
//! - **Attachments**: named binary parts, Base64 encoded
//! - **Inline resources**: named parts with a generated `Content-ID` for
//!   `cid:` references from the body
//! - **Deterministic layout**: parts are emitted ordered by name
//!
//! ## Quick Start
//!
//! ```ignore
//! use qmail_mime::{Address, Message};
//! use std::fs::File;
//!
//! let mut message = Message::new()
//!     .from(Address::with_name("Reports", "reports@example.com"))
//!     .to("alice@example.com")
//!     .bcc("archive@example.com")
//!     .subject("Weekly report");
//!
//! let logo = message.inline_attach("logo.png", File::open("logo.png")?)?;
//! message.attach("report.pdf", File::open("report.pdf")?)?;
//! message.set_body(std::io::Cursor::new(format!(
//!     "<img src=\"cid:{logo}\"><p>See attached.</p>"
//! )));
//!
//! let raw = message.serialize()?;
//! ```
//!
//! ## Output layout
//!
//! ```text
//! From: Reports <reports@example.com>
//! To: alice@example.com
//! Subject: Weekly report
//! MIME-Version: 1.0
//! Content-Type: multipart/mixed; boundary=<token>
//!
//! --<token>
//! Content-Type: text/html; charset=utf-8
//!
//! <body bytes>
//!
//! --<token>
//! Content-Type: application/octet-stream
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="report.pdf"
//!
//! <base64>
//! --<token>--
//! ```
//!
//! Lines end with a bare `\n`; the SMTP layer converts to CRLF on the wire.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod message;
mod token;

pub mod encoding;

pub use address::{Address, render_list};
pub use error::{Error, Result};
pub use message::{Disposition, Message, PartRef};
pub use token::{TokenSource, UuidTokens};
