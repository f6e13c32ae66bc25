//! # qmail
//!
//! Compose an HTML email with attachments and inline resources, then hand
//! it to an SMTP relay.
//!
//! - [`Message`] (from `qmail-mime`) builds and serializes the MIME document
//! - [`Dispatcher`] checks the envelope and calls a [`Transport`]
//! - [`RelayConfig`] loads relay settings from JSON
//!
//! ```ignore
//! use qmail::{Dispatcher, Message, RelayConfig};
//!
//! # async fn run() -> qmail::Result<()> {
//! let config = RelayConfig::load("relay.json".as_ref())?;
//! let mut message = Message::new()
//!     .from("Alice <alice@example.com>")
//!     .to("bob@example.com")
//!     .subject("Hello")
//!     .html_body("<p>Hi Bob</p>");
//!
//! Dispatcher::new(config.transport())
//!     .send(&config.address(), &config.credentials(), &mut message)
//!     .await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
mod error;
pub mod logging;

pub use config::RelayConfig;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};

pub use qmail_mime::{Address, Message};
pub use qmail_smtp::{Credentials, RelayAddress, Security, SmtpTransport, Transport};
