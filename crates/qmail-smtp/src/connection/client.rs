//! SMTP client over any async byte stream.

use super::ServerInfo;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{AuthMechanism, Credentials, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// SMTP client session.
///
/// Generic over the transport stream so the same session logic runs over
/// plain TCP, TLS, or an in-memory stream.
#[derive(Debug)]
pub struct Client<S> {
    stream: BufReader<S>,
    server_info: ServerInfo,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a fresh connection and reads the server
    /// greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server is not
    /// ready.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut client = Self::resume(stream, ServerInfo::default());
        let greeting = client.read_reply().await?.expect(ReplyCode::SERVICE_READY)?;

        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %client.server_info.hostname, "connected");

        Ok(client)
    }

    /// Continues a session over a new stream (after a TLS upgrade) without
    /// expecting another greeting.
    #[must_use]
    pub fn resume(stream: S, server_info: ServerInfo) -> Self {
        Self {
            stream: BufReader::new(stream),
            server_info,
        }
    }

    /// Splits the client into its stream and server information.
    pub fn into_parts(self) -> (S, ServerInfo) {
        (self.stream.into_inner(), self.server_info)
    }

    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends EHLO and records the server's extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname,
            })
            .await?
            .expect_success()?;

        // First line is the greeting, the rest are extensions
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        debug!(extensions = ?self.server_info.extensions, "EHLO accepted");
        Ok(())
    }

    /// Sends STARTTLS. On success the caller must run the TLS handshake on
    /// the underlying stream and EHLO again.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or is refused.
    pub async fn starttls(&mut self) -> Result<()> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.send_command(Command::StartTls)
            .await?
            .expect(ReplyCode::SERVICE_READY)?;
        Ok(())
    }

    /// Authenticates with the given credentials. Does nothing for
    /// [`Credentials::None`].
    ///
    /// Username/password credentials use PLAIN, falling back to LOGIN when
    /// the server only offers LOGIN.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not offer a usable mechanism or
    /// rejects the credentials.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        match credentials {
            Credentials::None => Ok(()),
            Credentials::Plain { username, password } => {
                let offered = self.server_info.auth_mechanisms();
                let use_plain = offered.is_empty() || offered.contains(&AuthMechanism::Plain);
                let use_login = offered.contains(&AuthMechanism::Login);

                if use_plain {
                    self.auth_plain(username, password).await
                } else if use_login {
                    self.auth_login(username, password).await
                } else {
                    Err(Error::NotSupported("AUTH PLAIN".into()))
                }
            }
            Credentials::XOAuth2 { user, token } => self.auth_xoauth2(user, token).await,
        }
    }

    async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        debug!(mechanism = "PLAIN", "authenticating");
        let response = STANDARD.encode(format!("\0{username}\0{password}"));
        self.send_command(Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(&response),
        })
        .await?
        .expect_success()?;
        Ok(())
    }

    async fn auth_login(&mut self, username: &str, password: &str) -> Result<()> {
        debug!(mechanism = "LOGIN", "authenticating");
        self.send_command(Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        })
        .await?
        .expect(ReplyCode::AUTH_CONTINUE)?;

        let username = STANDARD.encode(username);
        self.send_command(Command::AuthResponse(&username))
            .await?
            .expect(ReplyCode::AUTH_CONTINUE)?;

        let password = STANDARD.encode(password);
        self.send_command(Command::AuthResponse(&password))
            .await?
            .expect_success()?;
        Ok(())
    }

    async fn auth_xoauth2(&mut self, user: &str, token: &str) -> Result<()> {
        debug!(mechanism = "XOAUTH2", "authenticating");
        let response = STANDARD.encode(format!("user={user}\x01auth=Bearer {token}\x01\x01"));
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::XOAuth2,
                initial_response: Some(&response),
            })
            .await?;

        if reply.code == ReplyCode::AUTH_CONTINUE {
            // The challenge carries error details; an empty response ends
            // the exchange and yields the final failure reply.
            let detail = reply.message_text();
            let failure = self.send_command(Command::AuthResponse("")).await?;
            return Err(Error::smtp_error(
                failure.code.as_u16(),
                format!("{} ({detail})", failure.message_text()),
            ));
        }

        reply.expect_success()?;
        Ok(())
    }

    /// Starts a mail transaction for a message of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if the server advertised a smaller
    /// SIZE limit, or an error if MAIL FROM is rejected.
    pub async fn mail_from(&mut self, from: &str, size: usize) -> Result<()> {
        let limit = self.server_info.max_message_size();
        if let Some(limit) = limit
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let cmd = Command::MailFrom {
            from,
            eight_bit: self.server_info.supports_8bitmime(),
            size: limit.map(|_| size),
        };
        self.send_command(cmd).await?.expect_success()?;
        Ok(())
    }

    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<()> {
        self.send_command(Command::RcptTo { to })
            .await?
            .expect_success()?;
        Ok(())
    }

    /// Sends DATA followed by `payload` and completes the transaction.
    ///
    /// `payload` is written verbatim and must come from
    /// [`encode_data`](crate::command::encode_data).
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses DATA or rejects the message.
    pub async fn send_data(&mut self, payload: &[u8]) -> Result<()> {
        self.send_command(Command::Data)
            .await?
            .expect(ReplyCode::START_DATA)?;

        trace!(bytes = payload.len(), "sending message data");
        self.write_all(payload).await?;

        self.read_reply().await?.expect_success()?;
        Ok(())
    }

    /// Sends QUIT and ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }

    async fn send_command(&mut self, cmd: Command<'_>) -> Result<Reply> {
        match &cmd {
            Command::Auth { mechanism, .. } => trace!(">> AUTH {}", mechanism.as_str()),
            Command::AuthResponse(_) => trace!(">> <auth response>"),
            other => trace!(">> {other:?}"),
        }
        self.write_all(&cmd.serialize()).await?;
        self.read_reply().await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(Error::Protocol("Connection closed by server".into()));
            }

            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            trace!("<< {line}");

            let is_last = is_last_reply_line(&line);
            lines.push(line);
            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }
}
