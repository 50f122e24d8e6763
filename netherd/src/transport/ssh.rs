//! SSH transport implementation using russh.

use std::sync::Arc;
use std::time::Instant;

use log::debug;
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::SshConfig;
use crate::channel::PatternBuffer;
use crate::error::{Result, SessionError, TransportError};

/// SSH transport wrapping a russh client with an interactive PTY channel.
///
/// Dropping the transport drops the underlying russh handle, which tears
/// down the connection. Every exit path of a caller therefore releases the
/// device's management session, with or without an explicit `close()`.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The interactive shell channel.
    channel: Channel<Msg>,

    /// Accumulated output between reads.
    buffer: PatternBuffer,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the device, authenticate, and open a PTY shell channel.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let handler = SshHandler {
            host: config.host.clone(),
        };

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(TransportError::Ssh)?;

        Self::authenticate(&mut session, &config).await?;

        let channel = Self::open_channel(&session, &config).await?;

        Ok(Self {
            session,
            channel,
            buffer: PatternBuffer::default(),
            config,
        })
    }

    /// Authenticate with the server using the configured password.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Open the interactive PTY channel.
    async fn open_channel(
        session: &Handle<SshHandler>,
        config: &SshConfig,
    ) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(|_| SessionError::PtyOpenFailed)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|_| SessionError::PtyOpenFailed)?;

        channel
            .request_shell(true)
            .await
            .map_err(|_| SessionError::ShellRequestFailed)?;

        Ok(channel)
    }

    /// Send one line of input, terminated with a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.channel
            .data(data.as_slice())
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    /// Read channel output until the pattern appears in the buffer tail.
    ///
    /// Returns the accumulated output, draining the internal buffer. Fails
    /// with [`SessionError::PatternTimeout`] if the pattern does not appear
    /// within the configured timeout, and [`TransportError::Disconnected`]
    /// if the channel closes first.
    pub async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::PatternTimeout(self.config.timeout).into());
            }

            let msg = tokio::time::timeout(remaining, self.channel.wait())
                .await
                .map_err(|_| SessionError::PatternTimeout(self.config.timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransportError::Disconnected.into());
                }
                Some(other) => {
                    debug!("ignoring channel message: {other:?}");
                }
            }
        }
    }

    /// The host this transport is connected to.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
///
/// Host keys are accepted without verification: the management plane
/// carries password-only credentials and has no key inventory to pin
/// against.
struct SshHandler {
    host: String,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!("accepting host key for {}", self.host);
        Ok(true)
    }
}
