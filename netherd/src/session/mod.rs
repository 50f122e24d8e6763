//! Interactive device sessions.
//!
//! A [`DeviceSession`] is one authenticated interactive CLI session to one
//! device: strictly sequential commands, optional privilege escalation, and
//! structured output parsing. Sessions are opened per logical operation
//! through a [`Connect`] factory and never shared across operations.

pub mod prompt;
mod response;
mod ssh;

#[cfg(test)]
pub(crate) mod testing;

pub use prompt::PromptLevel;
pub use response::Response;
pub use ssh::{SshConnector, SshSession};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{ParseError, Result};
use crate::inventory::DeviceEndpoint;
use crate::parse::Record;

/// Raw output of a command together with its structured parse attempt.
///
/// The command runs once; a parse miss leaves the raw [`Response`] in hand
/// so callers can degrade to text without a second device round trip.
#[derive(Debug)]
pub struct StructuredResponse {
    /// The raw command response.
    pub response: Response,

    /// The structured records, or why parsing was unavailable.
    pub records: std::result::Result<Vec<Record>, ParseError>,
}

/// One interactive session to one device.
///
/// Commands within a session are strictly sequential; the underlying CLI
/// protocol has no pipelining. Dropping a session releases its transport,
/// so abandonment on any error path closes the connection.
#[async_trait]
pub trait DeviceSession: Send {
    /// Enter privileged mode using the given enable secret.
    ///
    /// A no-op if the session is already privileged. Fails with
    /// [`crate::error::SessionError::PrivilegeDenied`] if the device rejects
    /// the escalation.
    async fn elevate(&mut self, secret: &SecretString) -> Result<()>;

    /// Send a command and wait for the next prompt, returning raw text.
    async fn send_command(&mut self, command: &str) -> Result<Response>;

    /// Send a batch of commands in configuration mode.
    ///
    /// Enters configuration mode, sends every command, and returns to
    /// privileged exec. Fails on the first command the device rejects.
    async fn send_config(&mut self, commands: &[String]) -> Result<()>;

    /// Send a command once, returning the raw response alongside the
    /// structured parse attempt.
    async fn send_structured(&mut self, command: &str) -> Result<StructuredResponse>;

    /// Send a command and parse its output into structured records.
    ///
    /// Fails with [`crate::error::ParseError::NoTemplate`] if no template is
    /// registered for the command; never silently degrades to raw text.
    async fn send_parsed(&mut self, command: &str) -> Result<Vec<Record>> {
        Ok(self.send_structured(command).await?.records?)
    }

    /// Close the session, releasing the transport.
    async fn close(&mut self) -> Result<()>;
}

/// Factory opening one session per logical operation.
#[async_trait]
pub trait Connect: Send + Sync {
    type Session: DeviceSession;

    /// Open an authenticated session to the endpoint.
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<Self::Session>;
}
