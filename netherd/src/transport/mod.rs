//! SSH transport layer.
//!
//! Wraps russh with connect/authenticate/PTY setup and line-oriented
//! send and pattern-bounded read operations.

mod config;
mod ssh;

pub use config::SshConfig;
pub use ssh::SshTransport;

use async_trait::async_trait;
use regex::bytes::Regex;

use crate::error::Result;

/// Line-oriented interactive wire: what a session needs from a transport.
///
/// Lets session logic (prompt dialogues, recovery paths) be exercised over
/// a scripted wire in tests.
#[async_trait]
pub(crate) trait Wire: Send {
    /// Send one line of input, terminated with a newline.
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Read output until the pattern appears in the buffer tail.
    async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;

    /// The host this wire is connected to.
    fn host(&self) -> &str;
}

#[async_trait]
impl Wire for SshTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        SshTransport::send_line(self, line).await
    }

    async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        SshTransport::read_until(self, pattern).await
    }

    async fn close(&mut self) -> Result<()> {
        SshTransport::close(self).await
    }

    fn host(&self) -> &str {
        SshTransport::host(self)
    }
}
