//! Error types for netherd.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netherd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Interactive session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Structured output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Inventory store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Interface identifier did not match the expected form.
    ///
    /// Raised before any session is opened; this is caller input error,
    /// not a device failure.
    #[error("Invalid interface identifier '{input}' (expected {expected})")]
    InvalidIdentifier {
        input: String,
        expected: &'static str,
    },

    /// Classification probes found neither a routing table nor a MAC table.
    #[error("Could not classify device {host}: no routing table and no MAC address table")]
    UnknownDevice { host: String },

    /// Device endpoint failed validation at construction.
    #[error("Invalid device endpoint: {message}")]
    InvalidEndpoint { message: String },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Interactive session errors (prompt matching, privilege escalation).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Prompt not seen within the timeout
    #[error("Prompt not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Privilege escalation was rejected by the device
    #[error("Privileged mode rejected, prompt remained '{prompt}'")]
    PrivilegeDenied { prompt: String },

    /// The device rejected a configuration command
    #[error("Command '{command}' rejected: {message}")]
    CommandRejected { command: String, message: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Structured-output parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No template is registered for the command
    #[error("No template registered for command '{command}'")]
    NoTemplate { command: String },

    /// The template engine failed on the output
    #[error("Template for '{command}' failed: {message}")]
    Template { command: String, message: String },
}

/// Inventory store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific failure
    #[error("Store backend error: {message}")]
    Backend { message: String },
}

/// Result type alias using netherd's Error.
pub type Result<T> = std::result::Result<T, Error>;
