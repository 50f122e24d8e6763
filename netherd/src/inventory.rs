//! Device inventory model: endpoints, credentials, roles.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default SSH management port.
pub const DEFAULT_PORT: u16 = 22;

/// Default connect and per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rebuild an owned secret from an existing one.
///
/// Used where a second owned copy is needed (e.g. building an
/// [`crate::transport::SshConfig`] from an endpoint).
pub(crate) fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// A validated device management endpoint.
///
/// Validated once at construction, then passed by reference into every
/// session-opening operation.
#[derive(Debug)]
pub struct DeviceEndpoint {
    /// Hostname or IP address.
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Privileged-mode secret, if one is on file.
    pub enable_secret: Option<SecretString>,

    /// Connect and per-command timeout.
    pub timeout: Duration,
}

impl DeviceEndpoint {
    /// Create an endpoint, validating the identifying fields.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Result<Self> {
        let host = host.into();
        let username = username.into();

        if host.trim().is_empty() {
            return Err(Error::InvalidEndpoint {
                message: "host must not be empty".to_string(),
            });
        }
        if username.trim().is_empty() {
            return Err(Error::InvalidEndpoint {
                message: "username must not be empty".to_string(),
            });
        }

        Ok(Self {
            host,
            port: DEFAULT_PORT,
            username,
            password,
            enable_secret: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the privileged-mode secret.
    pub fn with_enable_secret(mut self, secret: SecretString) -> Self {
        self.enable_secret = Some(secret);
        self
    }

    /// Set the connect and per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build an endpoint from a stored credential.
    pub fn from_credential(cred: &DeviceCredential) -> Result<Self> {
        let mut endpoint = Self::new(
            cred.ip.clone(),
            cred.username.clone(),
            SecretString::from(cred.password.clone()),
        )?;
        if let Some(secret) = &cred.secret {
            endpoint.enable_secret = Some(SecretString::from(secret.clone()));
        }
        Ok(endpoint)
    }

    /// Resolve the enable secret to use for privilege escalation.
    ///
    /// Precedence: explicit override, then the stored secret, then the login
    /// password. The password fallback mirrors how these devices are
    /// commonly provisioned; callers log it so operators can close the gap.
    pub fn resolve_enable_secret<'a>(
        &'a self,
        explicit: Option<&'a SecretString>,
    ) -> (&'a SecretString, SecretSource) {
        if let Some(secret) = explicit {
            (secret, SecretSource::Override)
        } else if let Some(secret) = &self.enable_secret {
            (secret, SecretSource::Stored)
        } else {
            (&self.password, SecretSource::PasswordFallback)
        }
    }
}

/// Where a resolved enable secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// Passed explicitly for this one action.
    Override,
    /// Stored on the device credential.
    Stored,
    /// No secret on file; the login password was reused.
    PasswordFallback,
}

/// A stored device credential, keyed by ip within its class.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceCredential {
    /// Management IP address.
    pub ip: String,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Privileged-mode secret, if configured.
    pub secret: Option<String>,
}

impl DeviceCredential {
    /// Capture the credential fields of an endpoint for persistence.
    pub fn from_endpoint(endpoint: &DeviceEndpoint) -> Self {
        Self {
            ip: endpoint.host.clone(),
            username: endpoint.username.clone(),
            password: endpoint.password.expose_secret().to_owned(),
            secret: endpoint
                .enable_secret
                .as_ref()
                .map(|s| s.expose_secret().to_owned()),
        }
    }
}

impl fmt::Debug for DeviceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredential")
            .field("ip", &self.ip)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Inferred device function, derived from observed command capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Router,
    Layer2Switch,
    Layer3Switch,
}

impl Role {
    /// Which credential collection a device of this role is stored in.
    ///
    /// A layer-3 switch is stored as a switch; its routing capability is
    /// informational only.
    pub fn storage_class(self) -> CredentialClass {
        match self {
            Self::Router => CredentialClass::Router,
            Self::Layer2Switch | Self::Layer3Switch => CredentialClass::Switch,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Router => write!(f, "Router"),
            Self::Layer2Switch => write!(f, "Layer 2 Switch"),
            Self::Layer3Switch => write!(f, "Layer 3 Switch"),
        }
    }
}

/// Which credential collection a device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialClass {
    Router,
    Switch,
}

/// Administrative state of a logical interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    Down,
}

impl AdminState {
    /// The state as it appears in payloads and stored records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Kind of software-defined interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    /// Router loopback interface.
    Loopback,
    /// Switch virtual (VLAN) interface.
    Vlan,
}

impl InterfaceKind {
    /// Canonical interface name prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Loopback => "Loopback",
            Self::Vlan => "Vlan",
        }
    }
}
