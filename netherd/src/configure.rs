//! Idempotent logical-interface configuration.
//!
//! One generic engine drives the loopback and VLAN action families:
//! create, set administrative state, and delete. Each action normalizes
//! its identifier before any network activity, opens a fresh session,
//! elevates, and sends one configuration batch. Expected failures come
//! back as a non-throwing [`ActionOutcome::Failed`] with a human-readable
//! message; only a malformed identifier is a hard error.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use log::warn;
use regex::Regex;
use secrecy::SecretString;

use crate::error::{Error, Result, SessionError, TransportError};
use crate::inventory::{AdminState, DeviceEndpoint, InterfaceKind, SecretSource};
use crate::session::{Connect, DeviceSession};

static LOOPBACK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(?:loopback)?([0-9]+)$").expect("valid pattern"));

static VLAN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(?:vlan)?([0-9]+)$").expect("valid pattern"));

/// A normalized logical interface identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceId {
    pub kind: InterfaceKind,
    pub number: u32,
}

impl InterfaceId {
    /// Parse an identifier into canonical form.
    ///
    /// Accepts bare digits or the type prefix in any case (`7`,
    /// `Loopback7`, `LOOPBACK7`). Anything else fails with
    /// [`Error::InvalidIdentifier`] before any session is opened.
    pub fn parse(kind: InterfaceKind, raw: &str) -> Result<Self> {
        let (pattern, expected) = match kind {
            InterfaceKind::Loopback => (&*LOOPBACK_ID, "digits, e.g. 0 or Loopback0"),
            InterfaceKind::Vlan => (&*VLAN_ID, "digits, e.g. 10 or Vlan10"),
        };

        let number = pattern
            .captures(raw.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidIdentifier {
                input: raw.to_string(),
                expected,
            })?;

        Ok(Self { kind, number })
    }

    /// The canonical interface name, e.g. `Loopback7` or `Vlan42`.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.number)
    }
}

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.number)
    }
}

/// Addressing for a create action.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Interface IP address.
    pub address: String,

    /// Interface netmask.
    pub netmask: String,

    /// Human-readable name (VLANs only; ignored for loopbacks).
    pub description: Option<String>,
}

/// What a successful action changed on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// Interface created and brought up.
    Created {
        address: String,
        netmask: String,
        description: Option<String>,
    },
    /// Administrative state changed.
    StateSet { admin_state: AdminState },
    /// Interface removed.
    Deleted,
}

/// Normalized payload describing one successful device-side change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceChange {
    /// Owning device management IP.
    pub device_ip: String,

    /// The interface the change applies to.
    pub interface: InterfaceId,

    /// When the change was applied.
    pub updated_at: DateTime<Utc>,

    /// The operation performed.
    pub op: ChangeOp,
}

impl InterfaceChange {
    /// Administrative state implied by the change, if any.
    pub fn admin_state(&self) -> Option<AdminState> {
        match &self.op {
            ChangeOp::Created { .. } => Some(AdminState::Up),
            ChangeOp::StateSet { admin_state } => Some(*admin_state),
            ChangeOp::Deleted => None,
        }
    }
}

/// Failure class of a rejected action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect or command timed out; retryable.
    Timeout,
    /// Credentials rejected; not retryable without new credentials.
    Auth,
    /// Privilege escalation rejected; retry with a corrected secret.
    Privilege,
    /// Any other transport or device error.
    Execution,
}

impl FailureKind {
    /// Classify a session-boundary error.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Transport(TransportError::Timeout(_))
            | Error::Transport(TransportError::ConnectionFailed { .. })
            | Error::Session(SessionError::PatternTimeout(_)) => Self::Timeout,
            Error::Transport(TransportError::AuthenticationFailed { .. }) => Self::Auth,
            Error::Session(SessionError::PrivilegeDenied { .. }) => Self::Privilege,
            _ => Self::Execution,
        }
    }
}

/// A rejected action: what class of failure and a message for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a configuration action. Expected failures are data, not
/// errors; nothing here propagates as `Err` to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied(InterfaceChange),
    Failed(ActionFailure),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The failure message, if the action was rejected.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Applied(_) => None,
            Self::Failed(failure) => Some(&failure.message),
        }
    }
}

/// Create a logical interface and bring it administratively up.
pub async fn create_interface<C: Connect>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    kind: InterfaceKind,
    identifier: &str,
    request: CreateRequest,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome> {
    let id = InterfaceId::parse(kind, identifier)?;
    let commands = create_commands(&id, &request);
    let context = format!("creating {} on {}", id, endpoint.host);

    match execute(connector, endpoint, enable_override, &commands, &context).await {
        Ok(()) => Ok(ActionOutcome::Applied(InterfaceChange {
            device_ip: endpoint.host.clone(),
            interface: id,
            updated_at: Utc::now(),
            op: ChangeOp::Created {
                address: request.address,
                netmask: request.netmask,
                description: request.description,
            },
        })),
        Err(failure) => Ok(ActionOutcome::Failed(failure)),
    }
}

/// Administratively enable or disable a logical interface.
pub async fn set_interface_state<C: Connect>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    kind: InterfaceKind,
    identifier: &str,
    enabled: bool,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome> {
    let id = InterfaceId::parse(kind, identifier)?;
    let commands = state_commands(&id, enabled);
    let state = if enabled { "enabling" } else { "disabling" };
    let context = format!("{state} {} on {}", id, endpoint.host);

    match execute(connector, endpoint, enable_override, &commands, &context).await {
        Ok(()) => Ok(ActionOutcome::Applied(InterfaceChange {
            device_ip: endpoint.host.clone(),
            interface: id,
            updated_at: Utc::now(),
            op: ChangeOp::StateSet {
                admin_state: if enabled {
                    AdminState::Up
                } else {
                    AdminState::Down
                },
            },
        })),
        Err(failure) => Ok(ActionOutcome::Failed(failure)),
    }
}

/// Delete a logical interface (and, for VLANs, the VLAN definition).
pub async fn delete_interface<C: Connect>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    kind: InterfaceKind,
    identifier: &str,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome> {
    let id = InterfaceId::parse(kind, identifier)?;
    let commands = delete_commands(&id);
    let context = format!("deleting {} on {}", id, endpoint.host);

    match execute(connector, endpoint, enable_override, &commands, &context).await {
        Ok(()) => Ok(ActionOutcome::Applied(InterfaceChange {
            device_ip: endpoint.host.clone(),
            interface: id,
            updated_at: Utc::now(),
            op: ChangeOp::Deleted,
        })),
        Err(failure) => Ok(ActionOutcome::Failed(failure)),
    }
}

/// Command batch for a create action.
fn create_commands(id: &InterfaceId, request: &CreateRequest) -> Vec<String> {
    let mut commands = Vec::new();

    if id.kind == InterfaceKind::Vlan {
        commands.push(format!("vlan {}", id.number));
        if let Some(description) = &request.description {
            commands.push(format!("name {description}"));
        }
        commands.push("exit".to_string());
    }

    commands.push(format!("interface {id}"));
    commands.push(format!("ip address {} {}", request.address, request.netmask));
    commands.push("no shutdown".to_string());
    commands
}

/// Command batch for a set-state action.
fn state_commands(id: &InterfaceId, enabled: bool) -> Vec<String> {
    vec![
        format!("interface {id}"),
        if enabled { "no shutdown" } else { "shutdown" }.to_string(),
    ]
}

/// Command batch for a delete action.
fn delete_commands(id: &InterfaceId) -> Vec<String> {
    let mut commands = vec![format!("no interface {id}")];
    if id.kind == InterfaceKind::Vlan {
        commands.push(format!("no vlan {}", id.number));
    }
    commands
}

/// Open a session, elevate, and send one configuration batch.
///
/// Every expected failure is converted to an [`ActionFailure`] here; the
/// session is closed (or dropped) on all paths.
async fn execute<C: Connect>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    enable_override: Option<&SecretString>,
    commands: &[String],
    context: &str,
) -> std::result::Result<(), ActionFailure> {
    let mut session = connector.connect(endpoint).await.map_err(|err| ActionFailure {
        kind: FailureKind::classify(&err),
        message: format!("connecting to {} failed: {err}", endpoint.host),
    })?;

    let (secret, source) = endpoint.resolve_enable_secret(enable_override);
    if source == SecretSource::PasswordFallback {
        warn!(
            "{}: no enable secret on file, falling back to the login password",
            endpoint.host
        );
    }

    if let Err(err) = session.elevate(secret).await {
        let _ = session.close().await;
        let mut message = format!(
            "could not enter privileged mode on {}: {err}",
            endpoint.host
        );
        if source == SecretSource::PasswordFallback {
            message.push_str("; configure an enable secret for this device");
        }
        return Err(ActionFailure {
            kind: FailureKind::classify(&err),
            message,
        });
    }

    if let Err(err) = session.send_config(commands).await {
        let _ = session.close().await;
        return Err(ActionFailure {
            kind: FailureKind::classify(&err),
            message: format!("{context} failed: {err}"),
        });
    }

    if let Err(err) = session.close().await {
        warn!("{}: closing session failed: {err}", endpoint.host);
    }
    Ok(())
}
