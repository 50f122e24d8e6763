//! Device role classification.
//!
//! A device's role is derived from two capability probes: does it answer
//! `show ip route` (layer-3 forwarding) and does it answer
//! `show mac address-table` (layer-2 switching). A recognized
//! "unsupported command" response is a distinguishable outcome, not an
//! error; transport failures abort classification.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::inventory::{CredentialClass, DeviceCredential, DeviceEndpoint, Role};
use crate::parse::SHOW_IP_ROUTE;
use crate::session::{Connect, DeviceSession};
use crate::store::{Store, UpsertOutcome};

/// Probe for layer-3 capability.
pub const ROUTING_PROBE: &str = SHOW_IP_ROUTE;

/// Probe for layer-2 capability.
pub const MAC_TABLE_PROBE: &str = "show mac address-table";

/// Literal substrings the device emits for unsupported or malformed
/// commands. Centralized here so the brittle sniffing is testable in one
/// place.
const UNSUPPORTED_MARKERS: &[&str] = &["Invalid input detected", "ambiguous command"];

/// Whether output is the device's way of saying "unsupported command".
pub fn is_unsupported_response(text: &str) -> bool {
    UNSUPPORTED_MARKERS.iter().any(|m| text.contains(m))
}

/// Outcome of one capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Present,
    Absent,
}

/// Result of a successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The derived role.
    pub role: Role,

    /// Whether the credential record was created or updated.
    pub persisted: UpsertOutcome,
}

impl Classification {
    /// Which collection the credential landed in.
    pub fn storage_class(&self) -> CredentialClass {
        self.role.storage_class()
    }
}

/// Derive the role from the two capability signals.
///
/// `None` means neither capability was observed and the device cannot be
/// classified.
pub fn derive_role(routing: Capability, mac_table: Capability) -> Option<Role> {
    use Capability::*;
    match (routing, mac_table) {
        (Present, Absent) => Some(Role::Router),
        (Absent, Present) => Some(Role::Layer2Switch),
        (Present, Present) => Some(Role::Layer3Switch),
        (Absent, Absent) => None,
    }
}

/// Classify a device and upsert its credentials into the role-appropriate
/// collection.
///
/// Transport-level failures (connect timeout, rejected credentials)
/// propagate as typed errors with nothing persisted. An unclassifiable
/// device fails with [`Error::UnknownDevice`], also persisting nothing.
pub async fn classify<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
) -> Result<Classification>
where
    C: Connect,
    S: Store + ?Sized,
{
    let mut session = connector.connect(endpoint).await?;
    let probed = probe_pair(&mut session).await;
    let _ = session.close().await;
    let (routing, mac_table) = probed?;

    debug!(
        "{}: routing {:?}, mac table {:?}",
        endpoint.host, routing, mac_table
    );

    let role = derive_role(routing, mac_table).ok_or_else(|| Error::UnknownDevice {
        host: endpoint.host.clone(),
    })?;

    let persisted = store
        .upsert_credential(role.storage_class(), DeviceCredential::from_endpoint(endpoint))
        .await?;

    info!(
        "{} classified as {role}, credential {}",
        endpoint.host,
        match persisted {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    );

    Ok(Classification { role, persisted })
}

async fn probe_pair<S: DeviceSession>(session: &mut S) -> Result<(Capability, Capability)> {
    let routing = probe(session, ROUTING_PROBE).await?;
    let mac_table = probe(session, MAC_TABLE_PROBE).await?;
    Ok((routing, mac_table))
}

/// Run one capability probe.
///
/// An unsupported-command response or empty output is `Absent`; transport
/// errors propagate.
async fn probe<S: DeviceSession>(session: &mut S, command: &str) -> Result<Capability> {
    let response = session.send_command(command).await?;
    let text = response.result.trim();
    if text.is_empty() || is_unsupported_response(text) {
        Ok(Capability::Absent)
    } else {
        Ok(Capability::Present)
    }
}
