//! Persistent inventory and state store interface.
//!
//! Seven logical collections: router credentials, switch credentials,
//! loopback interfaces, VLAN interfaces, and three append-only snapshot
//! histories (interface status, route table, port status). The physical
//! backend is injected; [`MemoryStore`] is the in-process implementation.
//!
//! Per-key upserts are atomic, so concurrent writers for distinct
//! (device, interface) or (device) keys never interleave partial records.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::inventory::{AdminState, CredentialClass, DeviceCredential, InterfaceKind};
use crate::parse::Record;

/// Whether an upsert created a new record or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Key of a logical interface record: (device ip, canonical name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceKey {
    pub device_ip: String,
    pub name: String,
}

impl InterfaceKey {
    pub fn new(device_ip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device_ip: device_ip.into(),
            name: name.into(),
        }
    }
}

/// A persisted logical interface.
///
/// Advisory cache of the last successful device-side change, not an
/// authoritative view: if a device-side delete silently failed earlier,
/// the record and the device may diverge until the next reconciling action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Owning device management IP.
    pub device_ip: String,

    /// Canonical interface name, e.g. `Loopback7` or `Vlan42`.
    pub name: String,

    /// Interface kind, which also selects the collection.
    pub kind: InterfaceKind,

    /// Interface IP address.
    pub address: String,

    /// Interface netmask.
    pub netmask: String,

    /// Human-readable name (VLANs only).
    pub description: Option<String>,

    /// Administrative state as of the last change.
    pub admin_state: AdminState,

    /// Set once when the record is first inserted.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last successful change.
    pub updated_at: DateTime<Utc>,
}

impl InterfaceRecord {
    /// The record's collection key.
    pub fn key(&self) -> InterfaceKey {
        InterfaceKey::new(self.device_ip.clone(), self.name.clone())
    }
}

/// Which state table a snapshot captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotTable {
    InterfaceStatus,
    RouteTable,
    PortStatus,
}

/// Snapshot payload: parsed records, or raw text when structured parsing
/// was unavailable for the observed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPayload {
    Parsed(Vec<Record>),
    Raw(String),
}

/// One captured state snapshot. Append-only; history is the sequence
/// ordered by `captured_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub device_ip: String,
    pub table: SnapshotTable,
    pub captured_at: DateTime<Utc>,
    pub payload: SnapshotPayload,
}

/// Inventory and state store.
///
/// Injected into the classifier, reconciler, and polling pipeline;
/// instantiated once per process with explicit lifecycle.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or overwrite a credential, keyed by ip within the class.
    ///
    /// The update path overwrites username, password, and secret; records
    /// are never auto-deleted.
    async fn upsert_credential(
        &self,
        class: CredentialClass,
        cred: DeviceCredential,
    ) -> Result<UpsertOutcome, StoreError>;

    /// All credentials in a class, ordered by ip.
    async fn credentials(
        &self,
        class: CredentialClass,
    ) -> Result<Vec<DeviceCredential>, StoreError>;

    /// Insert or overwrite a logical interface record.
    ///
    /// `created_at` has set-on-insert semantics: preserved on update,
    /// taken from the record on insert. All other fields are overwritten.
    async fn upsert_interface(
        &self,
        record: InterfaceRecord,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Patch only the admin state and update timestamp of a record.
    ///
    /// If no record exists for the key, a minimal record carrying the
    /// identifying fields is created so the interface becomes discoverable.
    async fn set_interface_state(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
        state: AdminState,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Remove an interface record. Returns whether a record existed;
    /// absence is not an error.
    async fn remove_interface(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
    ) -> Result<bool, StoreError>;

    /// Look up an interface record.
    async fn interface(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
    ) -> Result<Option<InterfaceRecord>, StoreError>;

    /// Append one snapshot to the history.
    async fn append_snapshot(&self, snapshot: StateSnapshot) -> Result<(), StoreError>;

    /// Snapshot history for a device and table, ordered by capture time.
    async fn snapshots(
        &self,
        device_ip: &str,
        table: SnapshotTable,
    ) -> Result<Vec<StateSnapshot>, StoreError>;
}
