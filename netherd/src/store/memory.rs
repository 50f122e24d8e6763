//! In-process store implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    InterfaceKey, InterfaceRecord, SnapshotTable, StateSnapshot, Store, UpsertOutcome,
};
use crate::error::StoreError;
use crate::inventory::{AdminState, CredentialClass, DeviceCredential, InterfaceKind};

type InterfaceMap = HashMap<(String, String), InterfaceRecord>;

#[derive(Default)]
struct Inner {
    routers: HashMap<String, DeviceCredential>,
    switches: HashMap<String, DeviceCredential>,
    loopbacks: InterfaceMap,
    vlans: InterfaceMap,
    snapshots: Vec<StateSnapshot>,
}

impl Inner {
    fn credential_map(&mut self, class: CredentialClass) -> &mut HashMap<String, DeviceCredential> {
        match class {
            CredentialClass::Router => &mut self.routers,
            CredentialClass::Switch => &mut self.switches,
        }
    }

    fn interface_map(&mut self, kind: InterfaceKind) -> &mut InterfaceMap {
        match kind {
            InterfaceKind::Loopback => &mut self.loopbacks,
            InterfaceKind::Vlan => &mut self.vlans,
        }
    }
}

/// In-process [`Store`] backed by hash maps under one mutex.
///
/// Every operation takes and releases the lock synchronously, so per-key
/// upserts are atomic under concurrent writers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Backend {
            message: "store mutex poisoned".to_string(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_credential(
        &self,
        class: CredentialClass,
        cred: DeviceCredential,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock()?;
        let outcome = match inner.credential_map(class).insert(cred.ip.clone(), cred) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        };
        Ok(outcome)
    }

    async fn credentials(
        &self,
        class: CredentialClass,
    ) -> Result<Vec<DeviceCredential>, StoreError> {
        let mut inner = self.lock()?;
        let mut creds: Vec<_> = inner.credential_map(class).values().cloned().collect();
        creds.sort_by(|a, b| a.ip.cmp(&b.ip));
        Ok(creds)
    }

    async fn upsert_interface(
        &self,
        mut record: InterfaceRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock()?;
        let map = inner.interface_map(record.kind);
        let key = (record.device_ip.clone(), record.name.clone());

        let outcome = match map.get(&key) {
            Some(existing) => {
                // Set-on-insert: the original creation time survives updates.
                record.created_at = existing.created_at;
                UpsertOutcome::Updated
            }
            None => UpsertOutcome::Created,
        };
        map.insert(key, record);
        Ok(outcome)
    }

    async fn set_interface_state(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
        state: AdminState,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let map = inner.interface_map(kind);
        let map_key = (key.device_ip.clone(), key.name.clone());

        match map.get_mut(&map_key) {
            Some(record) => {
                record.admin_state = state;
                record.updated_at = at;
            }
            None => {
                // No record yet: fabricate the identifying fields so the
                // interface becomes discoverable.
                map.insert(
                    map_key,
                    InterfaceRecord {
                        device_ip: key.device_ip.clone(),
                        name: key.name.clone(),
                        kind,
                        address: String::new(),
                        netmask: String::new(),
                        description: None,
                        admin_state: state,
                        created_at: at,
                        updated_at: at,
                    },
                );
            }
        }
        Ok(())
    }

    async fn remove_interface(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner
            .interface_map(kind)
            .remove(&(key.device_ip.clone(), key.name.clone()))
            .is_some();
        Ok(removed)
    }

    async fn interface(
        &self,
        kind: InterfaceKind,
        key: &InterfaceKey,
    ) -> Result<Option<InterfaceRecord>, StoreError> {
        let mut inner = self.lock()?;
        Ok(inner
            .interface_map(kind)
            .get(&(key.device_ip.clone(), key.name.clone()))
            .cloned())
    }

    async fn append_snapshot(&self, snapshot: StateSnapshot) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.snapshots.push(snapshot);
        Ok(())
    }

    async fn snapshots(
        &self,
        device_ip: &str,
        table: SnapshotTable,
    ) -> Result<Vec<StateSnapshot>, StoreError> {
        let inner = self.lock()?;
        let mut history: Vec<_> = inner
            .snapshots
            .iter()
            .filter(|s| s.device_ip == device_ip && s.table == table)
            .cloned()
            .collect();
        history.sort_by_key(|s| s.captured_at);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotPayload;

    fn record(ip: &str, name: &str, at: DateTime<Utc>) -> InterfaceRecord {
        InterfaceRecord {
            device_ip: ip.to_string(),
            name: name.to_string(),
            kind: InterfaceKind::Loopback,
            address: "10.1.1.1".to_string(),
            netmask: "255.255.255.0".to_string(),
            description: None,
            admin_state: AdminState::Up,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn credential_upsert_distinguishes_created_and_updated() {
        let store = MemoryStore::new();
        let cred = DeviceCredential {
            ip: "10.0.0.1".to_string(),
            username: "admin".to_string(),
            password: "pw".to_string(),
            secret: None,
        };

        let first = store
            .upsert_credential(CredentialClass::Router, cred.clone())
            .await
            .unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let mut updated = cred.clone();
        updated.password = "new".to_string();
        let second = store
            .upsert_credential(CredentialClass::Router, updated.clone())
            .await
            .unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        let creds = store.credentials(CredentialClass::Router).await.unwrap();
        assert_eq!(creds, vec![updated]);
    }

    #[tokio::test]
    async fn interface_upsert_preserves_created_at() {
        let store = MemoryStore::new();
        let first_at = Utc::now();
        store
            .upsert_interface(record("10.0.0.1", "Loopback3", first_at))
            .await
            .unwrap();

        let second_at = first_at + chrono::Duration::seconds(30);
        let mut second = record("10.0.0.1", "Loopback3", second_at);
        second.address = "10.2.2.2".to_string();
        let outcome = store.upsert_interface(second).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let key = InterfaceKey::new("10.0.0.1", "Loopback3");
        let stored = store
            .interface(InterfaceKind::Loopback, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.created_at, first_at);
        assert_eq!(stored.updated_at, second_at);
        assert_eq!(stored.address, "10.2.2.2");
    }

    #[tokio::test]
    async fn set_state_fabricates_missing_record() {
        let store = MemoryStore::new();
        let key = InterfaceKey::new("10.0.0.1", "Vlan42");
        let at = Utc::now();

        store
            .set_interface_state(InterfaceKind::Vlan, &key, AdminState::Down, at)
            .await
            .unwrap();

        let stored = store
            .interface(InterfaceKind::Vlan, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.admin_state, AdminState::Down);
        assert_eq!(stored.device_ip, "10.0.0.1");
        assert_eq!(stored.name, "Vlan42");
        assert!(stored.address.is_empty());
    }

    #[tokio::test]
    async fn remove_missing_interface_is_not_an_error() {
        let store = MemoryStore::new();
        let key = InterfaceKey::new("10.0.0.1", "Loopback9");
        let removed = store
            .remove_interface(InterfaceKind::Loopback, &key)
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn snapshots_filter_by_device_and_table() {
        let store = MemoryStore::new();
        let at = Utc::now();
        for (ip, table) in [
            ("10.0.0.1", SnapshotTable::RouteTable),
            ("10.0.0.1", SnapshotTable::InterfaceStatus),
            ("10.0.0.2", SnapshotTable::RouteTable),
        ] {
            store
                .append_snapshot(StateSnapshot {
                    device_ip: ip.to_string(),
                    table,
                    captured_at: at,
                    payload: SnapshotPayload::Raw("x".to_string()),
                })
                .await
                .unwrap();
        }

        let history = store
            .snapshots("10.0.0.1", SnapshotTable::RouteTable)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }
}
