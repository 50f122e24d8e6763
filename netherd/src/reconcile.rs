//! Store-side reconciliation of applied interface changes.
//!
//! After a configuration action succeeds on the device, its
//! [`InterfaceChange`] is folded into the store so the inventory tracks
//! intended state. Every mutation is an idempotent per-key upsert: replays
//! of the same change converge on the same record instead of duplicating.

use log::debug;
use secrecy::SecretString;

use crate::configure::{
    self, ActionOutcome, ChangeOp, CreateRequest, InterfaceChange,
};
use crate::error::Result;
use crate::inventory::{AdminState, DeviceEndpoint, InterfaceKind};
use crate::session::Connect;
use crate::store::{InterfaceKey, InterfaceRecord, Store, UpsertOutcome};

/// What the reconciler did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The full record was inserted or overwritten.
    Upserted(UpsertOutcome),
    /// Only the admin state and timestamp were patched.
    StatePatched,
    /// The record was removed. `false` means nothing was on file, which is
    /// still success: the goal state "absent" already held.
    Removed(bool),
}

/// Fold one applied change into the store.
pub async fn reconcile<S>(store: &S, change: &InterfaceChange) -> Result<ReconcileOutcome>
where
    S: Store + ?Sized,
{
    let key = InterfaceKey::new(change.device_ip.clone(), change.interface.canonical());

    let outcome = match &change.op {
        ChangeOp::Created {
            address,
            netmask,
            description,
        } => {
            let record = InterfaceRecord {
                device_ip: change.device_ip.clone(),
                name: change.interface.canonical(),
                kind: change.interface.kind,
                address: address.clone(),
                netmask: netmask.clone(),
                description: description.clone(),
                admin_state: AdminState::Up,
                created_at: change.updated_at,
                updated_at: change.updated_at,
            };
            ReconcileOutcome::Upserted(store.upsert_interface(record).await?)
        }
        ChangeOp::StateSet { admin_state } => {
            store
                .set_interface_state(change.interface.kind, &key, *admin_state, change.updated_at)
                .await?;
            ReconcileOutcome::StatePatched
        }
        ChangeOp::Deleted => {
            let removed = store.remove_interface(change.interface.kind, &key).await?;
            ReconcileOutcome::Removed(removed)
        }
    };

    debug!("{} {}: reconciled {:?}", change.device_ip, key.name, outcome);
    Ok(outcome)
}

/// Reconcile an action outcome: applied changes are folded into the store,
/// failed actions leave it untouched.
pub async fn reconcile_outcome<S>(
    store: &S,
    outcome: &ActionOutcome,
) -> Result<Option<ReconcileOutcome>>
where
    S: Store + ?Sized,
{
    match outcome {
        ActionOutcome::Applied(change) => Ok(Some(reconcile(store, change).await?)),
        ActionOutcome::Failed(_) => Ok(None),
    }
}

/// Create an interface on the device, then fold the result into the store.
///
/// The returned outcome still carries the failure message when the device
/// rejected the action; only identifier and store errors propagate.
pub async fn apply_create<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
    kind: InterfaceKind,
    identifier: &str,
    request: CreateRequest,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome>
where
    C: Connect,
    S: Store + ?Sized,
{
    let outcome = configure::create_interface(
        connector,
        endpoint,
        kind,
        identifier,
        request,
        enable_override,
    )
    .await?;
    reconcile_outcome(store, &outcome).await?;
    Ok(outcome)
}

/// Set an interface's admin state on the device, then update the store.
pub async fn apply_set_state<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
    kind: InterfaceKind,
    identifier: &str,
    enabled: bool,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome>
where
    C: Connect,
    S: Store + ?Sized,
{
    let outcome = configure::set_interface_state(
        connector,
        endpoint,
        kind,
        identifier,
        enabled,
        enable_override,
    )
    .await?;
    reconcile_outcome(store, &outcome).await?;
    Ok(outcome)
}

/// Delete an interface on the device, then remove it from the store.
pub async fn apply_delete<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
    kind: InterfaceKind,
    identifier: &str,
    enable_override: Option<&SecretString>,
) -> Result<ActionOutcome>
where
    C: Connect,
    S: Store + ?Sized,
{
    let outcome =
        configure::delete_interface(connector, endpoint, kind, identifier, enable_override)
            .await?;
    reconcile_outcome(store, &outcome).await?;
    Ok(outcome)
}
