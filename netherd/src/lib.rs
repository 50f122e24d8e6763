//! # Netherd
//!
//! Async fleet manager for network devices driven over interactive SSH CLI.
//!
//! Netherd classifies devices by probing their command surface, pushes
//! idempotent interface configuration, reconciles applied changes into an
//! inventory store, and periodically polls structured state snapshots.
//!
//! ## Features
//!
//! - Async SSH sessions via russh with prompt-driven pattern matching
//! - Capability-probe device classification (router / L2 switch / L3 switch)
//! - Loopback and VLAN actions with non-throwing failure reporting
//! - Idempotent store reconciliation keyed by (device, interface)
//! - TextFSM-based structured polling with per-table partial success
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netherd::{classify, DeviceEndpoint, MemoryStore, SshConnector};
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netherd::Error> {
//!     let connector = SshConnector::new();
//!     let store = MemoryStore::new();
//!     let endpoint = DeviceEndpoint::new(
//!         "192.168.1.1",
//!         "admin",
//!         SecretString::from("secret".to_string()),
//!     )?;
//!
//!     let result = classify(&connector, &endpoint, &store).await?;
//!     println!("{} is a {}", endpoint.host, result.role);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod classify;
pub mod configure;
pub mod error;
pub mod inventory;
pub mod job;
pub mod parse;
pub mod poll;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use classify::{classify, Capability, Classification};
pub use configure::{
    create_interface, delete_interface, set_interface_state, ActionFailure, ActionOutcome,
    ChangeOp, CreateRequest, FailureKind, InterfaceChange, InterfaceId,
};
pub use error::Error;
pub use inventory::{
    AdminState, CredentialClass, DeviceCredential, DeviceEndpoint, InterfaceKind, Role,
};
pub use job::{enumerate_jobs, handle_poll_job, PollJob};
pub use parse::{Record, TemplateSet};
pub use poll::{poll_device, poll_router, poll_switch, PollReport};
pub use reconcile::{
    apply_create, apply_delete, apply_set_state, reconcile, reconcile_outcome, ReconcileOutcome,
};
pub use session::{Connect, DeviceSession, Response, SshConnector, StructuredResponse};
pub use store::{
    InterfaceKey, InterfaceRecord, MemoryStore, SnapshotPayload, SnapshotTable, StateSnapshot,
    Store, UpsertOutcome,
};
pub use transport::SshConfig;
