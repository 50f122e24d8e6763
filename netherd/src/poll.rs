//! Periodic device state collection.
//!
//! One poll opens one session, captures each of the role's state tables,
//! and appends a snapshot per table to the store. Tables are independent:
//! a table that cannot be captured is skipped with a reason while the
//! remaining tables still land. Only the connect itself is fatal to a poll.

use chrono::Utc;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::inventory::{CredentialClass, DeviceEndpoint, SecretSource};
use crate::parse::{SHOW_INTERFACES_STATUS, SHOW_IP_INTERFACE_BRIEF, SHOW_IP_ROUTE};
use crate::session::{Connect, DeviceSession};
use crate::store::{SnapshotPayload, SnapshotTable, StateSnapshot, Store};

/// What one poll captured and what it had to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// The polled device.
    pub device_ip: String,

    /// Tables captured and stored, in capture order.
    pub captured: Vec<SnapshotTable>,

    /// Tables that could not be captured, with the reason.
    pub skipped: Vec<SkippedTable>,
}

/// One table a poll could not capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    pub table: SnapshotTable,
    pub reason: String,
}

impl PollReport {
    fn new(device_ip: &str) -> Self {
        Self {
            device_ip: device_ip.to_string(),
            captured: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Whether every table of the poll was captured.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// (table, command, degrade-to-raw-on-template-miss) per role.
const ROUTER_TABLES: &[(SnapshotTable, &str, bool)] = &[
    (SnapshotTable::InterfaceStatus, SHOW_IP_INTERFACE_BRIEF, false),
    (SnapshotTable::RouteTable, SHOW_IP_ROUTE, false),
];

// Port status output varies across platforms, so a template miss degrades
// to a raw-text snapshot instead of skipping the table.
const SWITCH_TABLES: &[(SnapshotTable, &str, bool)] =
    &[(SnapshotTable::PortStatus, SHOW_INTERFACES_STATUS, true)];

fn tables_for(class: CredentialClass) -> &'static [(SnapshotTable, &'static str, bool)] {
    match class {
        CredentialClass::Router => ROUTER_TABLES,
        CredentialClass::Switch => SWITCH_TABLES,
    }
}

/// Poll a router: interface summary and route table.
pub async fn poll_router<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
) -> Result<PollReport>
where
    C: Connect,
    S: Store + ?Sized,
{
    poll(connector, endpoint, store, ROUTER_TABLES).await
}

/// Poll a switch: port status.
pub async fn poll_switch<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
) -> Result<PollReport>
where
    C: Connect,
    S: Store + ?Sized,
{
    poll(connector, endpoint, store, SWITCH_TABLES).await
}

/// Poll a device according to its credential class.
pub async fn poll_device<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
    class: CredentialClass,
) -> Result<PollReport>
where
    C: Connect,
    S: Store + ?Sized,
{
    poll(connector, endpoint, store, tables_for(class)).await
}

/// A report marking every table of the role as skipped for one reason.
pub(crate) fn skipped_report(device_ip: &str, class: CredentialClass, reason: &str) -> PollReport {
    let mut report = PollReport::new(device_ip);
    for &(table, _, _) in tables_for(class) {
        report.skipped.push(SkippedTable {
            table,
            reason: reason.to_string(),
        });
    }
    report
}

async fn poll<C, S>(
    connector: &C,
    endpoint: &DeviceEndpoint,
    store: &S,
    tables: &[(SnapshotTable, &str, bool)],
) -> Result<PollReport>
where
    C: Connect,
    S: Store + ?Sized,
{
    let mut session = connector.connect(endpoint).await?;

    // Elevation is best effort here: the show commands usually work from
    // user exec, just with less detail on some platforms.
    let (secret, source) = endpoint.resolve_enable_secret(None);
    if source == SecretSource::PasswordFallback {
        debug!("{}: no enable secret on file for poll", endpoint.host);
    }
    if let Err(err) = session.elevate(secret).await {
        warn!("{}: polling without privileged mode: {err}", endpoint.host);
    }

    let mut report = PollReport::new(&endpoint.host);
    for &(table, command, raw_fallback) in tables {
        capture(&mut session, store, &mut report, table, command, raw_fallback).await;
    }

    let _ = session.close().await;
    Ok(report)
}

/// Capture one table into the store, recording a skip on failure.
async fn capture<S, St>(
    session: &mut S,
    store: &St,
    report: &mut PollReport,
    table: SnapshotTable,
    command: &str,
    raw_fallback: bool,
) where
    S: DeviceSession,
    St: Store + ?Sized,
{
    let payload = match session.send_structured(command).await {
        Ok(structured) => match structured.records {
            // Parsed rows may come up empty on output the template does not
            // recognize; for fallback tables that counts as structured
            // unavailable, not as an empty table.
            Ok(records)
                if raw_fallback
                    && records.is_empty()
                    && !structured.response.result.trim().is_empty() =>
            {
                debug!(
                    "{}: no rows matched for `{command}`, storing raw",
                    report.device_ip
                );
                Ok(SnapshotPayload::Raw(structured.response.result))
            }
            Ok(records) => Ok(SnapshotPayload::Parsed(records)),
            Err(err) if raw_fallback => {
                debug!(
                    "{}: no structured form for `{command}`, storing raw ({err})",
                    report.device_ip
                );
                Ok(SnapshotPayload::Raw(structured.response.result))
            }
            Err(err) => Err(Error::Parse(err)),
        },
        Err(err) => Err(err),
    };

    match payload {
        Ok(payload) => {
            let snapshot = StateSnapshot {
                device_ip: report.device_ip.clone(),
                table,
                captured_at: Utc::now(),
                payload,
            };
            match store.append_snapshot(snapshot).await {
                Ok(()) => report.captured.push(table),
                Err(err) => {
                    warn!("{}: storing {table:?} failed: {err}", report.device_ip);
                    report.skipped.push(SkippedTable {
                        table,
                        reason: format!("storing snapshot failed: {err}"),
                    });
                }
            }
        }
        Err(err) => {
            warn!("{}: `{command}` skipped: {err}", report.device_ip);
            report.skipped.push(SkippedTable {
                table,
                reason: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{record, ParsedReply, Script, ScriptedConnector};
    use crate::store::MemoryStore;
    use secrecy::SecretString;

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint::new("10.0.15.133", "admin", SecretString::from("cisco".to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn full_router_poll_stores_both_tables() {
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(
                    SHOW_IP_INTERFACE_BRIEF,
                    ParsedReply::Records(vec![record("INTERFACE", "Loopback3")]),
                )
                .with_parsed(
                    SHOW_IP_ROUTE,
                    ParsedReply::Records(vec![record("NETWORK", "10.0.15.0")]),
                ),
        );
        let store = MemoryStore::new();

        let report = poll_router(&connector, &endpoint(), &store).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(
            report.captured,
            vec![SnapshotTable::InterfaceStatus, SnapshotTable::RouteTable]
        );

        let routes = store
            .snapshots("10.0.15.133", SnapshotTable::RouteTable)
            .await
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert!(matches!(routes[0].payload, SnapshotPayload::Parsed(_)));
        assert_eq!(connector.log().closed, 1);
    }

    #[tokio::test]
    async fn failed_table_is_skipped_not_fatal() {
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(
                    SHOW_IP_INTERFACE_BRIEF,
                    ParsedReply::Records(vec![record("INTERFACE", "Loopback3")]),
                )
                .with_parsed(SHOW_IP_ROUTE, ParsedReply::Timeout),
        );
        let store = MemoryStore::new();

        let report = poll_router(&connector, &endpoint(), &store).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.captured, vec![SnapshotTable::InterfaceStatus]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].table, SnapshotTable::RouteTable);

        assert!(store
            .snapshots("10.0.15.133", SnapshotTable::RouteTable)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .snapshots("10.0.15.133", SnapshotTable::InterfaceStatus)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn switch_poll_falls_back_to_raw_text() {
        let port_text = "Gi0/1     uplink             connected    1          a-full  a-100";
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(SHOW_INTERFACES_STATUS, ParsedReply::NoTemplate)
                .with_command(SHOW_INTERFACES_STATUS, port_text),
        );
        let store = MemoryStore::new();

        let report = poll_switch(&connector, &endpoint(), &store).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.captured, vec![SnapshotTable::PortStatus]);

        let snapshots = store
            .snapshots("10.0.15.133", SnapshotTable::PortStatus)
            .await
            .unwrap();
        assert_eq!(
            snapshots[0].payload,
            SnapshotPayload::Raw(port_text.to_string())
        );

        // The raw text is reused from the structured attempt; the command
        // only went to the device once.
        assert_eq!(
            connector.log().commands,
            vec![SHOW_INTERFACES_STATUS.to_string()]
        );
    }

    #[tokio::test]
    async fn unmatched_port_output_stores_raw() {
        let port_text = "Port status output in a shape the template does not know";
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(SHOW_INTERFACES_STATUS, ParsedReply::Records(vec![]))
                .with_command(SHOW_INTERFACES_STATUS, port_text),
        );
        let store = MemoryStore::new();

        let report = poll_switch(&connector, &endpoint(), &store).await.unwrap();
        assert!(report.is_complete());

        let snapshots = store
            .snapshots("10.0.15.133", SnapshotTable::PortStatus)
            .await
            .unwrap();
        assert_eq!(
            snapshots[0].payload,
            SnapshotPayload::Raw(port_text.to_string())
        );
    }

    #[tokio::test]
    async fn empty_router_table_stays_structured() {
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(
                    SHOW_IP_INTERFACE_BRIEF,
                    ParsedReply::Records(vec![record("INTERFACE", "Gi0/0")]),
                )
                .with_parsed(SHOW_IP_ROUTE, ParsedReply::Records(vec![]))
                .with_command(SHOW_IP_ROUTE, "Gateway of last resort is not set"),
        );
        let store = MemoryStore::new();

        let report = poll_router(&connector, &endpoint(), &store).await.unwrap();
        assert!(report.is_complete());

        let routes = store
            .snapshots("10.0.15.133", SnapshotTable::RouteTable)
            .await
            .unwrap();
        assert_eq!(routes[0].payload, SnapshotPayload::Parsed(vec![]));
    }

    #[tokio::test]
    async fn denied_elevation_does_not_abort_poll() {
        let connector = ScriptedConnector::new(
            Script {
                deny_elevation: true,
                ..Script::default()
            }
            .with_parsed(
                SHOW_IP_INTERFACE_BRIEF,
                ParsedReply::Records(vec![record("INTERFACE", "Gi0/0")]),
            )
            .with_parsed(SHOW_IP_ROUTE, ParsedReply::Records(vec![])),
        );
        let store = MemoryStore::new();

        let report = poll_router(&connector, &endpoint(), &store).await.unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        use crate::session::testing::Fail;
        let connector = ScriptedConnector::new(Script {
            connect_failure: Some(Fail::Timeout),
            ..Script::default()
        });
        let store = MemoryStore::new();

        let err = poll_router(&connector, &endpoint(), &store).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
