//! Polling job distribution boundary.
//!
//! Jobs are serialized payloads on per-role queues: one enumeration pass
//! turns each stored credential into exactly one job, and workers consume
//! jobs independently. A worker failure affects only its own job; the
//! handler absorbs every error into the returned report so a poisoned
//! payload or dead device never takes the consumer down.

use log::error;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inventory::{CredentialClass, DeviceCredential, DeviceEndpoint};
use crate::poll::{self, PollReport};
use crate::session::Connect;
use crate::store::Store;

/// Queue carrying router poll jobs.
pub const ROUTER_QUEUE: &str = "router";

/// Queue carrying switch poll jobs.
pub const SWITCH_QUEUE: &str = "switch";

/// The queue a credential class is polled through.
pub fn queue_for(class: CredentialClass) -> &'static str {
    match class {
        CredentialClass::Router => ROUTER_QUEUE,
        CredentialClass::Switch => SWITCH_QUEUE,
    }
}

/// One poll work item, self-contained so a worker needs no store read
/// before connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollJob {
    /// Device management IP.
    pub ip: String,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Privileged-mode secret, if on file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl PollJob {
    /// Build a job from a stored credential.
    pub fn from_credential(cred: &DeviceCredential) -> Self {
        Self {
            ip: cred.ip.clone(),
            username: cred.username.clone(),
            password: cred.password.clone(),
            secret: cred.secret.clone(),
        }
    }

    /// The endpoint this job connects to.
    pub fn endpoint(&self) -> Result<DeviceEndpoint> {
        let cred = DeviceCredential {
            ip: self.ip.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            secret: self.secret.clone(),
        };
        DeviceEndpoint::from_credential(&cred)
    }
}

/// One job per stored credential of the class, ordered by ip.
pub async fn enumerate_jobs<S>(store: &S, class: CredentialClass) -> Result<Vec<PollJob>>
where
    S: Store + ?Sized,
{
    let creds = store.credentials(class).await?;
    Ok(creds.iter().map(PollJob::from_credential).collect())
}

/// Consume one poll job.
///
/// Never fails: a malformed payload or unreachable device becomes a report
/// with every table skipped, so the worker acknowledges the job and moves on.
pub async fn handle_poll_job<C, S>(
    connector: &C,
    store: &S,
    class: CredentialClass,
    job: &PollJob,
) -> PollReport
where
    C: Connect,
    S: Store + ?Sized,
{
    let endpoint = match job.endpoint() {
        Ok(endpoint) => endpoint,
        Err(err) => {
            error!("{}: rejecting poll job: {err}", job.ip);
            return poll::skipped_report(&job.ip, class, &err.to_string());
        }
    };

    match poll::poll_device(connector, &endpoint, store, class).await {
        Ok(report) => report,
        Err(err) => {
            error!("{}: poll failed: {err}", job.ip);
            poll::skipped_report(&job.ip, class, &err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{SHOW_IP_INTERFACE_BRIEF, SHOW_IP_ROUTE};
    use crate::session::testing::{record, Fail, ParsedReply, Script, ScriptedConnector};
    use crate::store::{MemoryStore, SnapshotTable};

    fn cred(ip: &str) -> DeviceCredential {
        DeviceCredential {
            ip: ip.to_string(),
            username: "admin".to_string(),
            password: "cisco".to_string(),
            secret: None,
        }
    }

    #[tokio::test]
    async fn one_job_per_credential() {
        let store = MemoryStore::new();
        for ip in ["10.0.0.2", "10.0.0.1"] {
            store
                .upsert_credential(CredentialClass::Router, cred(ip))
                .await
                .unwrap();
        }
        store
            .upsert_credential(CredentialClass::Switch, cred("10.0.0.9"))
            .await
            .unwrap();

        let jobs = enumerate_jobs(&store, CredentialClass::Router).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].ip, "10.0.0.1");
        assert_eq!(jobs[1].ip, "10.0.0.2");
    }

    #[test]
    fn job_payload_round_trips_and_omits_absent_secret() {
        let job = PollJob::from_credential(&cred("10.0.0.1"));
        let body = serde_json::to_string(&job).unwrap();
        assert!(!body.contains("secret"));

        let decoded: PollJob = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded, job);
        assert_eq!(decoded.endpoint().unwrap().host, "10.0.0.1");
    }

    #[tokio::test]
    async fn unreachable_device_becomes_skip_report() {
        let connector = ScriptedConnector::new(Script {
            connect_failure: Some(Fail::Timeout),
            ..Script::default()
        });
        let store = MemoryStore::new();
        let job = PollJob::from_credential(&cred("10.0.0.1"));

        let report = handle_poll_job(&connector, &store, CredentialClass::Router, &job).await;
        assert!(report.captured.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].table, SnapshotTable::InterfaceStatus);
        assert_eq!(report.skipped[1].table, SnapshotTable::RouteTable);
    }

    #[tokio::test]
    async fn malformed_payload_becomes_skip_report() {
        let connector = ScriptedConnector::new(Script::default());
        let store = MemoryStore::new();
        let job = PollJob {
            ip: String::new(),
            username: "admin".to_string(),
            password: "cisco".to_string(),
            secret: None,
        };

        let report = handle_poll_job(&connector, &store, CredentialClass::Switch, &job).await;
        assert!(report.captured.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(connector.log().connects, 0);
    }

    #[tokio::test]
    async fn healthy_job_polls_and_stores() {
        let connector = ScriptedConnector::new(
            Script::default()
                .with_parsed(
                    SHOW_IP_INTERFACE_BRIEF,
                    ParsedReply::Records(vec![record("INTERFACE", "Gi0/0")]),
                )
                .with_parsed(SHOW_IP_ROUTE, ParsedReply::Records(vec![])),
        );
        let store = MemoryStore::new();
        let job = PollJob::from_credential(&cred("10.0.0.1"));

        let report = handle_poll_job(&connector, &store, CredentialClass::Router, &job).await;
        assert!(report.is_complete());
        assert_eq!(
            store
                .snapshots("10.0.0.1", SnapshotTable::InterfaceStatus)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
