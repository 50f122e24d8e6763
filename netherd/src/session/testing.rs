//! Scripted session and connector for engine tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{Connect, DeviceSession, Response, StructuredResponse};
use crate::error::{Error, ParseError, Result, SessionError, TransportError};
use crate::inventory::DeviceEndpoint;
use crate::parse::Record;

/// How a scripted operation should fail.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Fail {
    Timeout,
    Auth,
    Rejected,
}

impl Fail {
    fn into_error(self) -> Error {
        match self {
            Self::Timeout => TransportError::Timeout(Duration::from_secs(5)).into(),
            Self::Auth => TransportError::AuthenticationFailed {
                user: "admin".to_string(),
            }
            .into(),
            Self::Rejected => SessionError::CommandRejected {
                command: "interface".to_string(),
                message: "% Invalid input detected at '^' marker.".to_string(),
            }
            .into(),
        }
    }
}

/// Scripted reply for a structured fetch.
#[derive(Debug, Clone)]
pub(crate) enum ParsedReply {
    Records(Vec<Record>),
    Timeout,
    NoTemplate,
}

/// Behavior script shared by every session a connector mints.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    /// Fail the connect itself.
    pub connect_failure: Option<Fail>,
    /// Reject privilege escalation.
    pub deny_elevation: bool,
    /// Replies for `send_command`, matched by exact command.
    pub command_replies: Vec<(String, String)>,
    /// Replies for `send_parsed`, matched by exact command.
    pub parsed_replies: Vec<(String, ParsedReply)>,
    /// Fail `send_config`.
    pub config_failure: Option<Fail>,
}

impl Script {
    pub fn with_command(mut self, command: &str, reply: &str) -> Self {
        self.command_replies
            .push((command.to_string(), reply.to_string()));
        self
    }

    pub fn with_parsed(mut self, command: &str, reply: ParsedReply) -> Self {
        self.parsed_replies.push((command.to_string(), reply));
        self
    }
}

/// Everything the scripted sessions observed, for assertions.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    pub connects: usize,
    pub commands: Vec<String>,
    pub config_batches: Vec<Vec<String>>,
    pub elevate_secrets: Vec<String>,
    pub closed: usize,
}

/// Connector minting one scripted session per `connect` call.
#[derive(Clone)]
pub(crate) struct ScriptedConnector {
    script: Script,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, SessionLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl Connect for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, _endpoint: &DeviceEndpoint) -> Result<ScriptedSession> {
        if let Some(fail) = self.script.connect_failure {
            return Err(fail.into_error());
        }
        self.log.lock().unwrap().connects += 1;
        Ok(ScriptedSession {
            script: self.script.clone(),
            log: self.log.clone(),
        })
    }
}

pub(crate) struct ScriptedSession {
    script: Script,
    log: Arc<Mutex<SessionLog>>,
}

#[async_trait]
impl DeviceSession for ScriptedSession {
    async fn elevate(&mut self, secret: &SecretString) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .elevate_secrets
            .push(secret.expose_secret().to_owned());
        if self.script.deny_elevation {
            return Err(SessionError::PrivilegeDenied {
                prompt: "device>".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.log.lock().unwrap().commands.push(command.to_string());
        let reply = self
            .script
            .command_replies
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, r)| r.clone())
            .unwrap_or_default();
        Ok(Response::new(command, reply, "device#", Duration::ZERO))
    }

    async fn send_config(&mut self, commands: &[String]) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .config_batches
            .push(commands.to_vec());
        if let Some(fail) = self.script.config_failure {
            return Err(fail.into_error());
        }
        Ok(())
    }

    async fn send_structured(&mut self, command: &str) -> Result<StructuredResponse> {
        self.log.lock().unwrap().commands.push(command.to_string());
        let raw = self
            .script
            .command_replies
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, r)| r.clone())
            .unwrap_or_default();
        let response = Response::new(command, raw, "device#", Duration::ZERO);

        let reply = self
            .script
            .parsed_replies
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, r)| r.clone());
        let records = match reply {
            Some(ParsedReply::Records(records)) => Ok(records),
            Some(ParsedReply::Timeout) => {
                return Err(TransportError::Timeout(Duration::from_secs(5)).into());
            }
            Some(ParsedReply::NoTemplate) | None => Err(ParseError::NoTemplate {
                command: command.to_string(),
            }),
        };
        Ok(StructuredResponse { response, records })
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// One-field record helper for scripted parsed replies.
pub(crate) fn record(key: &str, value: &str) -> Record {
    let mut map = Record::new();
    map.insert(key.to_string(), value.to_string());
    map
}
