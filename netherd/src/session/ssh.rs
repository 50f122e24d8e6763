//! Real device session over SSH.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::prompt::{self, PromptLevel};
use super::response::Response;
use super::{Connect, DeviceSession, StructuredResponse};
use crate::error::{Result, SessionError};
use crate::inventory::DeviceEndpoint;
use crate::parse::TemplateSet;
use crate::transport::{SshConfig, SshTransport, Wire};

/// Output markers the device emits when it rejects a command.
const REJECTION_MARKERS: &[&str] = &[
    "% Invalid input",
    "% Incomplete command",
    "% Access denied",
    "% Error",
];

/// How many password challenges the device issues before giving up on an
/// `enable` attempt and returning to a prompt.
const MAX_ENABLE_CHALLENGES: usize = 3;

/// Factory for [`SshSession`]s.
#[derive(Debug, Clone)]
pub struct SshConnector {
    templates: Arc<TemplateSet>,
    terminal_width: u32,
    terminal_height: u32,
}

impl SshConnector {
    /// Create a connector with the built-in template set.
    pub fn new() -> Self {
        Self {
            templates: Arc::new(TemplateSet::builtin()),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Use a custom template set for structured parsing.
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Arc::new(templates);
        self
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connect for SshConnector {
    type Session = SshSession;

    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<SshSession> {
        let config = SshConfig {
            host: endpoint.host.clone(),
            port: endpoint.port,
            username: endpoint.username.clone(),
            password: crate::inventory::clone_secret(&endpoint.password),
            timeout: endpoint.timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
        };

        let transport = SshTransport::connect(config).await?;
        let mut session = SshSession {
            transport,
            templates: self.templates.clone(),
            current: None,
        };

        // Sync with the initial prompt and note the starting privilege level.
        let banner = session.transport.read_until(prompt::any_prompt()).await?;
        let text = String::from_utf8_lossy(&banner);
        session.current = prompt::detect(prompt::last_line(&text));
        debug!(
            "session to {} opened at level {:?}",
            session.transport.host(),
            session.current
        );

        // Disable paging so multi-screen output arrives in one read.
        session.send_command("terminal length 0").await?;

        Ok(session)
    }
}

/// One authenticated interactive session over SSH.
pub struct SshSession<T = SshTransport> {
    transport: T,
    templates: Arc<TemplateSet>,
    current: Option<PromptLevel>,
}

impl<T: Wire> SshSession<T> {
    /// The current privilege level, as last inferred from the prompt.
    pub fn current_level(&self) -> Option<PromptLevel> {
        self.current
    }

    /// Send a command and fail if the device rejects it.
    async fn exec_checked(&mut self, command: &str) -> Result<Response> {
        let response = self.send_command(command).await?;
        if let Some(message) = detect_rejection(&response.result) {
            return Err(SessionError::CommandRejected {
                command: command.to_string(),
                message,
            }
            .into());
        }
        Ok(response)
    }

    /// Step out of a failed `enable` dialogue.
    ///
    /// Answers the remaining password challenges with blank lines until the
    /// device gives up and returns to a prompt, so the caller inherits a
    /// session that can still run exec-level commands. Returns the prompt
    /// line the device settled on.
    async fn abandon_enable_dialogue(&mut self) -> Result<String> {
        for _ in 0..MAX_ENABLE_CHALLENGES {
            self.transport.send_line("").await?;
            let data = self.transport.read_until(prompt::password_or_prompt()).await?;
            let text = String::from_utf8_lossy(&data);
            let tail = prompt::last_line(&text).to_string();
            if !prompt::is_password_challenge(&tail) {
                if let Some(level) = prompt::detect(&tail) {
                    self.current = Some(level);
                }
                return Ok(tail);
            }
        }
        Err(SessionError::PrivilegeDenied {
            prompt: "Password:".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl<T: Wire> DeviceSession for SshSession<T> {
    async fn elevate(&mut self, secret: &SecretString) -> Result<()> {
        if self.current.map(PromptLevel::is_privileged).unwrap_or(false) {
            return Ok(());
        }

        self.transport.send_line("enable").await?;
        let data = self.transport.read_until(prompt::password_or_prompt()).await?;
        let text = String::from_utf8_lossy(&data).to_string();
        let mut tail = prompt::last_line(&text).to_string();

        if prompt::is_password_challenge(&tail) {
            self.transport.send_line(secret.expose_secret()).await?;
            let data = self.transport.read_until(prompt::password_or_prompt()).await?;
            let text = String::from_utf8_lossy(&data).to_string();
            tail = prompt::last_line(&text).to_string();

            // A repeated challenge means the secret was rejected. The device
            // is still mid-dialogue at this point, so resynchronize to a
            // prompt before surfacing the denial; otherwise the caller's next
            // command would be consumed as another password attempt.
            if prompt::is_password_challenge(&tail) {
                let settled = self.abandon_enable_dialogue().await?;
                return Err(SessionError::PrivilegeDenied { prompt: settled }.into());
            }
        }

        match prompt::detect(&tail) {
            Some(level) if level.is_privileged() => {
                self.current = Some(level);
                Ok(())
            }
            _ => Err(SessionError::PrivilegeDenied { prompt: tail }.into()),
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();

        self.transport.send_line(command).await?;
        let data = self.transport.read_until(prompt::any_prompt()).await?;
        let raw = String::from_utf8_lossy(&data).to_string();

        let prompt_line = prompt::last_line(&raw).to_string();
        if let Some(level) = prompt::detect(&prompt_line) {
            self.current = Some(level);
        }

        let result = normalize_output(&raw, command);
        Ok(Response::new(command, result, prompt_line, start.elapsed()))
    }

    async fn send_config(&mut self, commands: &[String]) -> Result<()> {
        self.exec_checked("configure terminal").await?;

        for command in commands {
            if let Err(err) = self.exec_checked(command).await {
                // Leave configuration mode before surfacing the failure so
                // the session is reusable by the caller's cleanup path.
                let _ = self.send_command("end").await;
                return Err(err);
            }
        }

        self.send_command("end").await?;
        Ok(())
    }

    async fn send_structured(&mut self, command: &str) -> Result<StructuredResponse> {
        let response = self.send_command(command).await?;
        let records = self.templates.parse(command, &response.result);
        Ok(StructuredResponse { response, records })
    }

    async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}

/// Strip the command echo and the trailing prompt from raw output.
fn normalize_output(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    while let Some(last) = lines.last() {
        if last.trim().is_empty() {
            lines.pop();
        } else {
            break;
        }
    }

    if let Some(last) = lines.last() {
        if prompt::detect(last).is_some() {
            lines.pop();
        }
    }

    if let Some(first) = lines.first() {
        if first.contains(command.trim()) {
            lines.remove(0);
        }
    }

    lines.join("\n").trim_matches('\n').to_string()
}

/// The rejection line, if the device refused the command.
fn detect_rejection(result: &str) -> Option<String> {
    result
        .lines()
        .find(|line| REJECTION_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| line.trim().to_string())
}
