//! Structured CLI output parsing.
//!
//! Free-text command output is converted into typed key-value records via
//! command-specific TextFSM templates. A command with no registered
//! template is a [`ParseError::NoTemplate`] — never a silent raw-text
//! fallback; callers that want raw text ask for it explicitly.

use std::collections::HashMap;

use indexmap::IndexMap;
use textfsm_rust::Template;

use crate::error::ParseError;

/// One parsed output row: template value name to captured text.
pub type Record = HashMap<String, String>;

/// Interface summary command for routers.
pub const SHOW_IP_INTERFACE_BRIEF: &str = "show ip interface brief";

/// Routing table command.
pub const SHOW_IP_ROUTE: &str = "show ip route";

/// Port status command for switches.
pub const SHOW_INTERFACES_STATUS: &str = "show interfaces status";

/// Registry mapping command strings to TextFSM template sources.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: IndexMap<String, String>,
}

impl TemplateSet {
    /// An empty template set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in templates for the modeled CLI dialect.
    pub fn builtin() -> Self {
        Self::new()
            .with_template(
                SHOW_IP_INTERFACE_BRIEF,
                include_str!("templates/cisco_ios_show_ip_interface_brief.textfsm"),
            )
            .with_template(
                SHOW_IP_ROUTE,
                include_str!("templates/cisco_ios_show_ip_route.textfsm"),
            )
            .with_template(
                SHOW_INTERFACES_STATUS,
                include_str!("templates/cisco_ios_show_interfaces_status.textfsm"),
            )
    }

    /// Register a template for a command.
    pub fn with_template(mut self, command: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(command.into(), source.into());
        self
    }

    /// Whether a template is registered for the command.
    pub fn has_template(&self, command: &str) -> bool {
        self.templates.contains_key(command)
    }

    /// Parse command output into structured records.
    pub fn parse(&self, command: &str, output: &str) -> Result<Vec<Record>, ParseError> {
        let source = self
            .templates
            .get(command)
            .ok_or_else(|| ParseError::NoTemplate {
                command: command.to_string(),
            })?;

        let template = Template::parse_str(source).map_err(|e| ParseError::Template {
            command: command.to_string(),
            message: e.to_string(),
        })?;

        let mut parser = template.parser();
        parser
            .parse_text_to_dicts(output)
            .map_err(|e| ParseError::Template {
                command: command.to_string(),
                message: e.to_string(),
            })
    }
}
