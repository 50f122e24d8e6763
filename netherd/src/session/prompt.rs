//! Prompt patterns for the modeled CLI dialect.
//!
//! The dialect has a fixed three-level ladder: user exec (`>`), privileged
//! exec (`#`), and configuration (`(config…)#`). Detection is pattern-based
//! with negative substrings to keep `#` from matching config mode.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Privilege level implied by the device prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLevel {
    /// User exec mode, `device>`.
    Exec,
    /// Privileged exec mode, `device#`.
    Privileged,
    /// Configuration mode, `device(config)#` and sub-contexts.
    Configuration,
}

impl PromptLevel {
    /// Whether configuration-changing commands are accepted at this level.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged | Self::Configuration)
    }
}

/// A compiled prompt pattern with optional negative substrings.
#[derive(Debug)]
struct CompiledPrompt {
    pattern: Regex,
    not_contains: &'static [&'static str],
}

impl CompiledPrompt {
    fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc)) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}

static CONFIGURATION: LazyLock<CompiledPrompt> = LazyLock::new(|| CompiledPrompt {
    pattern: Regex::new(r"\(config[^)]*\)#\s*$").expect("valid pattern"),
    not_contains: &[],
});

static PRIVILEGED: LazyLock<CompiledPrompt> = LazyLock::new(|| CompiledPrompt {
    pattern: Regex::new(r"#\s*$").expect("valid pattern"),
    not_contains: &["(config"],
});

static EXEC: LazyLock<CompiledPrompt> = LazyLock::new(|| CompiledPrompt {
    pattern: Regex::new(r">\s*$").expect("valid pattern"),
    not_contains: &[],
});

/// Pattern matching any prompt level, for read-until loops.
static ANY_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[>#]\s*$").expect("valid pattern"));

/// Pattern matching the password challenge during privilege escalation,
/// or any prompt (escalation without a challenge goes straight to `#`).
static PASSWORD_OR_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Pp]assword:\s*$|[>#]\s*$").expect("valid pattern"));

static PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Pp]assword:\s*$").expect("valid pattern"));

/// Pattern matching any prompt level.
pub fn any_prompt() -> &'static Regex {
    &ANY_PROMPT
}

/// Pattern matching a password challenge or any prompt.
pub fn password_or_prompt() -> &'static Regex {
    &PASSWORD_OR_PROMPT
}

/// Whether the output tail is a password challenge.
pub fn is_password_challenge(text: &str) -> bool {
    PASSWORD.is_match(text.trim_end().as_bytes())
}

/// Determine the privilege level from a prompt line.
///
/// Checked most-specific first so `device(config)#` does not register as
/// privileged exec.
pub fn detect(prompt: &str) -> Option<PromptLevel> {
    let prompt = prompt.trim_end();
    if CONFIGURATION.matches(prompt) {
        Some(PromptLevel::Configuration)
    } else if PRIVILEGED.matches(prompt) {
        Some(PromptLevel::Privileged)
    } else if EXEC.matches(prompt) {
        Some(PromptLevel::Exec)
    } else {
        None
    }
}

/// The trailing prompt line of a block of output.
pub fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim_end()
}
