//! Non-fatal findings collected during loading and translation.
//!
//! Resolvers record what they skipped or rewrote here instead of logging
//! directly. The caller decides how to present them; [`Diagnostics::emit`]
//! forwards everything to `tracing`.

use serde::Serialize;
use std::fmt;

/// How serious a finding is. None of these abort a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// What the finding is about: a service, secret, file path, ...
    pub scope: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.scope, self.message)
    }
}

/// Ordered collection of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, scope: impl Into<String>, message: impl Into<String>) {
        self.items.push(Diagnostic {
            severity,
            scope: scope.into(),
            message: message.into(),
        });
    }

    pub fn warn(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, scope, message);
    }

    pub fn error(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, scope, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of findings at or above `severity`.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity >= severity).count()
    }

    /// True if any finding's message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.items.iter().any(|d| d.message.contains(needle))
    }

    /// Forward every finding to `tracing` at the matching level.
    pub fn emit(&self) {
        for d in &self.items {
            match d.severity {
                Severity::Warning => tracing::warn!(scope = %d.scope, "{}", d.message),
                Severity::Error => tracing::error!(scope = %d.scope, "{}", d.message),
            }
        }
    }
}
