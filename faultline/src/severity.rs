//! Severity levels

use std::fmt;

use serde::Serialize;

/// How bad an error is.
///
/// Ordered from least to most severe, so `Severity::High > Severity::Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Severity {
    Info,
    Warning,
    /// Default for errors that never set a severity
    #[default]
    Error,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// The `tracing` level events for this severity are emitted at
    pub fn level(&self) -> tracing::Level {
        match self {
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error | Severity::High | Severity::Critical => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
