//! Compiler diagnostics.
//!
//! Nothing in the pipeline throws: diagnostics accumulate on the transform
//! context and are returned alongside a best-effort result.

use serde::Serialize;
use stampa_carton::SourceRange;
use thiserror::Error;

/// A single diagnostic message with an optional byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct CompilerError {
    pub message: std::string::String,
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl CompilerError {
    pub fn new(message: impl Into<std::string::String>, range: Option<SourceRange>) -> Self {
        Self {
            message: message.into(),
            start: range.map(|r| r.start),
            end: range.map(|r| r.end),
        }
    }

    /// Shift the recorded range, used when leading whitespace was trimmed
    /// from the template before scanning.
    pub fn offset(mut self, by: u32) -> Self {
        self.start = self.start.map(|s| s + by);
        self.end = self.end.map(|e| e + by);
        self
    }
}

/// Diagnostic severity: hard input errors versus advisory tips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Tip,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub error: CompilerError,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(message: impl Into<std::string::String>, range: Option<SourceRange>) -> Self {
        Self {
            error: CompilerError::new(message, range),
            severity: Severity::Error,
        }
    }

    pub fn tip(message: impl Into<std::string::String>, range: Option<SourceRange>) -> Self {
        Self {
            error: CompilerError::new(message, range),
            severity: Severity::Tip,
        }
    }
}
