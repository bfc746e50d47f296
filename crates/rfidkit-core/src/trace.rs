//! Per-operation diagnostic trace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, append-only diagnostic lines collected during one bank operation.
///
/// A trace is returned to the caller next to the operation result,
/// whatever the outcome. It is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationTrace {
    lines: Vec<String>,
}

impl OperationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl fmt::Display for OperationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Render a password for logs: one `*` per character.
///
/// # Examples
///
/// ```
/// use rfidkit_core::mask_password;
///
/// assert_eq!(mask_password("00000000"), "********");
/// assert_eq!(mask_password(""), "");
/// ```
pub fn mask_password(password: &str) -> String {
    "*".repeat(password.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_preserves_order() {
        let mut trace = OperationTrace::new();
        assert!(trace.is_empty());

        trace.push("first");
        trace.push(String::from("second"));

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.lines(), ["first", "second"]);
        assert!(trace.contains("sec"));
        assert_eq!(trace.to_string(), "first\nsecond\n");
    }

    #[test]
    fn test_trace_serializes_as_list() {
        let mut trace = OperationTrace::new();
        trace.push("only");
        assert_eq!(serde_json::to_string(&trace).unwrap(), "[\"only\"]");
    }
}
