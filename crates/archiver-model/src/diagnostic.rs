//! Load diagnostics attached to resources.

use std::fmt;

/// A structural problem found while loading a resource.
///
/// Line and column are 1-based; both are 0 when the problem has no
/// position (for example a failed fetch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human readable description.
    pub message: String,
    /// Line of the problem.
    pub line: usize,
    /// Column of the problem.
    pub column: usize,
}

impl Diagnostic {
    /// A diagnostic without position.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: 0,
            column: 0,
        }
    }

    /// A diagnostic at the given byte offset of `source`.
    pub fn at_offset(message: impl Into<String>, source: &[u8], offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |index| index + 1);
        Self {
            message: message.into(),
            line,
            column: offset - line_start + 1,
        }
    }

    /// Returns true if the diagnostic carries a position.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_position() {
            write!(f, "{} {} {}", self.message, self.line, self.column)
        } else {
            f.write_str(&self.message)
        }
    }
}
