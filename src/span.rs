//! Source positions used for diagnostics.

use std::fmt;

/// A single point in the source: 1-indexed line, 0-indexed column, and the
/// full text of the line it occurs on (for printing a caret under the
/// offending character).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub line_text: String,
}

impl Span {
    pub fn new(line: usize, column: usize, line_text: impl Into<String>) -> Self {
        Span {
            line,
            column,
            line_text: line_text.into(),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
