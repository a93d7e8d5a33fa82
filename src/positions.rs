//! Source positions for nodes and diagnostics.
use serde::Serialize;
use std::fmt;

/// How precisely a range points at the construct it describes.
///
/// Positions produced by a parser are `Exact`; positions inherited from a
/// parent node (or synthesized for programmatically built trees) are
/// `Approximate` so tooling can decide how aggressively to highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionAccuracy {
    Exact,
    Approximate,
}

/// A line/column range in the source document.
///
/// `line`/`column` are 1-based and always present; the end of the range is
/// optional because single-token constructs often only know where they start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRange {
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub accuracy: PositionAccuracy,
}

impl SourceRange {
    /// An exact range starting at `line`:`column`.
    #[must_use]
    pub const fn new(line: usize, column: usize) -> SourceRange {
        SourceRange {
            line,
            column,
            end_line: None,
            end_column: None,
            accuracy: PositionAccuracy::Exact,
        }
    }

    /// An approximate range, used when the position was inherited from an
    /// enclosing construct rather than recorded by the parser.
    #[must_use]
    pub const fn approximate(line: usize, column: usize) -> SourceRange {
        SourceRange {
            line,
            column,
            end_line: None,
            end_column: None,
            accuracy: PositionAccuracy::Approximate,
        }
    }

    /// An exact range with a known end point.
    #[must_use]
    pub const fn span(
        line: usize,
        column: usize,
        end_line: usize,
        end_column: usize,
    ) -> SourceRange {
        SourceRange {
            line,
            column,
            end_line: Some(end_line),
            end_column: Some(end_column),
            accuracy: PositionAccuracy::Exact,
        }
    }

    /// The same range downgraded to `Approximate` accuracy.
    #[must_use]
    pub const fn as_approximate(mut self) -> SourceRange {
        self.accuracy = PositionAccuracy::Approximate;
        self
    }

    /// Ordering key used to sort diagnostics into document order.
    #[must_use]
    pub const fn sort_key(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}

impl Default for SourceRange {
    fn default() -> SourceRange {
        SourceRange::approximate(1, 1)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
