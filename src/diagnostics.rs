//! Position-anchored diagnostics, kept separate from the error return so
//! tools can surface all of them even for blueprints that fail validation.
use crate::positions::SourceRange;
use serde::Serialize;
use std::fmt;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("info"),
            Level::Warning => f.write_str("warning"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// A non-fatal message anchored to a source range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub range: SourceRange,
    pub context: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>, range: SourceRange) -> Diagnostic {
        Diagnostic {
            level,
            message: message.into(),
            range,
            context: None,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>, range: SourceRange) -> Diagnostic {
        Diagnostic::new(Level::Info, message, range)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, range: SourceRange) -> Diagnostic {
        Diagnostic::new(Level::Warning, message, range)
    }

    #[must_use]
    pub fn error(message: impl Into<String>, range: SourceRange) -> Diagnostic {
        Diagnostic::new(Level::Error, message, range)
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Diagnostic {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.level, self.message, self.range)
    }
}

/// Append-only buffer of diagnostics collected during a validation run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn info(&mut self, message: impl Into<String>, range: SourceRange) {
        self.push(Diagnostic::info(message, range));
    }

    pub fn warning(&mut self, message: impl Into<String>, range: SourceRange) {
        self.push(Diagnostic::warning(message, range));
    }

    pub fn error(&mut self, message: impl Into<String>, range: SourceRange) {
        self.push(Diagnostic::error(message, range));
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.records.extend(diagnostics);
    }

    /// Merge another buffer into this one, draining it.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.records.append(&mut other.records);
    }

    /// Stable sort into document order so output is deterministic regardless
    /// of the phase that produced each record.
    pub fn sort_by_position(&mut self) {
        self.records
            .sort_by_key(|diagnostic| diagnostic.range.sort_key());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_preserves_append_order_until_sorted() {
        let mut sink = Diagnostics::new();
        sink.error("second", SourceRange::new(5, 1));
        sink.warning("first", SourceRange::new(2, 3));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.iter().next().map(|d| d.message.as_str()), Some("second"));

        sink.sort_by_position();
        let messages: Vec<&str> = sink.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn sort_is_stable_for_equal_positions() {
        let mut sink = Diagnostics::new();
        sink.error("a", SourceRange::new(1, 1));
        sink.error("b", SourceRange::new(1, 1));
        sink.sort_by_position();
        let messages: Vec<&str> = sink.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn context_is_carried() {
        let diagnostic =
            Diagnostic::warning("w", SourceRange::new(1, 1)).with_context("transform");
        assert_eq!(diagnostic.context.as_deref(), Some("transform"));
    }
}
