//! User-facing diagnostics.
//!
//! Diagnostics are plain values collected in order. Producing one never
//! aborts a pass; see [`crate::error::CoreError`] for faults that do.

use core::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn value_must_be_constant(span: Span) -> Self {
        Diagnostic::error("Value must be constant", span)
    }

    pub fn value_out_of_range(value: f32, min: u8, max: u8, span: Span) -> Self {
        Diagnostic::error(
            format!("Value {value} is out of range; expected a whole number from {min} to {max}"),
            span,
        )
    }

    pub fn empty_loop(label: &str, span: Span) -> Self {
        Diagnostic::warning(
            format!("Loop at '{label}' does nothing and cannot be built; it is left out"),
            span,
        )
    }

    pub fn already_declared(name: &str, span: Span) -> Self {
        Diagnostic::error(format!("'{name}' is already declared"), span)
    }

    pub fn wrong_argument_count(name: &str, expected: usize, given: usize, span: Span) -> Self {
        Diagnostic::error(
            format!("'{name}' requires {expected} arguments but was given {given}"),
            span,
        )
    }

    pub fn unsupported_capability(what: &str, span: Span) -> Self {
        Diagnostic::error(format!("The target builder does not support {what}"), span)
    }

    pub fn too_many_reuses(name: &str, limit: u32, span: Span) -> Self {
        Diagnostic::error(
            format!("Inline variable '{name}' is read more than {limit} times; declare it as a regular variable"),
            span,
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{kind} at {}: {}", self.span, self.message)
    }
}

/// Ordered diagnostic collection shared by every stage of one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning("unused", Span::new(0, 1)));
        assert!(!diagnostics.has_errors());
        diagnostics.push(Diagnostic::value_must_be_constant(Span::new(2, 3)));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn renders_argument_count_message() {
        let d = Diagnostic::wrong_argument_count("abs", 1, 3, Span::new(4, 12));
        assert_eq!(d.message, "'abs' requires 1 arguments but was given 3");
        assert_eq!(d.to_string(), "error at 4..12: 'abs' requires 1 arguments but was given 3");
    }
}
