//! Compile error type.
//!
//! Every pass reports failure the same way: a [`CompileError`] carrying an
//! [`ErrorKind`] tag (used only to select message wording) and an optional
//! source [`Span`]. There is no recovery and no warnings — one error aborts
//! the pipeline.

use std::fmt;

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownType,
    UnknownField,
    UnknownMethod,
    UnknownClass,
    NotASubtype,
    ArityMismatch,
    InheritedFieldMissing,
    InheritedFieldNotSubtype,
    OverrideArityMismatch,
    OverrideParamNotContravariant,
    OverrideReturnNotCovariant,
    MissingReturn,
    FieldNotOnAllPaths,
    FieldUndefined,
    VarUndefined,
    AssignToCall,
    BooleanOperandRequired,
    WrongReturnType,
    /// A `write!` into the generator's output buffer failed. Distinct from
    /// every other kind above in that it can never be caused by the input
    /// program; kept separate so it is never confused with a semantic
    /// failure when matched on.
    CodeGenFormat,
}

/// The single error type produced by every pass in this crate.
///
/// `source_name` is unset by every pass (they have no notion of "which file
/// is this"); the driver attaches it with [`CompileError::with_source_name`]
/// once the error bubbles up to a point that knows the path, so the final
/// printed message matches the source-position surface described in
/// `SPEC_FULL.md` §6.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    pub source_name: Option<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            message: message.into(),
            span: None,
            source_name: None,
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        CompileError {
            kind,
            message: message.into(),
            span: Some(span),
            source_name: None,
        }
    }

    /// Attaches the path of the file being compiled, for display purposes
    /// only. Does not affect `kind`/`span`/equality checks in tests.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source_name, self.span) {
            (Some(name), Some(span)) => write!(f, "{name} ({}:{}): {}", span.line, span.col, self.message),
            (Some(name), None) => write!(f, "{name}: {}", self.message),
            (None, Some(span)) => write!(f, "({}:{}): {}", span.line, span.col, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<fmt::Error> for CompileError {
    fn from(e: fmt::Error) -> Self {
        CompileError::new(ErrorKind::CodeGenFormat, format!("code generation error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_source_name_and_span() {
        let e = CompileError::at(ErrorKind::UnknownType, "boom", Span::new(3, 7)).with_source_name("prog.qast.json");
        assert_eq!(e.to_string(), "prog.qast.json (3:7): boom");
    }

    #[test]
    fn display_with_source_name_no_span() {
        let e = CompileError::new(ErrorKind::UnknownType, "boom").with_source_name("prog.qast.json");
        assert_eq!(e.to_string(), "prog.qast.json: boom");
    }

    #[test]
    fn display_without_source_name_falls_back_to_span_only() {
        let e = CompileError::at(ErrorKind::UnknownType, "boom", Span::new(3, 7));
        assert_eq!(e.to_string(), "(3:7): boom");
    }
}
