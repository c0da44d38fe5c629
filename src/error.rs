//! Parse-time and run-time error types.
//!
//! Both error kinds carry a [`Span`] locating the offending character plus a
//! categorized kind; `Display` renders a single line suitable for the CLI's
//! diagnostic output. A third, non-public signal (see `vm::Signal`) unwinds
//! one call frame on procedure exit; it is plumbed as a return value, never
//! as a Rust error, since it is not a failure.

use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Clone, Error)]
#[error("parse error at {span}: {kind}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(span: Span, kind: ParseErrorKind) -> Self {
        ParseError { span, kind }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ParseErrorKind {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(char),

    #[error("expected a name after '{op}', found '{found}'")]
    MissingNameAfter { op: char, found: char },

    #[error("expected a name after '{op}', but reached end of input")]
    MissingNameAtEof { op: char },

    #[error("expected a name before '{opener}', found '{found}'")]
    MissingNameBefore { opener: char, found: char },

    #[error("'{ch}' may only appear as a name parameter or immediately before '{{' or '['")]
    StrayNameChar { ch: char },

    #[error("unexpected '{found}': expected '{expected}' to close '{opener}'")]
    SpuriousCloser {
        found: char,
        expected: char,
        opener: char,
    },

    #[error("unexpected '{0}': no block is open")]
    UnmatchedCloser(char),

    #[error("'{opener}' was never closed")]
    UnbalancedOpener { opener: char },
}

#[derive(Debug, Clone, Error)]
#[error("runtime error at {span}: {kind}")]
pub struct RuntimeError {
    pub span: Span,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(span: Span, kind: RuntimeErrorKind) -> Self {
        RuntimeError { span, kind }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RuntimeErrorKind {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("need at least 2 cells on the stack, found {found}")]
    InsufficientStack { found: usize },

    #[error("variable '{0}' is undefined")]
    UndefinedVariable(char),

    #[error("procedure '{0}' is undefined")]
    UndefinedProcedure(char),

    #[error("a name is required here, '_' is not allowed")]
    NameRequired,

    #[error("'&' may only be used inside a procedure")]
    LocalCreateOutsideProcedure,

    #[error("reverse count {count} is out of range for a stack of size {size}")]
    ReverseOutOfRange { count: i32, size: usize },

    #[error("repeat count {0} is negative")]
    NegativeRepeatCount(i32),

    #[error("'{0}' is not a printable character (must be 32-126, or one of 3, 9, 10, 13)")]
    NonPrintableCharacter(i32),

    #[error("':' used outside of a loop")]
    ContinueOutsideLoop,

    #[error("unexpected end of input while reading a character")]
    UnexpectedEndOfInput,

    #[error("i/o error: {0}")]
    Io(String),
}
