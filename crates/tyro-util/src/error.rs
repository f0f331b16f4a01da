//! The four error kinds shared by every pipeline stage.
//!
//! Each stage in the toolchain (lexer, parser, semantic checker, virtual
//! machine) fails with its own error type rather than a shared "compiler
//! error" enum. This keeps a stage's `Result<T, E>` from leaking concerns
//! that belong to a later stage, and lets the driver prefix each message
//! with the right label (`Lexer Error:`, `Parser Error:`, `Static Error:`,
//! `VM Error:`) without matching on a discriminant.

use crate::span::Span;
use thiserror::Error;

/// Failure raised while scanning source text into tokens.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} at line {}, column {}", span.line, span.column)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

impl LexerError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Failure raised while building an AST from a token stream.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} found '{found}' at line {}, column {}", span.line, span.column)]
pub struct ParserError {
    pub message: String,
    pub found: String,
    pub span: Span,
}

impl ParserError {
    pub fn new(message: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            found: found.into(),
            span,
        }
    }
}

/// Failure raised while statically checking a parsed program.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StaticError {
    #[error("{message} at line {}, column {}", span.line, span.column)]
    At { message: String, span: Span },
    #[error("{0}")]
    Plain(String),
}

impl StaticError {
    pub fn at(message: impl Into<String>, span: Span) -> Self {
        StaticError::At {
            message: message.into(),
            span,
        }
    }

    pub fn plain(message: impl Into<String>) -> Self {
        StaticError::Plain(message.into())
    }
}

/// Failure raised by the bytecode interpreter at run time.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct VMError(pub String);

impl VMError {
    pub fn new(message: impl Into<String>) -> Self {
        VMError(message.into())
    }
}

pub type LexerResult<T> = std::result::Result<T, LexerError>;
pub type ParserResult<T> = std::result::Result<T, ParserError>;
pub type StaticResult<T> = std::result::Result<T, StaticError>;
pub type VMResult<T> = std::result::Result<T, VMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer_error_formats_with_position() {
        let e = LexerError::new("leading zero in number", Span::new(3, 7));
        assert_eq!(e.to_string(), "leading zero in number at line 3, column 7");
    }

    #[test]
    fn parser_error_includes_offending_lexeme() {
        let e = ParserError::new("expecting end-of-file", "class", Span::new(1, 1));
        assert_eq!(
            e.to_string(),
            "expecting end-of-file found 'class' at line 1, column 1"
        );
    }

    #[test]
    fn static_error_plain_has_no_position() {
        let e = StaticError::plain("member 'x' is private");
        assert_eq!(e.to_string(), "member 'x' is private");
    }
}
