//! Recursive-descent parser producing the AST defined in [`ast`].
//!
//! The grammar needs at most one token of lookahead beyond the current
//! token (two tokens total), used in a handful of places to disambiguate a
//! variable declaration from an assignment, and a class field from a
//! class method. `Parser` keeps that lookahead token buffered rather than
//! re-reading the lexer, mirroring the original `ASTParser`'s `advance`
//! over a two-token window.

pub mod ast;
mod expr;
mod items;
pub mod print;
mod stmt;

use tyro_lex::{Lexer, Token, TokenKind};
use tyro_util::error::{LexerError, ParserError};
use tyro_util::Span;

pub use ast::*;
pub use print::pretty_print;

/// Either stage's failure, so a parse can surface a `Lexer Error:` message
/// for malformed source text distinctly from a `Parser Error:` message for
/// a malformed token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexerError),
    Syntax(ParserError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::Syntax(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError::Lex(e)
    }
}

impl From<ParserError> for ParseError {
    fn from(e: ParserError) -> Self {
        ParseError::Syntax(e)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete program from source text.
pub fn parse(source: &str) -> ParseResult<Program> {
    Parser::new(source)?.parse_program()
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    curr: Token,
    peek: Token,
    next_call_id: u32,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let curr = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Self {
            lexer,
            curr,
            peek,
            next_call_id: 0,
        })
    }

    fn fresh_call_id(&mut self) -> CallSiteId {
        let id = CallSiteId(self.next_call_id);
        self.next_call_id += 1;
        id
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.curr.kind == kind
    }

    fn peek_at(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    /// Consumes and returns the current token, pulling a fresh one into
    /// the lookahead slot.
    fn advance(&mut self) -> ParseResult<Token> {
        let next = self.lexer.next_token()?;
        let fresh_peek = std::mem::replace(&mut self.peek, next);
        let old_curr = std::mem::replace(&mut self.curr, fresh_peek);
        Ok(old_curr)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParserError::new(message, self.curr.lexeme.clone(), self.curr.span).into()
    }

    /// Consumes the current token if it matches `kind`, otherwise raises a
    /// `Parser Error` naming what was expected.
    fn eat(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.curr.kind == kind {
            self.advance()
        } else {
            Err(self.error(format!("expecting {expected}")))
        }
    }

    fn eat_id(&mut self) -> ParseResult<Token> {
        self.eat(TokenKind::Id, "an identifier")
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program {
            struct_defs: Vec::new(),
            fun_defs: Vec::new(),
            class_defs: Vec::new(),
        };
        loop {
            match self.curr.kind {
                TokenKind::Eos => break,
                TokenKind::Struct => program.struct_defs.push(self.struct_def()?),
                TokenKind::Class => {
                    let class_def = self.class_def()?;
                    // Public methods are mirrored into the free-function list
                    // so the code generator can emit them through the same
                    // path as ordinary functions; private methods are not.
                    program.fun_defs.extend(class_def.public_methods.clone());
                    program.class_defs.push(class_def);
                }
                _ => program.fun_defs.push(self.fun_def()?),
            }
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_program() {
        let program = parse("").unwrap();
        assert!(program.struct_defs.is_empty());
        assert!(program.fun_defs.is_empty());
        assert!(program.class_defs.is_empty());
    }

    #[test]
    fn lexer_error_surfaces_as_lex_variant() {
        let err = parse("0123").unwrap_err();
        assert!(matches!(err, ParseError::Lex(_)));
    }
}
