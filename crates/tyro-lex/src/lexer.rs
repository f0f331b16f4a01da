//! Stateful character scanner producing one token at a time.
//!
//! `Lexer::next_token` is the only public operation; callers drive the
//! scanner themselves rather than collecting an upfront token vector. This
//! matches the source language's own `Lexer::next_token()` interface: the
//! parser asks for one token ahead, the `--lex` driver mode loops calling
//! it until end-of-stream.

use tyro_util::error::{LexerError, LexerResult};
use tyro_util::Span;

use crate::cursor::Cursor;
use crate::token::{keyword, Token, TokenKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    fn pos(&self) -> Span {
        Span::new(self.cursor.line(), self.cursor.column())
    }

    /// Skips whitespace and `#`-to-end-of-line comments, in any
    /// interleaving, until the next token-starting character or EOS.
    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.read();
                }
                Some('#') => {
                    while let Some(c) = self.cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.cursor.read();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans and returns the next token, or the end-of-stream token once
    /// the source is exhausted.
    pub fn next_token(&mut self) -> LexerResult<Token> {
        self.skip_trivia();

        let start = self.pos();
        let ch = match self.cursor.read() {
            None => return Ok(Token::new(TokenKind::Eos, "end-of-stream", start)),
            Some(c) => c,
        };

        use TokenKind::*;
        match ch {
            ',' => Ok(Token::new(Comma, ",", start)),
            '.' => Ok(Token::new(Dot, ".", start)),
            '[' => Ok(Token::new(LBracket, "[", start)),
            ']' => Ok(Token::new(RBracket, "]", start)),
            '(' => Ok(Token::new(LParen, "(", start)),
            ')' => Ok(Token::new(RParen, ")", start)),
            ';' => Ok(Token::new(Semicolon, ";", start)),
            '{' => Ok(Token::new(LBrace, "{", start)),
            '}' => Ok(Token::new(RBrace, "}", start)),
            '+' => Ok(Token::new(Plus, "+", start)),
            '-' => Ok(Token::new(Minus, "-", start)),
            '*' => Ok(Token::new(Times, "*", start)),
            '/' => Ok(Token::new(Divide, "/", start)),
            ':' => Ok(Token::new(Colon, ":", start)),
            '=' => Ok(self.two_char(start, '=', Equal, "==", Assign, "=")),
            '<' => Ok(self.two_char(start, '=', LessEq, "<=", Less, "<")),
            '>' => Ok(self.two_char(start, '=', GreaterEq, ">=", Greater, ">")),
            '!' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.read();
                    Ok(Token::new(NotEqual, "!=", start))
                } else {
                    let bad = self.cursor.read().map(String::from).unwrap_or_default();
                    Err(LexerError::new(
                        format!("expecting '!=' found '!{bad}'"),
                        start,
                    ))
                }
            }
            '\'' => self.lex_char(start),
            '"' => self.lex_string(start),
            c if c.is_ascii_digit() => self.lex_number(c, start),
            c if c.is_alphabetic() => Ok(self.lex_identifier(c, start)),
            c => Err(LexerError::new(format!("unexpected character '{c}'"), start)),
        }
    }

    /// Consumes a second character `next` to produce `wide_kind`/`wide_lexeme`
    /// if present, otherwise returns `narrow_kind`/`narrow_lexeme`.
    fn two_char(
        &mut self,
        start: Span,
        next: char,
        wide_kind: TokenKind,
        wide_lexeme: &str,
        narrow_kind: TokenKind,
        narrow_lexeme: &str,
    ) -> Token {
        if self.cursor.peek() == Some(next) {
            self.cursor.read();
            Token::new(wide_kind, wide_lexeme, start)
        } else {
            Token::new(narrow_kind, narrow_lexeme, start)
        }
    }

    fn lex_identifier(&mut self, first: char, start: Span) -> Token {
        let mut word = String::new();
        word.push(first);
        while let Some(c) = self.cursor.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(self.cursor.read().unwrap());
            } else {
                break;
            }
        }
        let kind = keyword(&word).unwrap_or(TokenKind::Id);
        Token::new(kind, word, start)
    }

    fn lex_number(&mut self, first: char, start: Span) -> LexerResult<Token> {
        if first == '0' {
            if let Some(c) = self.cursor.peek() {
                if c.is_ascii_digit() {
                    return Err(LexerError::new("leading zero in number", start));
                }
            }
        }
        let mut num = String::new();
        num.push(first);
        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_digit() {
                num.push(self.cursor.read().unwrap());
            } else {
                break;
            }
        }
        if self.cursor.peek() == Some('.') {
            num.push(self.cursor.read().unwrap());
            match self.cursor.peek() {
                Some(c) if c.is_ascii_digit() => {}
                _ => return Err(LexerError::new(format!("missing digit in '{num}'"), start)),
            }
            while let Some(c) = self.cursor.peek() {
                if c.is_ascii_digit() {
                    num.push(self.cursor.read().unwrap());
                } else {
                    break;
                }
            }
            return Ok(Token::new(TokenKind::DoubleVal, num, start));
        }
        Ok(Token::new(TokenKind::IntVal, num, start))
    }

    fn lex_string(&mut self, start: Span) -> LexerResult<Token> {
        let mut s = String::new();
        loop {
            match self.cursor.read() {
                None => return Err(LexerError::new("found end-of-file in string", start)),
                Some('"') => break,
                Some('\n') => return Err(LexerError::new("found end-of-line in string", start)),
                Some(c) => s.push(c),
            }
        }
        Ok(Token::new(TokenKind::StringVal, s, start))
    }

    fn lex_char(&mut self, start: Span) -> LexerResult<Token> {
        match self.cursor.peek() {
            None => Err(LexerError::new("found end-of-file in character", start)),
            Some('\'') => {
                self.cursor.read();
                Err(LexerError::new("empty character", start))
            }
            Some('\n') => Err(LexerError::new("found end-of-line in character", start)),
            Some('\\') => {
                self.cursor.read();
                match self.cursor.peek() {
                    Some(c) if c.is_alphabetic() => {
                        let escaped = self.cursor.read().unwrap();
                        match self.cursor.read() {
                            Some('\'') => Ok(Token::new(
                                TokenKind::CharVal,
                                format!("\\{escaped}"),
                                start,
                            )),
                            _ => Err(LexerError::new("unclosed character literal", start)),
                        }
                    }
                    _ => Err(LexerError::new("invalid escape in character literal", start)),
                }
            }
            Some(c) if c.is_ascii_digit() => {
                self.cursor.read();
                Err(LexerError::new("invalid character literal", start))
            }
            Some(_) => {
                let content = self.cursor.read().unwrap();
                match self.cursor.read() {
                    Some('\'') => Ok(Token::new(TokenKind::CharVal, content.to_string(), start)),
                    _ => Err(LexerError::new("unclosed character literal", start)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().expect("lex error");
            let done = t.kind == TokenKind::Eos;
            out.push(t.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn punctuation_and_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds(". , ( ) [ ] ; { } : + - * / = < > <= >= == !="),
            vec![
                Dot, Comma, LParen, RParen, LBracket, RBracket, Semicolon, LBrace, RBrace, Colon,
                Plus, Minus, Times, Divide, Assign, Less, Greater, LessEq, GreaterEq, Equal,
                NotEqual, Eos
            ]
        );
    }

    #[test]
    fn skips_comments_and_whitespace() {
        let mut lexer = Lexer::new("  # a comment\n  x # trailing\n");
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Id);
        assert_eq!(t.lexeme, "x");
    }

    #[test]
    fn leading_zero_is_rejected() {
        let mut lexer = Lexer::new("0123");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn zero_alone_is_fine() {
        let mut lexer = Lexer::new("0");
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::IntVal);
        assert_eq!(t.lexeme, "0");
    }

    #[test]
    fn double_literal() {
        let mut lexer = Lexer::new("3.14");
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::DoubleVal);
        assert_eq!(t.lexeme, "3.14");
    }

    #[test]
    fn double_missing_digit_after_dot() {
        let mut lexer = Lexer::new("3. ");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn string_literal_and_empty_string() {
        let mut lexer = Lexer::new(r#""hello" """#);
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::StringVal);
        assert_eq!(t.lexeme, "hello");
        let t2 = lexer.next_token().unwrap();
        assert_eq!(t2.kind, TokenKind::StringVal);
        assert_eq!(t2.lexeme, "");
    }

    #[test]
    fn string_with_embedded_newline_is_an_error() {
        let mut lexer = Lexer::new("\"ab\ncd\"");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"abc");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn char_literal_forms() {
        let mut lexer = Lexer::new(r"'x' '\n' ' '");
        let t1 = lexer.next_token().unwrap();
        assert_eq!((t1.kind, t1.lexeme.as_str()), (TokenKind::CharVal, "x"));
        let t2 = lexer.next_token().unwrap();
        assert_eq!((t2.kind, t2.lexeme.as_str()), (TokenKind::CharVal, "\\n"));
        let t3 = lexer.next_token().unwrap();
        assert_eq!((t3.kind, t3.lexeme.as_str()), (TokenKind::CharVal, " "));
    }

    #[test]
    fn empty_char_literal_is_an_error() {
        let mut lexer = Lexer::new("''");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn lone_bang_is_an_error() {
        let mut lexer = Lexer::new("! x");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("struct array for while if elseif else and or not new return class public private true false null foo"),
            vec![
                Struct, Array, For, While, If, ElseIf, Else, And, Or, Not, New, Return, Class,
                Public, Private, BoolVal, BoolVal, NullVal, Id, Eos
            ]
        );
    }

    #[test]
    fn primitive_type_names() {
        use TokenKind::*;
        assert_eq!(
            kinds("int double bool string char void"),
            vec![IntType, DoubleType, BoolType, StringType, CharType, VoidType, Eos]
        );
    }

    #[test]
    fn positions_track_line_and_column() {
        let mut lexer = Lexer::new("x\n  y");
        let t1 = lexer.next_token().unwrap();
        assert_eq!((t1.line(), t1.column()), (1, 1));
        let t2 = lexer.next_token().unwrap();
        assert_eq!((t2.line(), t2.column()), (2, 3));
    }
}
