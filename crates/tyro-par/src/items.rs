//! Top-level definitions: structs, classes, and free functions, plus the
//! `data_type`/`params`/`fields` productions they share.

use tyro_lex::{Token, TokenKind};

use crate::ast::*;
use crate::{ParseResult, Parser};

impl<'a> Parser<'a> {
    /// A bare type-name token: a struct/class name or a primitive type
    /// keyword. Shared by `data_type` (which also allows `void`) and
    /// `new_rvalue` (which allows neither `void` nor the leading `array`
    /// marker, since array-ness there comes from a trailing `[size]`).
    pub(crate) fn type_name_token(&mut self) -> ParseResult<Token> {
        let kind = self.curr.kind;
        if kind.is_base_type() || kind == TokenKind::Id {
            self.advance()
        } else {
            Err(self.error("expecting a type name"))
        }
    }

    pub(crate) fn data_type(&mut self) -> ParseResult<DataType> {
        let is_array = if self.at(TokenKind::Array) {
            self.advance()?;
            true
        } else {
            false
        };
        let tok = if self.at(TokenKind::VoidType) {
            self.advance()?
        } else {
            self.type_name_token()?
        };
        Ok(DataType {
            is_array,
            type_name: tok.lexeme,
        })
    }

    pub(crate) fn var_def(&mut self) -> ParseResult<VarDef> {
        let data_type = self.data_type()?;
        let var_name = self.eat_id()?;
        Ok(VarDef {
            data_type,
            var_name,
        })
    }

    /// Comma-separated `VarDef` list, used for both function parameters and
    /// struct fields.
    pub(crate) fn var_def_list(&mut self, stop: TokenKind) -> ParseResult<Vec<VarDef>> {
        let mut out = Vec::new();
        if self.at(stop) {
            return Ok(out);
        }
        out.push(self.var_def()?);
        while self.at(TokenKind::Comma) {
            self.advance()?;
            out.push(self.var_def()?);
        }
        Ok(out)
    }

    pub(crate) fn struct_def(&mut self) -> ParseResult<StructDef> {
        self.eat(TokenKind::Struct, "'struct'")?;
        let struct_name = self.eat_id()?;
        self.eat(TokenKind::LBrace, "'{'")?;
        let fields = self.var_def_list(TokenKind::RBrace)?;
        self.eat(TokenKind::RBrace, "'}'")?;
        Ok(StructDef {
            struct_name,
            fields,
        })
    }

    pub(crate) fn fun_def(&mut self) -> ParseResult<FunDef> {
        let return_type = self.data_type()?;
        let fun_name = self.eat_id()?;
        self.eat(TokenKind::LParen, "'('")?;
        let params = self.var_def_list(TokenKind::RParen)?;
        self.eat(TokenKind::RParen, "')'")?;
        let stmts = self.block()?;
        Ok(FunDef {
            return_type,
            fun_name,
            params,
            stmts,
        })
    }

    /// `{ stmt* }`, shared by function bodies, methods, and every control
    /// statement's body.
    pub(crate) fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.eat(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            stmts.push(self.stmt()?);
        }
        self.eat(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    pub(crate) fn class_def(&mut self) -> ParseResult<ClassDef> {
        self.eat(TokenKind::Class, "'class'")?;
        let class_name = self.eat_id()?;
        self.eat(TokenKind::LBrace, "'{'")?;
        let mut class_def = ClassDef {
            class_name,
            public_methods: Vec::new(),
            public_members: Vec::new(),
            private_methods: Vec::new(),
            private_members: Vec::new(),
        };
        if self.at(TokenKind::Private) {
            self.advance()?;
            self.eat(TokenKind::Colon, "':'")?;
            self.class_body(&mut class_def.private_members, &mut class_def.private_methods)?;
        }
        if self.at(TokenKind::Public) {
            self.advance()?;
            self.eat(TokenKind::Colon, "':'")?;
            self.class_body(&mut class_def.public_members, &mut class_def.public_methods)?;
        }
        self.eat(TokenKind::RBrace, "'}'")?;
        Ok(class_def)
    }

    /// One visibility section's run of member/method declarations. A
    /// `data_type ID` pair followed by `(` is a method; otherwise it is a
    /// field declaration.
    fn class_body(&mut self, members: &mut Vec<VarDef>, methods: &mut Vec<FunDef>) -> ParseResult<()> {
        loop {
            match self.curr.kind {
                TokenKind::Public | TokenKind::Private | TokenKind::RBrace => break,
                _ => {}
            }
            let return_type = self.data_type()?;
            let name = self.eat_id()?;
            if self.at(TokenKind::LParen) {
                self.advance()?;
                let params = self.var_def_list(TokenKind::RParen)?;
                self.eat(TokenKind::RParen, "')'")?;
                let stmts = self.block()?;
                methods.push(FunDef {
                    return_type,
                    fun_name: name,
                    params,
                    stmts,
                });
            } else {
                members.push(VarDef {
                    data_type: return_type,
                    var_name: name,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;

    #[test]
    fn parses_struct_with_fields() {
        let program = parse("struct Point { int x, int y }").unwrap();
        assert_eq!(program.struct_defs.len(), 1);
        assert_eq!(program.struct_defs[0].fields.len(), 2);
    }

    #[test]
    fn parses_empty_struct() {
        let program = parse("struct Unit { }").unwrap();
        assert!(program.struct_defs[0].fields.is_empty());
    }

    #[test]
    fn parses_free_function() {
        let program = parse("int main() { return 0 }").unwrap();
        assert_eq!(program.fun_defs.len(), 1);
        assert_eq!(program.fun_defs[0].fun_name.lexeme, "main");
    }

    #[test]
    fn parses_function_with_params() {
        let program = parse("int add(int a, int b) { return a }").unwrap();
        assert_eq!(program.fun_defs[0].params.len(), 2);
    }

    #[test]
    fn class_public_methods_are_mirrored_into_fun_defs() {
        let src = "class Counter { \
            private: int count \
            public: int get() { return count } \
            void bump() { count = count } \
        }";
        let program = parse(src).unwrap();
        assert_eq!(program.class_defs.len(), 1);
        assert_eq!(program.class_defs[0].private_members.len(), 1);
        assert_eq!(program.class_defs[0].public_methods.len(), 2);
        assert_eq!(program.fun_defs.len(), 2);
        assert_eq!(program.fun_defs[0].fun_name.lexeme, "get");
        assert_eq!(program.fun_defs[1].fun_name.lexeme, "bump");
    }

    #[test]
    fn class_private_methods_are_not_mirrored() {
        let src = "class C { private: int helper() { return 1 } public: int x }";
        let program = parse(src).unwrap();
        assert_eq!(program.class_defs[0].private_methods.len(), 1);
        assert!(program.fun_defs.is_empty());
    }

    #[test]
    fn array_data_type() {
        let program = parse("array int make() { return new int[5] }").unwrap();
        assert!(program.fun_defs[0].return_type.is_array);
        assert_eq!(program.fun_defs[0].return_type.type_name, "int");
    }
}
