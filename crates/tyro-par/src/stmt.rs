//! Statement grammar.

use tyro_lex::TokenKind;

use crate::ast::*;
use crate::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn stmt(&mut self) -> ParseResult<Stmt> {
        match self.curr.kind {
            TokenKind::If => Ok(Stmt::If(self.if_stmt()?)),
            TokenKind::While => Ok(Stmt::While(self.while_stmt()?)),
            TokenKind::For => Ok(Stmt::For(self.for_stmt()?)),
            TokenKind::Return => Ok(Stmt::Return(self.ret_stmt()?)),
            k if k.is_base_type() || k == TokenKind::Array => {
                Ok(Stmt::VarDecl(self.vdecl_stmt()?))
            }
            TokenKind::Id => {
                if self.peek_at(TokenKind::LParen) {
                    let call = self.call_expr()?;
                    Ok(Stmt::Call(call))
                } else if self.peek_at(TokenKind::Id) {
                    // `Type name = ...` — a user-defined type name followed
                    // by the variable being declared.
                    Ok(Stmt::VarDecl(self.vdecl_stmt()?))
                } else {
                    Ok(Stmt::Assign(self.assign_stmt()?))
                }
            }
            _ => Err(self.error("expecting a statement")),
        }
    }

    pub(crate) fn vdecl_stmt(&mut self) -> ParseResult<VarDeclStmt> {
        let var_def = self.var_def()?;
        self.eat(TokenKind::Assign, "'='")?;
        let expr = self.expr()?;
        Ok(VarDeclStmt { var_def, expr })
    }

    fn lvalue(&mut self) -> ParseResult<Vec<VarRef>> {
        let mut path = vec![self.lvalue_ref()?];
        while self.at(TokenKind::Dot) {
            self.advance()?;
            path.push(self.lvalue_ref()?);
        }
        Ok(path)
    }

    fn lvalue_ref(&mut self) -> ParseResult<VarRef> {
        let var_name = self.eat_id()?;
        let array_expr = if self.at(TokenKind::LBracket) {
            self.advance()?;
            let e = self.expr()?;
            self.eat(TokenKind::RBracket, "']'")?;
            Some(Box::new(e))
        } else {
            None
        };
        Ok(VarRef {
            var_name,
            is_method: false,
            array_expr,
            method_params: Vec::new(),
        })
    }

    pub(crate) fn assign_stmt(&mut self) -> ParseResult<AssignStmt> {
        let lvalue = self.lvalue()?;
        self.eat(TokenKind::Assign, "'='")?;
        let expr = self.expr()?;
        Ok(AssignStmt { lvalue, expr })
    }

    fn basic_if(&mut self) -> ParseResult<BasicIf> {
        self.eat(TokenKind::LParen, "'('")?;
        let condition = self.expr()?;
        self.eat(TokenKind::RParen, "')'")?;
        let stmts = self.block()?;
        Ok(BasicIf { condition, stmts })
    }

    fn if_stmt(&mut self) -> ParseResult<IfStmt> {
        self.eat(TokenKind::If, "'if'")?;
        let if_part = self.basic_if()?;
        let mut else_ifs = Vec::new();
        while self.at(TokenKind::ElseIf) {
            self.advance()?;
            else_ifs.push(self.basic_if()?);
        }
        let else_stmts = if self.at(TokenKind::Else) {
            self.advance()?;
            self.block()?
        } else {
            Vec::new()
        };
        Ok(IfStmt {
            if_part,
            else_ifs,
            else_stmts,
        })
    }

    fn while_stmt(&mut self) -> ParseResult<WhileStmt> {
        self.eat(TokenKind::While, "'while'")?;
        self.eat(TokenKind::LParen, "'('")?;
        let condition = self.expr()?;
        self.eat(TokenKind::RParen, "')'")?;
        let stmts = self.block()?;
        Ok(WhileStmt { condition, stmts })
    }

    fn for_stmt(&mut self) -> ParseResult<ForStmt> {
        self.eat(TokenKind::For, "'for'")?;
        self.eat(TokenKind::LParen, "'('")?;
        let var_decl = self.vdecl_stmt()?;
        self.eat(TokenKind::Semicolon, "';'")?;
        let condition = self.expr()?;
        self.eat(TokenKind::Semicolon, "';'")?;
        let assign_stmt = self.assign_stmt()?;
        self.eat(TokenKind::RParen, "')'")?;
        let stmts = self.block()?;
        Ok(ForStmt {
            var_decl,
            condition,
            assign_stmt,
            stmts,
        })
    }

    fn ret_stmt(&mut self) -> ParseResult<ReturnStmt> {
        self.eat(TokenKind::Return, "'return'")?;
        let expr = self.expr()?;
        Ok(ReturnStmt { expr })
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use crate::ast::Stmt;

    fn body(src: &str) -> Vec<Stmt> {
        let program = parse(&format!("void f() {{ {src} }}")).unwrap();
        program.fun_defs[0].stmts.clone()
    }

    #[test]
    fn parses_var_decl_with_builtin_type() {
        let stmts = body("int x = 1");
        assert!(matches!(stmts[0], Stmt::VarDecl(_)));
    }

    #[test]
    fn parses_var_decl_with_user_type() {
        let stmts = body("Point p = new Point");
        assert!(matches!(stmts[0], Stmt::VarDecl(_)));
    }

    #[test]
    fn parses_assignment() {
        let stmts = body("x = x + 1");
        assert!(matches!(stmts[0], Stmt::Assign(_)));
    }

    #[test]
    fn parses_call_statement() {
        let stmts = body("print(x)");
        assert!(matches!(stmts[0], Stmt::Call(_)));
    }

    #[test]
    fn parses_consecutive_statements_without_separators() {
        let stmts = body("int x = 1 x = x + 1 print(x)");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Stmt::VarDecl(_)));
        assert!(matches!(stmts[1], Stmt::Assign(_)));
        assert!(matches!(stmts[2], Stmt::Call(_)));
    }

    #[test]
    fn parses_if_elseif_else() {
        let stmts = body("if (x) { y = 1 } elseif (z) { y = 2 } else { y = 3 }");
        match &stmts[0] {
            Stmt::If(if_stmt) => {
                assert_eq!(if_stmt.else_ifs.len(), 1);
                assert_eq!(if_stmt.else_stmts.len(), 1);
            }
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn parses_while() {
        let stmts = body("while (x) { y = y + 1 }");
        assert!(matches!(stmts[0], Stmt::While(_)));
    }

    #[test]
    fn parses_for() {
        let stmts = body("for (int i = 0; i < 10; i = i + 1) { print(i) }");
        match &stmts[0] {
            Stmt::For(for_stmt) => {
                assert_eq!(for_stmt.stmts.len(), 1);
            }
            _ => panic!("expected for statement"),
        }
    }

    #[test]
    fn parses_return() {
        let stmts = body("return 0");
        assert!(matches!(stmts[0], Stmt::Return(_)));
    }

    #[test]
    fn lvalue_path_with_field_and_index() {
        let stmts = body("a.b[0] = 1");
        match &stmts[0] {
            Stmt::Assign(assign) => {
                assert_eq!(assign.lvalue.len(), 2);
                assert!(assign.lvalue[1].array_expr.is_some());
            }
            _ => panic!("expected assign statement"),
        }
    }
}
