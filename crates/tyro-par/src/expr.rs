//! Expression, r-value, and call grammar.
//!
//! `expr` builds the right-leaning tree described in [`crate::ast::Expr`]:
//! a single term, then optionally an operator and a nested `expr` as the
//! remainder. There is no precedence climbing — a chain `a + b * c` parses
//! as `a + (b * c)` only because `*` happens to come after `+` in the
//! input, not because `*` binds tighter; semantic checking is what makes
//! sense of the category of operator at each level.

use tyro_lex::TokenKind;

use crate::ast::*;
use crate::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn expr(&mut self) -> ParseResult<Expr> {
        let negated = if self.at(TokenKind::Not) {
            self.advance()?;
            true
        } else {
            false
        };
        let first = Box::new(self.expr_term()?);
        let (op, rest) = if self.curr.kind.is_bin_op() {
            let op = self.advance()?;
            let rest = Box::new(self.expr()?);
            (Some(op), Some(rest))
        } else {
            (None, None)
        };
        Ok(Expr {
            negated,
            first,
            op,
            rest,
        })
    }

    fn expr_term(&mut self) -> ParseResult<ExprTerm> {
        if self.at(TokenKind::LParen) {
            self.advance()?;
            let inner = self.expr()?;
            self.eat(TokenKind::RParen, "')'")?;
            Ok(ExprTerm::Complex(ComplexTerm {
                expr: Box::new(inner),
            }))
        } else {
            Ok(ExprTerm::Simple(SimpleTerm {
                rvalue: Box::new(self.rvalue()?),
            }))
        }
    }

    fn rvalue(&mut self) -> ParseResult<RValue> {
        match self.curr.kind {
            TokenKind::NullVal => Ok(RValue::Simple(SimpleRValue {
                value: self.advance()?,
            })),
            TokenKind::New => Ok(RValue::New(self.new_rvalue()?)),
            TokenKind::Id => {
                if self.peek_at(TokenKind::LParen) {
                    Ok(RValue::Call(self.call_expr()?))
                } else {
                    Ok(RValue::Var(self.var_rvalue()?))
                }
            }
            k if k.is_base_rvalue() => Ok(RValue::Simple(SimpleRValue {
                value: self.advance()?,
            })),
            _ => Err(self.error("expecting an expression")),
        }
    }

    fn new_rvalue(&mut self) -> ParseResult<NewRValue> {
        self.eat(TokenKind::New, "'new'")?;
        let type_name = self.type_name_token()?;
        let array_expr = if self.at(TokenKind::LBracket) {
            self.advance()?;
            let size = self.expr()?;
            self.eat(TokenKind::RBracket, "']'")?;
            Some(Box::new(size))
        } else {
            None
        };
        Ok(NewRValue {
            type_name,
            array_expr,
        })
    }

    fn var_rvalue(&mut self) -> ParseResult<VarRValue> {
        let mut path = vec![self.var_ref()?];
        while self.at(TokenKind::Dot) {
            self.advance()?;
            path.push(self.var_ref()?);
        }
        Ok(VarRValue { path })
    }

    /// One step of a dotted access path. Only the last step may be a
    /// method call; an indexed step `name[expr]` may appear anywhere.
    fn var_ref(&mut self) -> ParseResult<VarRef> {
        let var_name = self.eat_id()?;
        if self.at(TokenKind::LParen) {
            self.advance()?;
            let method_params = self.args()?;
            self.eat(TokenKind::RParen, "')'")?;
            Ok(VarRef {
                var_name,
                is_method: true,
                array_expr: None,
                method_params,
            })
        } else if self.at(TokenKind::LBracket) {
            self.advance()?;
            let index = self.expr()?;
            self.eat(TokenKind::RBracket, "']'")?;
            Ok(VarRef {
                var_name,
                is_method: false,
                array_expr: Some(Box::new(index)),
                method_params: Vec::new(),
            })
        } else {
            Ok(VarRef {
                var_name,
                is_method: false,
                array_expr: None,
                method_params: Vec::new(),
            })
        }
    }

    pub(crate) fn call_expr(&mut self) -> ParseResult<CallExpr> {
        let fun_name = self.eat_id()?;
        self.eat(TokenKind::LParen, "'('")?;
        let args = self.args()?;
        self.eat(TokenKind::RParen, "')'")?;
        let id = self.fresh_call_id();
        Ok(CallExpr { id, fun_name, args })
    }

    fn args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut out = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(out);
        }
        out.push(self.expr()?);
        while self.at(TokenKind::Comma) {
            self.advance()?;
            out.push(self.expr()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use crate::ast::{ExprTerm, RValue, Stmt};

    fn expr_of(src: &str) -> crate::ast::Expr {
        let program = parse(&format!("void f() {{ return {src} }}")).unwrap();
        match &program.fun_defs[0].stmts[0] {
            Stmt::Return(r) => r.expr.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn simple_literal() {
        let e = expr_of("1");
        assert!(e.op.is_none() && e.rest.is_none());
        assert!(matches!(*e.first, ExprTerm::Simple(_)));
    }

    #[test]
    fn right_leaning_binary_chain() {
        let e = expr_of("1 + 2 + 3");
        assert!(e.op.is_some());
        let rest = e.rest.unwrap();
        assert!(rest.op.is_some());
        assert!(rest.rest.is_some());
    }

    #[test]
    fn negated_expr() {
        let e = expr_of("not true");
        assert!(e.negated);
    }

    #[test]
    fn parenthesized_term() {
        let e = expr_of("(1 + 2)");
        assert!(matches!(*e.first, ExprTerm::Complex(_)));
    }

    #[test]
    fn call_as_rvalue() {
        let e = expr_of("foo(1, 2)");
        match *e.first {
            ExprTerm::Simple(term) => assert!(matches!(*term.rvalue, RValue::Call(_))),
            _ => panic!("expected simple term"),
        }
    }

    #[test]
    fn var_path_with_method_call() {
        let e = expr_of("a.b.c(1)");
        match *e.first {
            ExprTerm::Simple(term) => match *term.rvalue {
                RValue::Var(v) => {
                    assert_eq!(v.path.len(), 3);
                    assert!(v.path[2].is_method);
                    assert_eq!(v.path[2].method_params.len(), 1);
                }
                _ => panic!("expected var rvalue"),
            },
            _ => panic!("expected simple term"),
        }
    }

    #[test]
    fn new_array_rvalue() {
        let e = expr_of("new int[10]");
        match *e.first {
            ExprTerm::Simple(term) => match *term.rvalue {
                RValue::New(n) => assert!(n.array_expr.is_some()),
                _ => panic!("expected new rvalue"),
            },
            _ => panic!("expected simple term"),
        }
    }

    #[test]
    fn call_sites_get_distinct_ids() {
        let program = parse("void f() { print(1) print(2) }").unwrap();
        let ids: Vec<_> = program.fun_defs[0]
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Call(c) => c.id,
                _ => unreachable!(),
            })
            .collect();
        assert_ne!(ids[0], ids[1]);
    }
}
