//! Pretty-printing a parsed [`Program`] back to source-like text: one
//! top-level definition per blank-line-separated block, one statement per
//! line inside a block, expressions printed inline without their own line
//! breaks.

use std::fmt::Write as _;

use crate::ast::*;

const INDENT_AMT: usize = 2;

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn indent_str(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn inc(&mut self) {
        self.indent += INDENT_AMT;
    }

    fn dec(&mut self) {
        self.indent -= INDENT_AMT;
    }

    fn program(&mut self, p: &Program) {
        for s in &p.struct_defs {
            self.struct_def(s);
        }
        for c in &p.class_defs {
            self.class_def(c);
        }
        for f in &p.fun_defs {
            self.fun_def(f);
        }
    }

    fn struct_def(&mut self, s: &StructDef) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "struct {} {{", s.struct_name.lexeme);
        self.inc();
        for (i, field) in s.fields.iter().enumerate() {
            self.indent_str();
            let sep = if i + 1 == s.fields.len() { "\n" } else { ",\n" };
            let _ = write!(
                self.out,
                "{} {}{sep}",
                type_str(&field.data_type),
                field.var_name.lexeme
            );
        }
        self.dec();
        let _ = writeln!(self.out, "}}");
    }

    fn class_def(&mut self, c: &ClassDef) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "class {} {{", c.class_name.lexeme);
        self.inc();
        if !c.private_members.is_empty() || !c.private_methods.is_empty() {
            let _ = writeln!(self.out, "private:");
        }
        for m in &c.private_members {
            self.indent_str();
            let _ = writeln!(self.out, "{} {}", type_str(&m.data_type), m.var_name.lexeme);
        }
        for m in &c.private_methods {
            self.indent_str();
            self.fun_def(m);
        }
        if !c.public_members.is_empty() || !c.public_methods.is_empty() {
            let _ = writeln!(self.out, "public:");
        }
        for m in &c.public_members {
            self.indent_str();
            let _ = writeln!(self.out, "{} {}", type_str(&m.data_type), m.var_name.lexeme);
        }
        for m in &c.public_methods {
            self.indent_str();
            self.fun_def(m);
        }
        self.dec();
        let _ = writeln!(self.out, "}}");
    }

    fn fun_def(&mut self, f: &FunDef) {
        let _ = writeln!(self.out);
        let _ = write!(self.out, "{} {}(", type_str(&f.return_type), f.fun_name.lexeme);
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                let _ = write!(self.out, ", ");
            }
            let _ = write!(self.out, "{} {}", type_str(&p.data_type), p.var_name.lexeme);
        }
        let _ = writeln!(self.out, ") {{");
        self.inc();
        for stmt in &f.stmts {
            self.indent_str();
            self.stmt(stmt);
            let _ = writeln!(self.out);
        }
        self.dec();
        let _ = writeln!(self.out, "}}");
    }

    fn stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Return(r) => {
                let _ = write!(self.out, "return ");
                self.expr(&r.expr);
            }
            Stmt::While(w) => self.while_stmt(w),
            Stmt::For(f) => self.for_stmt(f),
            Stmt::If(i) => self.if_stmt(i),
            Stmt::VarDecl(v) => self.var_decl(v),
            Stmt::Assign(a) => self.assign(a),
            Stmt::Call(c) => self.call_expr(c),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        let _ = writeln!(self.out, "{{");
        self.inc();
        for s in stmts {
            self.indent_str();
            self.stmt(s);
            let _ = writeln!(self.out);
        }
        self.dec();
        self.indent_str();
        let _ = write!(self.out, "}}");
    }

    fn while_stmt(&mut self, w: &WhileStmt) {
        let _ = write!(self.out, "while (");
        self.expr(&w.condition);
        let _ = write!(self.out, ") ");
        self.block(&w.stmts);
    }

    fn for_stmt(&mut self, f: &ForStmt) {
        let _ = write!(self.out, "for (");
        self.var_decl(&f.var_decl);
        let _ = write!(self.out, "; ");
        self.expr(&f.condition);
        let _ = write!(self.out, "; ");
        self.assign(&f.assign_stmt);
        let _ = write!(self.out, ") ");
        self.block(&f.stmts);
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        let _ = write!(self.out, "if (");
        self.expr(&s.if_part.condition);
        let _ = write!(self.out, ") ");
        self.block(&s.if_part.stmts);
        for elseif in &s.else_ifs {
            let _ = writeln!(self.out);
            self.indent_str();
            let _ = write!(self.out, "elseif (");
            self.expr(&elseif.condition);
            let _ = write!(self.out, ") ");
            self.block(&elseif.stmts);
        }
        if !s.else_stmts.is_empty() {
            let _ = writeln!(self.out);
            self.indent_str();
            let _ = write!(self.out, "else ");
            self.block(&s.else_stmts);
        }
    }

    fn var_decl(&mut self, v: &VarDeclStmt) {
        let _ = write!(
            self.out,
            "{} {} = ",
            type_str(&v.var_def.data_type),
            v.var_def.var_name.lexeme
        );
        self.expr(&v.expr);
    }

    fn assign(&mut self, a: &AssignStmt) {
        for (i, step) in a.lvalue.iter().enumerate() {
            if i > 0 {
                let _ = write!(self.out, ".");
            }
            let _ = write!(self.out, "{}", step.var_name.lexeme);
            if let Some(idx) = &step.array_expr {
                let _ = write!(self.out, "[");
                self.expr(idx);
                let _ = write!(self.out, "]");
            }
        }
        let _ = write!(self.out, " = ");
        self.expr(&a.expr);
    }

    fn call_expr(&mut self, c: &CallExpr) {
        let _ = write!(self.out, "{}(", c.fun_name.lexeme);
        for (i, arg) in c.args.iter().enumerate() {
            if i > 0 {
                let _ = write!(self.out, ", ");
            }
            self.expr(arg);
        }
        let _ = write!(self.out, ")");
    }

    fn expr(&mut self, e: &Expr) {
        if e.negated {
            let _ = write!(self.out, "not (");
        }
        self.expr_term(&e.first);
        if let Some(op) = &e.op {
            let _ = write!(self.out, " {} ", op.lexeme);
            if let Some(rest) = &e.rest {
                self.expr(rest);
            }
        }
        if e.negated {
            let _ = write!(self.out, ")");
        }
    }

    fn expr_term(&mut self, t: &ExprTerm) {
        match t {
            ExprTerm::Simple(s) => self.rvalue(&s.rvalue),
            ExprTerm::Complex(c) => {
                let _ = write!(self.out, "(");
                self.expr(&c.expr);
                let _ = write!(self.out, ")");
            }
        }
    }

    fn rvalue(&mut self, v: &RValue) {
        match v {
            RValue::Simple(s) => self.simple_rvalue(s),
            RValue::New(n) => self.new_rvalue(n),
            RValue::Var(v) => self.var_rvalue(v),
            RValue::Call(c) => self.call_expr(c),
        }
    }

    fn simple_rvalue(&mut self, v: &SimpleRValue) {
        match v.value.kind {
            tyro_lex::TokenKind::StringVal => {
                let _ = write!(self.out, "\"{}\"", v.value.lexeme);
            }
            tyro_lex::TokenKind::CharVal => {
                let _ = write!(self.out, "'{}'", v.value.lexeme);
            }
            _ => {
                let _ = write!(self.out, "{}", v.value.lexeme);
            }
        }
    }

    fn new_rvalue(&mut self, v: &NewRValue) {
        let _ = write!(self.out, "new {}", v.type_name.lexeme);
        if let Some(size) = &v.array_expr {
            let _ = write!(self.out, "[");
            self.expr(size);
            let _ = write!(self.out, "]");
        }
    }

    fn var_rvalue(&mut self, v: &VarRValue) {
        for (i, step) in v.path.iter().enumerate() {
            if i > 0 {
                let _ = write!(self.out, ".");
            }
            let _ = write!(self.out, "{}", step.var_name.lexeme);
            if let Some(idx) = &step.array_expr {
                let _ = write!(self.out, "[");
                self.expr(idx);
                let _ = write!(self.out, "]");
            }
            if step.is_method {
                let _ = write!(self.out, "(");
                for (j, arg) in step.method_params.iter().enumerate() {
                    if j > 0 {
                        let _ = write!(self.out, ", ");
                    }
                    self.expr(arg);
                }
                let _ = write!(self.out, ")");
            }
        }
    }
}

fn type_str(t: &DataType) -> String {
    if t.is_array {
        format!("array {}", t.type_name)
    } else {
        t.type_name.clone()
    }
}

/// Renders `program` back to indented source-like text.
pub fn pretty_print(program: &Program) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
    };
    printer.program(program);
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn pretty_prints_a_struct_and_main() {
        let program = parse("struct P { int x } void main() { P p = new P  p.x = 7 }").unwrap();
        let text = pretty_print(&program);
        assert!(text.contains("struct P {"));
        assert!(text.contains("void main() {"));
        assert!(text.contains("p.x = 7"));
    }

    #[test]
    fn pretty_prints_nested_if_else() {
        let program = parse("void main() { if (true) { print(1) } else { print(2) } }").unwrap();
        let text = pretty_print(&program);
        assert!(text.contains("if (true) {"));
        assert!(text.contains("else {"));
    }
}
