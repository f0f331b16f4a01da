//! Single-pass static checker: type existence, shadowing, visibility, and
//! the per-operator-category expression rules.

use tyro_lex::{Token, TokenKind};
use tyro_par::*;
use tyro_util::error::{StaticError, StaticResult};
use tyro_util::FxHashMap;

use crate::scope::SymbolTable;

const PRIMS: &[&str] = &["int", "double", "bool", "char", "string", "void"];
const BUILTIN_NAMES: &[&str] = &[
    "print",
    "input",
    "to_string",
    "to_int",
    "to_double",
    "length",
    "get",
    "concat",
];

/// Which `length`-family opcode a given `length(...)` call site lowers to.
/// Recorded here instead of rewriting the call's name in place, the way
/// the original checker mutated `fun_name.lexeme()` to `"length@array"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBuiltin {
    StringLength,
    ArrayLength,
}

fn prim(name: &str) -> DataType {
    DataType {
        is_array: false,
        type_name: name.to_string(),
    }
}

/// The result of a successful check: nothing about the AST changes, but
/// the code generator needs to know how each `length(...)` call resolved.
pub struct CheckedProgram {
    pub length_sites: FxHashMap<CallSiteId, ResolvedBuiltin>,
}

pub fn check_program(program: &Program) -> StaticResult<CheckedProgram> {
    let mut checker = SemanticChecker::new();
    checker.prescan(program)?;
    for s in &program.struct_defs {
        checker.check_struct_def(s)?;
    }
    for c in &program.class_defs {
        checker.check_class_def(c)?;
    }
    for f in &program.fun_defs {
        // A class's public methods are checked once, in class context,
        // inside `check_class_def`; the mirrored copy here only needs to
        // exist so free code can call it by name.
        if checker.mirrored_methods.contains(&f.fun_name.lexeme) {
            continue;
        }
        checker.check_fun_def(f)?;
    }
    Ok(CheckedProgram {
        length_sites: checker.length_sites,
    })
}

struct SemanticChecker {
    structs: FxHashMap<String, StructDef>,
    funs: FxHashMap<String, FunDef>,
    classes: FxHashMap<String, ClassDef>,
    symbols: SymbolTable,
    length_sites: FxHashMap<CallSiteId, ResolvedBuiltin>,
    /// Name of the class whose method body is currently being checked, so
    /// private member/method access can be permitted from within it.
    current_class: Option<String>,
    /// Names of every class's public methods. These are mirrored into
    /// `Program.fun_defs` by the parser so the code generator can emit
    /// their frames through the ordinary function path, but their bodies
    /// are only checked once, in class context, via `check_class_def`.
    mirrored_methods: std::collections::HashSet<String>,
}

impl SemanticChecker {
    fn new() -> Self {
        Self {
            structs: FxHashMap::default(),
            funs: FxHashMap::default(),
            classes: FxHashMap::default(),
            symbols: SymbolTable::new(),
            length_sites: FxHashMap::default(),
            current_class: None,
            mirrored_methods: std::collections::HashSet::new(),
        }
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> StaticError {
        StaticError::at(message, tok.span)
    }

    // ------------------------------------------------------------------
    // Pre-scan
    // ------------------------------------------------------------------

    fn prescan(&mut self, program: &Program) -> StaticResult<()> {
        for s in &program.struct_defs {
            if self.structs.contains_key(&s.struct_name.lexeme) {
                return Err(self.error_at(
                    &s.struct_name,
                    format!("struct '{}' is already defined", s.struct_name.lexeme),
                ));
            }
            self.structs.insert(s.struct_name.lexeme.clone(), s.clone());
        }
        for c in &program.class_defs {
            if self.classes.contains_key(&c.class_name.lexeme) {
                return Err(self.error_at(
                    &c.class_name,
                    format!("class '{}' is already defined", c.class_name.lexeme),
                ));
            }
            self.classes.insert(c.class_name.lexeme.clone(), c.clone());
            for m in &c.public_methods {
                self.mirrored_methods.insert(m.fun_name.lexeme.clone());
            }
        }
        for f in &program.fun_defs {
            if BUILTIN_NAMES.contains(&f.fun_name.lexeme.as_str()) {
                return Err(self.error_at(
                    &f.fun_name,
                    format!("'{}' redefines a built-in function", f.fun_name.lexeme),
                ));
            }
            if self.funs.contains_key(&f.fun_name.lexeme) {
                return Err(self.error_at(
                    &f.fun_name,
                    format!("function '{}' is already defined", f.fun_name.lexeme),
                ));
            }
            self.funs.insert(f.fun_name.lexeme.clone(), f.clone());
        }
        let main = self
            .funs
            .get("main")
            .ok_or_else(|| StaticError::plain("undefined 'main' function"))?;
        if !main.params.is_empty() {
            return Err(self.error_at(&main.fun_name, "'main' must take no parameters"));
        }
        if main.return_type.is_array || main.return_type.type_name != "void" {
            return Err(self.error_at(&main.fun_name, "'main' must return void"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    fn check_type_exists(&self, t: &DataType, at: &Token) -> StaticResult<()> {
        if PRIMS.contains(&t.type_name.as_str())
            || self.structs.contains_key(&t.type_name)
            || self.classes.contains_key(&t.type_name)
        {
            Ok(())
        } else {
            Err(self.error_at(at, format!("undefined type '{}'", t.type_name)))
        }
    }

    fn check_struct_def(&mut self, s: &StructDef) -> StaticResult<()> {
        let mut seen = std::collections::HashSet::new();
        for f in &s.fields {
            if !seen.insert(f.var_name.lexeme.clone()) {
                return Err(self.error_at(
                    &f.var_name,
                    format!("duplicate field '{}'", f.var_name.lexeme),
                ));
            }
            if !f.data_type.is_array && f.data_type.type_name == "void" {
                return Err(self.error_at(&f.var_name, "field cannot be void"));
            }
            self.check_type_exists(&f.data_type, &f.var_name)?;
        }
        Ok(())
    }

    fn check_class_def(&mut self, c: &ClassDef) -> StaticResult<()> {
        let mut seen_members = std::collections::HashSet::new();
        for m in c.public_members.iter().chain(c.private_members.iter()) {
            if !seen_members.insert(m.var_name.lexeme.clone()) {
                return Err(self.error_at(
                    &m.var_name,
                    format!("duplicate member '{}'", m.var_name.lexeme),
                ));
            }
            if !m.data_type.is_array && m.data_type.type_name == "void" {
                return Err(self.error_at(&m.var_name, "member cannot be void"));
            }
            self.check_type_exists(&m.data_type, &m.var_name)?;
        }
        let mut seen_methods = std::collections::HashSet::new();
        for m in c.public_methods.iter().chain(c.private_methods.iter()) {
            if !seen_methods.insert(m.fun_name.lexeme.clone()) {
                return Err(self.error_at(
                    &m.fun_name,
                    format!("duplicate method '{}'", m.fun_name.lexeme),
                ));
            }
        }
        let prev = self.current_class.replace(c.class_name.lexeme.clone());
        for m in c.public_methods.iter().chain(c.private_methods.iter()) {
            self.check_fun_def(m)?;
        }
        self.current_class = prev;
        Ok(())
    }

    fn check_fun_def(&mut self, f: &FunDef) -> StaticResult<()> {
        self.check_type_exists(&f.return_type, &f.fun_name)?;
        self.symbols.push_environment();
        self.symbols.add("return", f.return_type.clone());
        let mut seen = std::collections::HashSet::new();
        for p in &f.params {
            if !seen.insert(p.var_name.lexeme.clone()) {
                self.symbols.pop_environment();
                return Err(self.error_at(
                    &p.var_name,
                    format!("duplicate parameter '{}'", p.var_name.lexeme),
                ));
            }
            if !p.data_type.is_array && p.data_type.type_name == "void" {
                self.symbols.pop_environment();
                return Err(self.error_at(&p.var_name, "parameter cannot be void"));
            }
            if let Err(e) = self.check_type_exists(&p.data_type, &p.var_name) {
                self.symbols.pop_environment();
                return Err(e);
            }
            self.symbols.add(p.var_name.lexeme.clone(), p.data_type.clone());
        }
        for stmt in &f.stmts {
            if let Err(e) = self.check_stmt(stmt) {
                self.symbols.pop_environment();
                return Err(e);
            }
        }
        self.symbols.pop_environment();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn assignable(&self, declared: &DataType, actual: &DataType) -> bool {
        // `null` infers as the bottom type `void` and is assignable to any
        // declared type — the void-relaxation rule.
        if !actual.is_array && actual.type_name == "void" {
            return true;
        }
        declared == actual
    }

    fn check_stmt(&mut self, s: &Stmt) -> StaticResult<()> {
        match s {
            Stmt::Return(r) => {
                let t = self.expr_type(&r.expr)?;
                let expected = self
                    .symbols
                    .get("return")
                    .expect("return type is registered on function entry");
                if !self.assignable(&expected, &t) {
                    return Err(
                        self.error_at(r.expr.first_token(), "return value does not match declared return type")
                    );
                }
                Ok(())
            }
            Stmt::While(w) => {
                self.check_bool_expr(&w.condition, "while condition must be bool")?;
                self.symbols.push_environment();
                let result = w.stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
                self.symbols.pop_environment();
                result
            }
            Stmt::For(f) => {
                self.symbols.push_environment();
                let result = (|| {
                    self.check_vardecl(&f.var_decl)?;
                    self.check_bool_expr(&f.condition, "for condition must be bool")?;
                    self.check_assign(&f.assign_stmt)?;
                    f.stmts.iter().try_for_each(|stmt| self.check_stmt(stmt))
                })();
                self.symbols.pop_environment();
                result
            }
            Stmt::If(i) => {
                self.check_basic_if(&i.if_part)?;
                for ei in &i.else_ifs {
                    self.check_basic_if(ei)?;
                }
                self.symbols.push_environment();
                let result = i.else_stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
                self.symbols.pop_environment();
                result
            }
            Stmt::VarDecl(v) => self.check_vardecl(v),
            Stmt::Assign(a) => self.check_assign(a),
            Stmt::Call(c) => self.check_call_expr(c).map(|_| ()),
        }
    }

    fn check_bool_expr(&mut self, e: &Expr, message: &str) -> StaticResult<()> {
        let t = self.expr_type(e)?;
        if t.is_array || t.type_name != "bool" {
            return Err(self.error_at(e.first_token(), message));
        }
        Ok(())
    }

    fn check_basic_if(&mut self, b: &BasicIf) -> StaticResult<()> {
        self.check_bool_expr(&b.condition, "if condition must be bool")?;
        self.symbols.push_environment();
        let result = b.stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
        self.symbols.pop_environment();
        result
    }

    fn check_vardecl(&mut self, v: &VarDeclStmt) -> StaticResult<()> {
        let name = &v.var_def.var_name.lexeme;
        if self.symbols.name_exists_in_curr_env(name) {
            return Err(self.error_at(
                &v.var_def.var_name,
                format!("'{name}' is already declared in this scope"),
            ));
        }
        self.check_type_exists(&v.var_def.data_type, &v.var_def.var_name)?;
        let rhs_ty = self.expr_type(&v.expr)?;
        if let Some(op) = &v.expr.op {
            if !matches!(
                op.kind,
                TokenKind::Plus | TokenKind::Minus | TokenKind::Times | TokenKind::Divide
            ) && v.var_def.data_type.type_name != "bool"
            {
                return Err(self.error_at(op, "result of a non-arithmetic expression must be declared bool"));
            }
        }
        if !self.assignable(&v.var_def.data_type, &rhs_ty) {
            return Err(self.error_at(
                &v.var_def.var_name,
                "initializer does not match the declared type",
            ));
        }
        self.symbols.add(name.clone(), v.var_def.data_type.clone());
        Ok(())
    }

    fn check_assign(&mut self, a: &AssignStmt) -> StaticResult<()> {
        let declared = self.resolve_path(&a.lvalue)?;
        let rhs_ty = self.expr_type(&a.expr)?;
        if !self.assignable(&declared, &rhs_ty) {
            return Err(self.error_at(&a.lvalue[0].var_name, "assignment type mismatch"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paths: struct fields, class members/methods, array indices
    // ------------------------------------------------------------------

    fn get_field(&self, struct_name: &str, field_name: &str) -> Option<DataType> {
        self.structs.get(struct_name).and_then(|s| {
            s.fields
                .iter()
                .find(|f| f.var_name.lexeme == field_name)
                .map(|f| f.data_type.clone())
        })
    }

    fn get_member(&self, class_name: &str, member_name: &str) -> Option<(DataType, bool)> {
        let c = self.classes.get(class_name)?;
        if let Some(m) = c.public_members.iter().find(|m| m.var_name.lexeme == member_name) {
            return Some((m.data_type.clone(), false));
        }
        c.private_members
            .iter()
            .find(|m| m.var_name.lexeme == member_name)
            .map(|m| (m.data_type.clone(), true))
    }

    fn get_method(&self, class_name: &str, method_name: &str) -> Option<(FunDef, bool)> {
        let c = self.classes.get(class_name)?;
        if let Some(m) = c.public_methods.iter().find(|m| m.fun_name.lexeme == method_name) {
            return Some((m.clone(), false));
        }
        c.private_methods
            .iter()
            .find(|m| m.fun_name.lexeme == method_name)
            .map(|m| (m.clone(), true))
    }

    fn resolve_implicit_member(&mut self, head: &VarRef) -> StaticResult<DataType> {
        let class_name = self.current_class.clone().ok_or_else(|| {
            self.error_at(&head.var_name, format!("undefined variable '{}'", head.var_name.lexeme))
        })?;
        if let Some((member_ty, _is_private)) = self.get_member(&class_name, &head.var_name.lexeme) {
            return Ok(member_ty);
        }
        if head.is_method {
            if let Some((method, _is_private)) = self.get_method(&class_name, &head.var_name.lexeme) {
                self.check_args(&method.params, &head.method_params, &head.var_name)?;
                return Ok(method.return_type);
            }
        }
        Err(self.error_at(&head.var_name, format!("undefined variable '{}'", head.var_name.lexeme)))
    }

    fn apply_index(&mut self, step: &VarRef, ty: DataType) -> StaticResult<DataType> {
        match &step.array_expr {
            None => Ok(ty),
            Some(index_expr) => {
                if !ty.is_array {
                    return Err(self.error_at(&step.var_name, format!("'{}' is not an array", step.var_name.lexeme)));
                }
                let idx_ty = self.expr_type(index_expr)?;
                if idx_ty.is_array || idx_ty.type_name != "int" {
                    return Err(self.error_at(&step.var_name, "array index must be an int"));
                }
                Ok(DataType {
                    is_array: false,
                    type_name: ty.type_name,
                })
            }
        }
    }

    /// Resolves a dotted/indexed access path (an lvalue or a `VarRValue`)
    /// to the static type of its final step.
    fn resolve_path(&mut self, path: &[VarRef]) -> StaticResult<DataType> {
        let head = &path[0];
        let mut curr_type = match self.symbols.get(&head.var_name.lexeme) {
            Some(t) => t,
            // Not a local: inside a method body, a bare name can refer to
            // the enclosing class's own member or method implicitly.
            None => self.resolve_implicit_member(head)?,
        };
        curr_type = self.apply_index(head, curr_type)?;

        for step in &path[1..] {
            if curr_type.is_array {
                return Err(self.error_at(&step.var_name, "cannot access a member through an array"));
            }
            let owner = curr_type.type_name.clone();
            if let Some(field_ty) = self.get_field(&owner, &step.var_name.lexeme) {
                curr_type = self.apply_index(step, field_ty)?;
            } else if let Some((member_ty, is_private)) = self.get_member(&owner, &step.var_name.lexeme) {
                if is_private && self.current_class.as_deref() != Some(owner.as_str()) {
                    return Err(StaticError::plain(format!(
                        "member '{}' is private",
                        step.var_name.lexeme
                    )));
                }
                curr_type = self.apply_index(step, member_ty)?;
            } else if step.is_method {
                let (method, is_private) = self.get_method(&owner, &step.var_name.lexeme).ok_or_else(|| {
                    self.error_at(&step.var_name, format!("undefined method '{}'", step.var_name.lexeme))
                })?;
                if is_private && self.current_class.as_deref() != Some(owner.as_str()) {
                    return Err(StaticError::plain(format!(
                        "method '{}' is private",
                        step.var_name.lexeme
                    )));
                }
                self.check_args(&method.params, &step.method_params, &step.var_name)?;
                curr_type = method.return_type;
            } else {
                return Err(self.error_at(
                    &step.var_name,
                    format!("'{}' has no field or member named '{}'", owner, step.var_name.lexeme),
                ));
            }
        }
        Ok(curr_type)
    }

    fn check_args(&mut self, params: &[VarDef], args: &[Expr], at: &Token) -> StaticResult<()> {
        if params.len() != args.len() {
            return Err(self.error_at(
                at,
                format!("expected {} argument(s), found {}", params.len(), args.len()),
            ));
        }
        for (param, arg) in params.iter().zip(args.iter()) {
            let arg_ty = self.expr_type(arg)?;
            if !self.assignable(&param.data_type, &arg_ty) {
                return Err(self.error_at(
                    at,
                    format!("argument type does not match parameter '{}'", param.var_name.lexeme),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_type(&mut self, e: &Expr) -> StaticResult<DataType> {
        let mut curr = self.term_type(&e.first)?;
        if let (Some(op), Some(rest)) = (&e.op, &e.rest) {
            let rest_ty = self.expr_type(rest)?;
            curr = self.check_binop(op, &curr, &rest_ty)?;
        }
        if e.negated && (curr.is_array || curr.type_name != "bool") {
            return Err(self.error_at(e.first_token(), "negated expression must be bool"));
        }
        Ok(curr)
    }

    fn term_type(&mut self, term: &ExprTerm) -> StaticResult<DataType> {
        match term {
            ExprTerm::Simple(t) => self.rvalue_type(&t.rvalue),
            ExprTerm::Complex(t) => {
                let inner = self.expr_type(&t.expr)?;
                // A parenthesized term whose inner expression carries a
                // non-arithmetic operator is itself treated as bool —
                // mirroring how a comparison/logical/equality result is
                // the only thing that makes sense to group this way.
                if let Some(op) = &t.expr.op {
                    if !matches!(
                        op.kind,
                        TokenKind::Plus | TokenKind::Minus | TokenKind::Times | TokenKind::Divide
                    ) {
                        return Ok(prim("bool"));
                    }
                }
                Ok(inner)
            }
        }
    }

    fn literal_type(&self, tok: &Token) -> DataType {
        let name = match tok.kind {
            TokenKind::IntVal => "int",
            TokenKind::DoubleVal => "double",
            TokenKind::BoolVal => "bool",
            TokenKind::CharVal => "char",
            TokenKind::StringVal => "string",
            _ => "void",
        };
        prim(name)
    }

    fn rvalue_type(&mut self, r: &RValue) -> StaticResult<DataType> {
        match r {
            RValue::Simple(v) => Ok(self.literal_type(&v.value)),
            RValue::New(v) => self.new_rvalue_type(v),
            RValue::Var(v) => self.resolve_path(&v.path),
            RValue::Call(c) => self.check_call_expr(c),
        }
    }

    fn new_rvalue_type(&mut self, v: &NewRValue) -> StaticResult<DataType> {
        let name = v.type_name.lexeme.clone();
        if !(PRIMS.contains(&name.as_str())
            || self.structs.contains_key(&name)
            || self.classes.contains_key(&name))
        {
            return Err(self.error_at(&v.type_name, format!("undefined type '{name}'")));
        }
        match &v.array_expr {
            Some(size_expr) => {
                let size_ty = self.expr_type(size_expr)?;
                if size_ty.is_array || size_ty.type_name != "int" {
                    return Err(self.error_at(&v.type_name, "array size must be an int"));
                }
                Ok(DataType {
                    is_array: true,
                    type_name: name,
                })
            }
            None => Ok(DataType {
                is_array: false,
                type_name: name,
            }),
        }
    }

    fn check_binop(&self, op: &Token, lhs: &DataType, rhs: &DataType) -> StaticResult<DataType> {
        match op.kind {
            TokenKind::Plus
                if !lhs.is_array && !rhs.is_array && lhs.type_name == "string" && rhs.type_name == "string" =>
            {
                Ok(prim("string"))
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Times | TokenKind::Divide => {
                if lhs.is_array
                    || rhs.is_array
                    || lhs.type_name != rhs.type_name
                    || !matches!(lhs.type_name.as_str(), "int" | "double")
                {
                    return Err(self.error_at(op, "arithmetic requires two operands of the same numeric type"));
                }
                Ok(lhs.clone())
            }
            TokenKind::Less | TokenKind::Greater | TokenKind::LessEq | TokenKind::GreaterEq => {
                if lhs.is_array
                    || rhs.is_array
                    || lhs.type_name != rhs.type_name
                    || !matches!(lhs.type_name.as_str(), "int" | "double" | "string")
                {
                    return Err(self.error_at(op, "comparison requires two operands of the same orderable type"));
                }
                Ok(prim("bool"))
            }
            TokenKind::Equal | TokenKind::NotEqual => {
                let lhs_null = !lhs.is_array && lhs.type_name == "void";
                let rhs_null = !rhs.is_array && rhs.type_name == "void";
                if !lhs_null && !rhs_null && (lhs.is_array != rhs.is_array || lhs.type_name != rhs.type_name) {
                    return Err(self.error_at(op, "equality requires two operands of the same type"));
                }
                Ok(prim("bool"))
            }
            TokenKind::And | TokenKind::Or => {
                if lhs.is_array || rhs.is_array || lhs.type_name != "bool" || rhs.type_name != "bool" {
                    return Err(self.error_at(op, "logical operators require bool operands"));
                }
                Ok(prim("bool"))
            }
            _ => Err(self.error_at(op, "unsupported binary operator")),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn expect_arity(&self, call: &CallExpr, n: usize) -> StaticResult<()> {
        if call.args.len() != n {
            Err(self.error_at(
                &call.fun_name,
                format!(
                    "'{}' expects {n} argument(s), found {}",
                    call.fun_name.lexeme,
                    call.args.len()
                ),
            ))
        } else {
            Ok(())
        }
    }

    fn expect_one_of(&self, t: &DataType, names: &[&str], at: &Token) -> StaticResult<()> {
        if t.is_array || !names.contains(&t.type_name.as_str()) {
            Err(self.error_at(at, format!("unexpected argument type '{}'", t.type_name)))
        } else {
            Ok(())
        }
    }

    fn check_call_expr(&mut self, call: &CallExpr) -> StaticResult<DataType> {
        match call.fun_name.lexeme.as_str() {
            "print" => {
                self.expect_arity(call, 1)?;
                let t = self.expr_type(&call.args[0])?;
                self.expect_one_of(&t, &["int", "double", "bool", "char", "string"], &call.fun_name)?;
                Ok(prim("void"))
            }
            "input" => {
                self.expect_arity(call, 0)?;
                Ok(prim("string"))
            }
            "to_string" => {
                self.expect_arity(call, 1)?;
                let t = self.expr_type(&call.args[0])?;
                self.expect_one_of(&t, &["int", "double", "bool", "char"], &call.fun_name)?;
                Ok(prim("string"))
            }
            "to_int" => {
                self.expect_arity(call, 1)?;
                let t = self.expr_type(&call.args[0])?;
                self.expect_one_of(&t, &["string", "double"], &call.fun_name)?;
                Ok(prim("int"))
            }
            "to_double" => {
                self.expect_arity(call, 1)?;
                let t = self.expr_type(&call.args[0])?;
                self.expect_one_of(&t, &["string", "int"], &call.fun_name)?;
                Ok(prim("double"))
            }
            "length" => {
                self.expect_arity(call, 1)?;
                let t = self.expr_type(&call.args[0])?;
                if t.is_array {
                    self.length_sites.insert(call.id, ResolvedBuiltin::ArrayLength);
                } else if t.type_name == "string" {
                    self.length_sites.insert(call.id, ResolvedBuiltin::StringLength);
                } else {
                    return Err(self.error_at(&call.fun_name, "'length' expects a string or array argument"));
                }
                Ok(prim("int"))
            }
            "get" => {
                self.expect_arity(call, 2)?;
                let idx_ty = self.expr_type(&call.args[0])?;
                let str_ty = self.expr_type(&call.args[1])?;
                self.expect_one_of(&idx_ty, &["int"], &call.fun_name)?;
                self.expect_one_of(&str_ty, &["string"], &call.fun_name)?;
                Ok(prim("char"))
            }
            "concat" => {
                self.expect_arity(call, 2)?;
                let a = self.expr_type(&call.args[0])?;
                let b = self.expr_type(&call.args[1])?;
                self.expect_one_of(&a, &["string"], &call.fun_name)?;
                self.expect_one_of(&b, &["string"], &call.fun_name)?;
                Ok(prim("string"))
            }
            name => {
                let fun = self
                    .funs
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.error_at(&call.fun_name, format!("undefined function '{name}'")))?;
                self.check_args(&fun.params, &call.args, &call.fun_name)?;
                Ok(fun.return_type)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyro_par::parse;

    fn check(src: &str) -> StaticResult<CheckedProgram> {
        let program = parse(src).expect("parse should succeed");
        check_program(&program)
    }

    #[test]
    fn minimal_main_is_accepted() {
        assert!(check("void main() { }").is_ok());
    }

    #[test]
    fn missing_main_is_rejected() {
        assert!(check("void other() { }").is_err());
    }

    #[test]
    fn var_decl_and_use() {
        assert!(check("void main() { int x = 1  print(to_string(x)) }").is_ok());
    }

    #[test]
    fn shadow_in_same_scope_is_rejected() {
        let err = check("void main() { int x = 1  int x = 2 }").unwrap_err();
        assert!(err.to_string().contains("already declared"));
    }

    #[test]
    fn arithmetic_type_mismatch_is_rejected() {
        assert!(check("void main() { int x = 1 + 1.0 }").is_err());
    }

    #[test]
    fn plus_concatenates_two_strings() {
        assert!(check("void main() { string s = \"3\" + \"4\" }").is_ok());
    }

    #[test]
    fn plus_rejects_string_and_int() {
        assert!(check("void main() { string s = \"3\" + 4 }").is_err());
    }

    #[test]
    fn null_satisfies_any_declared_type() {
        assert!(check("struct S { int x } void main() { S s = null }").is_ok());
    }

    #[test]
    fn while_condition_must_be_bool() {
        assert!(check("void main() { while (1) { } }").is_err());
    }

    #[test]
    fn struct_field_access_through_path() {
        let src = "struct P { int x } void main() { P p = new P  p.x = 5 }";
        assert!(check(src).is_ok());
    }

    #[test]
    fn private_member_is_rejected_from_outside() {
        let src = "class C { private: int x public: void noop() { } } \
                   void main() { C c = new C  c.x = 1 }";
        let err = check(src).unwrap_err();
        assert!(err.to_string().contains("private"));
    }

    #[test]
    fn private_member_is_accepted_from_inside() {
        let src = "class C { private: int x public: void setX() { x = 1 } }";
        assert!(check(src).is_ok());
    }

    #[test]
    fn length_resolves_string_and_array_distinctly() {
        let src = "void main() { \
            string s = \"hi\" \
            array int xs = new int[3] \
            int a = length(s) \
            int b = length(xs) \
        }";
        let checked = check(src).unwrap();
        let mut kinds: Vec<_> = checked.length_sites.values().copied().collect();
        kinds.sort_by_key(|k| matches!(k, ResolvedBuiltin::ArrayLength));
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&ResolvedBuiltin::StringLength));
        assert!(kinds.contains(&ResolvedBuiltin::ArrayLength));
    }

    #[test]
    fn array_index_must_be_int() {
        let src = "void main() { array int xs = new int[3]  xs[\"a\"] = 1 }";
        assert!(check(src).is_err());
    }

    #[test]
    fn function_call_arity_mismatch() {
        let src = "void helper(int x) { } void main() { helper() }";
        assert!(check(src).is_err());
    }
}
