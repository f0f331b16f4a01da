//! Lowers a checked [`Program`] to one [`FrameInfo`] per function.
//!
//! The generator walks the same path-shaped access expressions
//! (`VarRValue`, `AssignStmt::lvalue`) the semantic checker resolves, and
//! keeps its own `SymbolTable` of local variable types so it can tell a
//! struct field access (`GETF`/`SETF`) from a class member access
//! (`GETMEM`/`SETMEM`) without re-deriving the whole program's types from
//! scratch. The program is assumed already checked: a mismatch here is a
//! checker bug, not a user error, so these paths use `expect` rather than
//! threading a `Result`.

use indexmap::IndexMap;
use tyro_lex::TokenKind;
use tyro_par::*;
use tyro_sem::{CheckedProgram, ResolvedBuiltin, SymbolTable};
use tyro_util::FxHashMap;

use crate::instr::{FrameInfo, Instruction};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vartable::VarTable;

/// Compiles every function in `program` to bytecode, in declaration
/// order. `checked` supplies the `length`-call resolution table the
/// semantic checker built.
pub fn generate(program: &Program, checked: &CheckedProgram) -> IndexMap<String, FrameInfo> {
    let mut gen = CodeGenerator::new(program, checked);
    for f in &program.fun_defs {
        gen.visit_fun_def(f);
    }
    gen.frames
}

fn elem_type(ty: &DataType) -> DataType {
    DataType {
        is_array: false,
        type_name: ty.type_name.clone(),
    }
}

struct CodeGenerator {
    structs: FxHashMap<String, StructDef>,
    classes: FxHashMap<String, ClassDef>,
    length_sites: FxHashMap<CallSiteId, ResolvedBuiltin>,
    frames: IndexMap<String, FrameInfo>,
    var_table: VarTable,
    types: SymbolTable,
}

impl CodeGenerator {
    fn new(program: &Program, checked: &CheckedProgram) -> Self {
        let mut structs = FxHashMap::default();
        for s in &program.struct_defs {
            structs.insert(s.struct_name.lexeme.clone(), s.clone());
        }
        let mut classes = FxHashMap::default();
        for c in &program.class_defs {
            classes.insert(c.class_name.lexeme.clone(), c.clone());
        }
        Self {
            structs,
            classes,
            length_sites: checked.length_sites.clone(),
            frames: IndexMap::new(),
            var_table: VarTable::new(),
            types: SymbolTable::new(),
        }
    }

    fn push_scope(&mut self) {
        self.var_table.push_environment();
        self.types.push_environment();
    }

    fn pop_scope(&mut self) {
        self.var_table.pop_environment();
        self.types.pop_environment();
    }

    fn declare(&mut self, name: String, ty: DataType) -> usize {
        let idx = self.var_table.add(name.clone());
        self.types.add(name, ty);
        idx
    }

    fn slot_of(&self, name: &str) -> usize {
        self.var_table
            .get(name)
            .unwrap_or_else(|| panic!("codegen: '{name}' has no assigned slot"))
    }

    fn type_of(&self, name: &str) -> DataType {
        self.types
            .get(name)
            .unwrap_or_else(|| panic!("codegen: '{name}' has no tracked type"))
    }

    fn is_struct(&self, type_name: &str) -> bool {
        self.structs.contains_key(type_name)
    }

    fn member_type(&self, owner: &str, name: &str) -> DataType {
        if let Some(s) = self.structs.get(owner) {
            if let Some(f) = s.fields.iter().find(|f| f.var_name.lexeme == name) {
                return f.data_type.clone();
            }
        }
        if let Some(c) = self.classes.get(owner) {
            if let Some(m) = c
                .public_members
                .iter()
                .chain(c.private_members.iter())
                .find(|m| m.var_name.lexeme == name)
            {
                return m.data_type.clone();
            }
            if let Some(m) = c
                .public_methods
                .iter()
                .chain(c.private_methods.iter())
                .find(|m| m.fun_name.lexeme == name)
            {
                return m.return_type.clone();
            }
        }
        panic!("codegen: '{owner}' has no field, member, or method named '{name}'")
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn visit_fun_def(&mut self, f: &FunDef) {
        let mut instrs = Vec::new();
        self.var_table = VarTable::new();
        self.types = SymbolTable::new();
        self.push_scope();
        for p in &f.params {
            let idx = self.declare(p.var_name.lexeme.clone(), p.data_type.clone());
            instrs.push(Instruction::with_operand(OpCode::Store, Value::Int(idx as i64)));
        }
        for stmt in &f.stmts {
            self.visit_stmt(stmt, &mut instrs);
        }
        if !matches!(instrs.last().map(|i| i.opcode), Some(OpCode::Ret)) {
            instrs.push(Instruction::with_operand(OpCode::Push, Value::Null));
            instrs.push(Instruction::new(OpCode::Ret));
        }
        self.pop_scope();
        self.frames.insert(
            f.fun_name.lexeme.clone(),
            FrameInfo {
                function_name: f.fun_name.lexeme.clone(),
                arg_count: f.params.len(),
                instructions: instrs,
            },
        );
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn visit_stmt(&mut self, s: &Stmt, instrs: &mut Vec<Instruction>) {
        match s {
            Stmt::Return(r) => {
                self.visit_expr(&r.expr, instrs);
                instrs.push(Instruction::new(OpCode::Ret));
            }
            Stmt::While(w) => self.visit_while(w, instrs),
            Stmt::For(fs) => self.visit_for(fs, instrs),
            Stmt::If(i) => self.visit_if(i, instrs),
            Stmt::VarDecl(v) => self.visit_vardecl(v, instrs),
            Stmt::Assign(a) => self.visit_assign(a, instrs),
            Stmt::Call(c) => self.visit_call(c, instrs),
        }
    }

    fn visit_while(&mut self, w: &WhileStmt, instrs: &mut Vec<Instruction>) {
        let top = instrs.len();
        self.visit_expr(&w.condition, instrs);
        let jmpf_idx = instrs.len();
        instrs.push(Instruction::with_operand(OpCode::Jmpf, Value::Int(0)));
        self.push_scope();
        for stmt in &w.stmts {
            self.visit_stmt(stmt, instrs);
        }
        self.pop_scope();
        instrs.push(Instruction::with_operand(OpCode::Jmp, Value::Int(top as i64)));
        let nop_idx = instrs.len();
        instrs.push(Instruction::new(OpCode::Nop));
        instrs[jmpf_idx].operand = Some(Value::Int(nop_idx as i64));
    }

    fn visit_for(&mut self, f: &ForStmt, instrs: &mut Vec<Instruction>) {
        self.push_scope();
        self.visit_vardecl(&f.var_decl, instrs);
        let top = instrs.len();
        self.visit_expr(&f.condition, instrs);
        let jmpf_idx = instrs.len();
        instrs.push(Instruction::with_operand(OpCode::Jmpf, Value::Int(0)));
        self.push_scope();
        for stmt in &f.stmts {
            self.visit_stmt(stmt, instrs);
        }
        self.pop_scope();
        self.visit_assign(&f.assign_stmt, instrs);
        instrs.push(Instruction::with_operand(OpCode::Jmp, Value::Int(top as i64)));
        let nop_idx = instrs.len();
        instrs.push(Instruction::new(OpCode::Nop));
        instrs[jmpf_idx].operand = Some(Value::Int(nop_idx as i64));
        self.pop_scope();
    }

    /// All branches (the `if`, every `else if`, and the implicit fallthrough
    /// past a trailing `else`) converge on one final `NOP`, so exactly one
    /// branch's statements ever run.
    fn visit_if(&mut self, i: &IfStmt, instrs: &mut Vec<Instruction>) {
        let mut end_jmps = Vec::new();

        self.visit_basic_if(&i.if_part, instrs, &mut end_jmps);
        for ei in &i.else_ifs {
            self.visit_basic_if(ei, instrs, &mut end_jmps);
        }
        if !i.else_stmts.is_empty() {
            self.push_scope();
            for stmt in &i.else_stmts {
                self.visit_stmt(stmt, instrs);
            }
            self.pop_scope();
        }

        let nop_idx = instrs.len();
        instrs.push(Instruction::new(OpCode::Nop));
        for idx in end_jmps {
            instrs[idx].operand = Some(Value::Int(nop_idx as i64));
        }
    }

    fn visit_basic_if(&mut self, b: &BasicIf, instrs: &mut Vec<Instruction>, end_jmps: &mut Vec<usize>) {
        self.visit_expr(&b.condition, instrs);
        let jmpf_idx = instrs.len();
        instrs.push(Instruction::with_operand(OpCode::Jmpf, Value::Int(0)));
        self.push_scope();
        for stmt in &b.stmts {
            self.visit_stmt(stmt, instrs);
        }
        self.pop_scope();
        end_jmps.push(instrs.len());
        instrs.push(Instruction::with_operand(OpCode::Jmp, Value::Int(0)));
        instrs[jmpf_idx].operand = Some(Value::Int(instrs.len() as i64));
    }

    fn visit_vardecl(&mut self, v: &VarDeclStmt, instrs: &mut Vec<Instruction>) {
        self.visit_expr(&v.expr, instrs);
        let idx = self.declare(v.var_def.var_name.lexeme.clone(), v.var_def.data_type.clone());
        instrs.push(Instruction::with_operand(OpCode::Store, Value::Int(idx as i64)));
    }

    /// Lowers `lvalue = expr`. A one-element path with no array index is a
    /// plain local `STORE`; anything longer walks the path loading each
    /// intermediate container, then emits `SETI`/`SETF`/`SETMEM` for the
    /// final step depending on whether it indexes an array and whether its
    /// owner is a struct or a class.
    fn visit_assign(&mut self, a: &AssignStmt, instrs: &mut Vec<Instruction>) {
        let path = &a.lvalue;
        let head = &path[0];

        if path.len() == 1 && head.array_expr.is_none() {
            self.visit_expr(&a.expr, instrs);
            let idx = self.slot_of(&head.var_name.lexeme);
            instrs.push(Instruction::with_operand(OpCode::Store, Value::Int(idx as i64)));
            return;
        }

        let head_idx = self.slot_of(&head.var_name.lexeme);
        instrs.push(Instruction::with_operand(OpCode::Load, Value::Int(head_idx as i64)));
        let mut curr_type = self.type_of(&head.var_name.lexeme);

        if path.len() == 1 {
            let index_expr = head.array_expr.as_ref().expect("path.len() == 1 with no head index handled above");
            self.visit_expr(index_expr, instrs);
            self.visit_expr(&a.expr, instrs);
            instrs.push(Instruction::new(OpCode::SetI));
            return;
        }

        if let Some(index_expr) = &head.array_expr {
            self.visit_expr(index_expr, instrs);
            instrs.push(Instruction::new(OpCode::GetI));
            curr_type = elem_type(&curr_type);
        }

        for step in &path[1..path.len() - 1] {
            let get_op = if self.is_struct(&curr_type.type_name) {
                OpCode::GetF
            } else {
                OpCode::GetMem
            };
            instrs.push(Instruction::with_operand(get_op, Value::Str(step.var_name.lexeme.clone())));
            curr_type = self.member_type(&curr_type.type_name, &step.var_name.lexeme);
            if let Some(index_expr) = &step.array_expr {
                self.visit_expr(index_expr, instrs);
                instrs.push(Instruction::new(OpCode::GetI));
                curr_type = elem_type(&curr_type);
            }
        }

        let last = &path[path.len() - 1];
        if let Some(index_expr) = &last.array_expr {
            let get_op = if self.is_struct(&curr_type.type_name) {
                OpCode::GetF
            } else {
                OpCode::GetMem
            };
            instrs.push(Instruction::with_operand(get_op, Value::Str(last.var_name.lexeme.clone())));
            self.visit_expr(index_expr, instrs);
            self.visit_expr(&a.expr, instrs);
            instrs.push(Instruction::new(OpCode::SetI));
        } else {
            self.visit_expr(&a.expr, instrs);
            let set_op = if self.is_struct(&curr_type.type_name) {
                OpCode::SetF
            } else {
                OpCode::SetMem
            };
            instrs.push(Instruction::with_operand(set_op, Value::Str(last.var_name.lexeme.clone())));
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn visit_expr(&mut self, e: &Expr, instrs: &mut Vec<Instruction>) {
        self.visit_term(&e.first, instrs);
        if let (Some(op), Some(rest)) = (&e.op, &e.rest) {
            self.visit_expr(rest, instrs);
            instrs.push(Instruction::new(binop_opcode(op)));
        }
        if e.negated {
            instrs.push(Instruction::new(OpCode::Not));
        }
    }

    fn visit_term(&mut self, term: &ExprTerm, instrs: &mut Vec<Instruction>) {
        match term {
            ExprTerm::Simple(t) => self.visit_rvalue(&t.rvalue, instrs),
            ExprTerm::Complex(t) => self.visit_expr(&t.expr, instrs),
        }
    }

    fn visit_rvalue(&mut self, r: &RValue, instrs: &mut Vec<Instruction>) {
        match r {
            RValue::Simple(v) => self.visit_simple_rvalue(v, instrs),
            RValue::New(v) => self.visit_new_rvalue(v, instrs),
            RValue::Var(v) => self.visit_var_rvalue(v, instrs),
            RValue::Call(c) => self.visit_call(c, instrs),
        }
    }

    fn visit_simple_rvalue(&mut self, v: &SimpleRValue, instrs: &mut Vec<Instruction>) {
        let value = match v.value.kind {
            TokenKind::IntVal => {
                Value::Int(v.value.lexeme.parse().expect("lexer guarantees a valid int literal"))
            }
            TokenKind::DoubleVal => {
                Value::Double(v.value.lexeme.parse().expect("lexer guarantees a valid double literal"))
            }
            TokenKind::BoolVal => Value::Bool(v.value.lexeme == "true"),
            TokenKind::StringVal | TokenKind::CharVal => Value::Str(unescape(&v.value.lexeme)),
            TokenKind::NullVal => Value::Null,
            _ => unreachable!("parser only builds SimpleRValue from literal tokens"),
        };
        instrs.push(Instruction::with_operand(OpCode::Push, value));
    }

    /// `new Type[size]` lowers to a single `ALLOCA`; `new Struct`/`new
    /// Class` allocates, then initializes every field/member to `null`
    /// one at a time, leaving the new instance's heap id on the stack as
    /// the expression's value.
    fn visit_new_rvalue(&mut self, v: &NewRValue, instrs: &mut Vec<Instruction>) {
        let name = &v.type_name.lexeme;
        if let Some(size_expr) = &v.array_expr {
            self.visit_expr(size_expr, instrs);
            instrs.push(Instruction::with_operand(OpCode::Push, Value::Null));
            instrs.push(Instruction::new(OpCode::Alloca));
            return;
        }
        if let Some(s) = self.structs.get(name).cloned() {
            instrs.push(Instruction::new(OpCode::Allocs));
            for field in &s.fields {
                instrs.push(Instruction::new(OpCode::Dup));
                instrs.push(Instruction::with_operand(OpCode::AddF, Value::Str(field.var_name.lexeme.clone())));
                instrs.push(Instruction::new(OpCode::Dup));
                instrs.push(Instruction::with_operand(OpCode::Push, Value::Null));
                instrs.push(Instruction::with_operand(OpCode::SetF, Value::Str(field.var_name.lexeme.clone())));
            }
            return;
        }
        if let Some(c) = self.classes.get(name).cloned() {
            instrs.push(Instruction::new(OpCode::Allocc));
            for member in c.private_members.iter().chain(c.public_members.iter()) {
                instrs.push(Instruction::new(OpCode::Dup));
                instrs.push(Instruction::with_operand(OpCode::AddMem, Value::Str(member.var_name.lexeme.clone())));
                instrs.push(Instruction::new(OpCode::Dup));
                instrs.push(Instruction::with_operand(OpCode::Push, Value::Null));
                instrs.push(Instruction::with_operand(OpCode::SetMem, Value::Str(member.var_name.lexeme.clone())));
            }
            return;
        }
        panic!("codegen: 'new {name}' names neither a struct nor a class");
    }

    /// Reads through a dotted/indexed path, ending either with the final
    /// field/member's value on the stack or, if the last step is a method
    /// call, with its arguments pushed and a `CALL` emitted.
    fn visit_var_rvalue(&mut self, v: &VarRValue, instrs: &mut Vec<Instruction>) {
        let head = &v.path[0];
        let head_idx = self.slot_of(&head.var_name.lexeme);
        instrs.push(Instruction::with_operand(OpCode::Load, Value::Int(head_idx as i64)));
        let mut curr_type = self.type_of(&head.var_name.lexeme);
        if let Some(index_expr) = &head.array_expr {
            self.visit_expr(index_expr, instrs);
            instrs.push(Instruction::new(OpCode::GetI));
            curr_type = elem_type(&curr_type);
        }

        for step in &v.path[1..] {
            if step.is_method {
                for arg in &step.method_params {
                    self.visit_expr(arg, instrs);
                }
                instrs.push(Instruction::with_operand(OpCode::Call, Value::Str(step.var_name.lexeme.clone())));
                continue;
            }
            let get_op = if self.is_struct(&curr_type.type_name) {
                OpCode::GetF
            } else {
                OpCode::GetMem
            };
            instrs.push(Instruction::with_operand(get_op, Value::Str(step.var_name.lexeme.clone())));
            curr_type = self.member_type(&curr_type.type_name, &step.var_name.lexeme);
            if let Some(index_expr) = &step.array_expr {
                self.visit_expr(index_expr, instrs);
                instrs.push(Instruction::new(OpCode::GetI));
                curr_type = elem_type(&curr_type);
            }
        }
    }

    fn visit_call(&mut self, c: &CallExpr, instrs: &mut Vec<Instruction>) {
        for arg in &c.args {
            self.visit_expr(arg, instrs);
        }
        match c.fun_name.lexeme.as_str() {
            "print" => instrs.push(Instruction::new(OpCode::Write)),
            "input" => instrs.push(Instruction::new(OpCode::Read)),
            "to_string" => instrs.push(Instruction::new(OpCode::ToStr)),
            "to_int" => instrs.push(Instruction::new(OpCode::ToInt)),
            "to_double" => instrs.push(Instruction::new(OpCode::ToDbl)),
            "get" => instrs.push(Instruction::new(OpCode::GetC)),
            "concat" => instrs.push(Instruction::new(OpCode::Concat)),
            "length" => {
                let op = match self.length_sites.get(&c.id) {
                    Some(ResolvedBuiltin::StringLength) => OpCode::SLen,
                    Some(ResolvedBuiltin::ArrayLength) => OpCode::ALen,
                    None => panic!("codegen: call site {:?} missing from length_sites", c.id),
                };
                instrs.push(Instruction::new(op));
            }
            name => instrs.push(Instruction::with_operand(OpCode::Call, Value::Str(name.to_string()))),
        }
    }
}

fn binop_opcode(op: &tyro_lex::Token) -> OpCode {
    match op.kind {
        TokenKind::Plus => OpCode::Add,
        TokenKind::Minus => OpCode::Sub,
        TokenKind::Times => OpCode::Mul,
        TokenKind::Divide => OpCode::Div,
        TokenKind::And => OpCode::And,
        TokenKind::Or => OpCode::Or,
        TokenKind::Less => OpCode::CmpLt,
        TokenKind::LessEq => OpCode::CmpLe,
        TokenKind::Greater => OpCode::CmpGt,
        TokenKind::GreaterEq => OpCode::CmpGe,
        TokenKind::Equal => OpCode::CmpEq,
        TokenKind::NotEqual => OpCode::CmpNe,
        other => unreachable!("checked program only puts binary operator tokens here, found {other:?}"),
    }
}

/// String/char literals keep their raw escape sequences through the lexer
/// (it does no escape interpretation); the code generator resolves the two
/// the grammar supports at the point it turns a literal into a `Value`.
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyro_par::parse;
    use tyro_sem::check_program;

    fn compile(src: &str) -> IndexMap<String, FrameInfo> {
        let program = parse(src).expect("parse should succeed");
        let checked = check_program(&program).expect("check should succeed");
        generate(&program, &checked)
    }

    #[test]
    fn main_with_no_return_gets_implicit_null_ret() {
        let frames = compile("void main() { }");
        let main = &frames["main"];
        assert_eq!(main.instructions.last().unwrap().opcode, OpCode::Ret);
        assert_eq!(main.instructions[main.instructions.len() - 2].opcode, OpCode::Push);
    }

    #[test]
    fn vardecl_emits_store_to_a_fresh_slot() {
        let frames = compile("void main() { int x = 1 }");
        let main = &frames["main"];
        assert!(main
            .instructions
            .iter()
            .any(|i| i.opcode == OpCode::Store && i.operand == Some(Value::Int(0))));
    }

    #[test]
    fn if_stmt_branches_converge_on_one_nop() {
        let src = "void main() { int x = 1 if (x == 1) { x = 2 } else { x = 3 } }";
        let frames = compile(src);
        let main = &frames["main"];
        let jmp_targets: Vec<i64> = main
            .instructions
            .iter()
            .filter(|i| i.opcode == OpCode::Jmp)
            .map(|i| i.operand.as_ref().unwrap().as_int().unwrap())
            .collect();
        assert_eq!(jmp_targets.len(), 1);
        assert_eq!(main.instructions[jmp_targets[0] as usize].opcode, OpCode::Nop);
    }

    #[test]
    fn if_elseif_else_all_jump_to_the_same_final_nop() {
        let src = "void main() { int x = 1 \
            if (x == 1) { x = 2 } \
            else if (x == 2) { x = 3 } \
            else { x = 4 } \
        }";
        let frames = compile(src);
        let main = &frames["main"];
        let jmp_targets: Vec<i64> = main
            .instructions
            .iter()
            .filter(|i| i.opcode == OpCode::Jmp)
            .map(|i| i.operand.as_ref().unwrap().as_int().unwrap())
            .collect();
        assert_eq!(jmp_targets.len(), 2);
        assert_eq!(jmp_targets[0], jmp_targets[1]);
    }

    #[test]
    fn struct_field_assignment_uses_setf() {
        let src = "struct P { int x } void main() { P p = new P  p.x = 5 }";
        let frames = compile(src);
        let main = &frames["main"];
        assert!(main
            .instructions
            .iter()
            .any(|i| i.opcode == OpCode::SetF && i.operand == Some(Value::Str("x".into()))));
    }

    #[test]
    fn class_member_assignment_uses_setmem() {
        let src = "class C { private: int x public: void setX() { x = 1 } } void main() { C c = new C }";
        let frames = compile(src);
        let main = &frames["setX"];
        assert!(main
            .instructions
            .iter()
            .any(|i| i.opcode == OpCode::SetMem && i.operand == Some(Value::Str("x".into()))));
    }

    #[test]
    fn new_struct_initializes_every_field_to_null() {
        let src = "struct P { int x int y } void main() { P p = new P }";
        let frames = compile(src);
        let main = &frames["main"];
        let addf_count = main.instructions.iter().filter(|i| i.opcode == OpCode::AddF).count();
        assert_eq!(addf_count, 2);
    }

    #[test]
    fn length_dispatches_slen_for_strings_and_alen_for_arrays() {
        let src = "void main() { \
            string s = \"hi\" \
            array int xs = new int[3] \
            int a = length(s) \
            int b = length(xs) \
        }";
        let frames = compile(src);
        let main = &frames["main"];
        assert!(main.instructions.iter().any(|i| i.opcode == OpCode::SLen));
        assert!(main.instructions.iter().any(|i| i.opcode == OpCode::ALen));
    }

    #[test]
    fn free_function_call_emits_call_with_its_name() {
        let src = "int helper() { return 1 } void main() { int x = helper() }";
        let frames = compile(src);
        let main = &frames["main"];
        assert!(main
            .instructions
            .iter()
            .any(|i| i.opcode == OpCode::Call && i.operand == Some(Value::Str("helper".into()))));
    }

    #[test]
    fn array_element_assignment_uses_seti() {
        let src = "void main() { array int xs = new int[3]  xs[0] = 7 }";
        let frames = compile(src);
        let main = &frames["main"];
        assert!(main.instructions.iter().any(|i| i.opcode == OpCode::SetI));
    }
}
