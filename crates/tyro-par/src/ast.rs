//! Abstract syntax tree types.
//!
//! The tree is plain data: no visitor interface, no shared ownership.
//! Recursive positions use `Box` and the tree is consumed by value during
//! semantic checking and code generation rather than visited in place.

use tyro_lex::Token;

#[derive(Debug, Clone)]
pub struct Program {
    pub struct_defs: Vec<StructDef>,
    pub fun_defs: Vec<FunDef>,
    pub class_defs: Vec<ClassDef>,
}

/// A type name together with whether it denotes an array of that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub is_array: bool,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub data_type: DataType,
    pub var_name: Token,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub struct_name: Token,
    pub fields: Vec<VarDef>,
}

#[derive(Debug, Clone)]
pub struct FunDef {
    pub return_type: DataType,
    pub fun_name: Token,
    pub params: Vec<VarDef>,
    pub stmts: Vec<Stmt>,
}

/// A method/member pair split by visibility, the way the original class
/// body parses it: private section first, then public.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub class_name: Token,
    pub public_methods: Vec<FunDef>,
    pub public_members: Vec<VarDef>,
    pub private_methods: Vec<FunDef>,
    pub private_members: Vec<VarDef>,
}

// ----------------------------------------------------------------------
// Expressions
// ----------------------------------------------------------------------

/// A right-leaning expression tree: `first [op rest]`, with `rest` itself
/// an `Expr`. There is no operator-precedence climbing; the grammar
/// disambiguates entirely through a single level of binary operator plus
/// an optionally-nested continuation.
#[derive(Debug, Clone)]
pub struct Expr {
    pub negated: bool,
    pub first: Box<ExprTerm>,
    pub op: Option<Token>,
    pub rest: Option<Box<Expr>>,
}

impl Expr {
    pub fn first_token(&self) -> &Token {
        self.first.first_token()
    }
}

#[derive(Debug, Clone)]
pub enum ExprTerm {
    Simple(SimpleTerm),
    Complex(ComplexTerm),
}

impl ExprTerm {
    pub fn first_token(&self) -> &Token {
        match self {
            ExprTerm::Simple(t) => t.first_token(),
            ExprTerm::Complex(t) => t.first_token(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimpleTerm {
    pub rvalue: Box<RValue>,
}

impl SimpleTerm {
    pub fn first_token(&self) -> &Token {
        self.rvalue.first_token()
    }
}

/// A parenthesized sub-expression used as a term.
#[derive(Debug, Clone)]
pub struct ComplexTerm {
    pub expr: Box<Expr>,
}

impl ComplexTerm {
    pub fn first_token(&self) -> &Token {
        self.expr.first_token()
    }
}

#[derive(Debug, Clone)]
pub enum RValue {
    Simple(SimpleRValue),
    New(NewRValue),
    Var(VarRValue),
    Call(CallExpr),
}

impl RValue {
    pub fn first_token(&self) -> &Token {
        match self {
            RValue::Simple(v) => &v.value,
            RValue::New(v) => &v.type_name,
            RValue::Var(v) => &v.path[0].var_name,
            RValue::Call(v) => &v.fun_name,
        }
    }
}

/// A literal value token: int, double, string, char, bool, or null.
#[derive(Debug, Clone)]
pub struct SimpleRValue {
    pub value: Token,
}

/// `new Type` or `new Type[size]`.
#[derive(Debug, Clone)]
pub struct NewRValue {
    pub type_name: Token,
    pub array_expr: Option<Box<Expr>>,
}

/// One step of a dotted/indexed/called access path: `name`, `name[expr]`,
/// or `name(args)` when it is the terminal method call in the path.
#[derive(Debug, Clone)]
pub struct VarRef {
    pub var_name: Token,
    pub is_method: bool,
    pub array_expr: Option<Box<Expr>>,
    pub method_params: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct VarRValue {
    pub path: Vec<VarRef>,
}

/// Identifies a single call-expression occurrence in the source, assigned
/// monotonically as the parser encounters each `CallExpr`. The semantic
/// checker uses it as the key of a side table recording which calls resolve
/// to the `length@array` built-in, rather than rewriting `fun_name` in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteId(pub u32);

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub id: CallSiteId,
    pub fun_name: Token,
    pub args: Vec<Expr>,
}

// ----------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Stmt {
    Return(ReturnStmt),
    While(WhileStmt),
    For(ForStmt),
    If(IfStmt),
    VarDecl(VarDeclStmt),
    Assign(AssignStmt),
    Call(CallExpr),
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub var_def: VarDef,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub lvalue: Vec<VarRef>,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub var_decl: VarDeclStmt,
    pub condition: Expr,
    pub assign_stmt: AssignStmt,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct BasicIf {
    pub condition: Expr,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub if_part: BasicIf,
    pub else_ifs: Vec<BasicIf>,
    pub else_stmts: Vec<Stmt>,
}
