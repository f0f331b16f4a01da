//! Static checking: type existence, scope/shadowing, and the expression
//! and visibility rules a parsed [`tyro_par::Program`] must satisfy before
//! it is safe to lower to bytecode.

pub mod checker;
pub mod scope;

pub use checker::{check_program, CheckedProgram, ResolvedBuiltin};
pub use scope::SymbolTable;
