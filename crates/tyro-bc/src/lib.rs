//! Bytecode lowering: turns a checked [`tyro_par::Program`] into one
//! [`FrameInfo`] per function, ready for [`tyro_vm`] to execute.

pub mod codegen;
pub mod instr;
pub mod opcode;
pub mod value;
pub mod vartable;

pub use codegen::generate;
pub use instr::{render_ir, FrameInfo, Instruction};
pub use opcode::OpCode;
pub use value::Value;
pub use vartable::VarTable;
