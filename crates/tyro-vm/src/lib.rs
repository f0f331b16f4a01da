//! The stack-based bytecode interpreter: loads the [`tyro_bc::FrameInfo`]
//! table a program compiles to and executes it from `main`.

pub mod frame;
pub mod heap;
pub mod vm;

pub use frame::Frame;
pub use heap::{Heap, BASE_OBJECT_ID};
pub use vm::VM;
