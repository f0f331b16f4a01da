//! A single activation record: the instructions it is executing, its
//! program counter, local variable slots, and its operand stack.

use std::rc::Rc;

use tyro_bc::{FrameInfo, Value};

/// `info` is shared (`Rc`) rather than cloned per call: it is an
/// immutable instruction template, and every call into the same function
/// would otherwise copy its whole instruction stream.
#[derive(Debug)]
pub struct Frame {
    pub info: Rc<FrameInfo>,
    pub pc: usize,
    pub variables: Vec<Value>,
    pub operand_stack: Vec<Value>,
}

impl Frame {
    pub fn new(info: Rc<FrameInfo>) -> Self {
        Self {
            info,
            pc: 0,
            variables: Vec::new(),
            operand_stack: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyro_bc::Instruction;

    #[test]
    fn new_frame_starts_at_instruction_zero_with_empty_stacks() {
        let info = Rc::new(FrameInfo {
            function_name: "main".into(),
            arg_count: 0,
            instructions: vec![Instruction::new(tyro_bc::OpCode::Nop)],
        });
        let frame = Frame::new(info);
        assert_eq!(frame.pc, 0);
        assert!(frame.variables.is_empty());
        assert!(frame.operand_stack.is_empty());
    }
}
