//! A single bytecode instruction and a compiled function's full frame.

use std::fmt;

use indexmap::IndexMap;

use crate::opcode::OpCode;
use crate::value::Value;

/// One instruction: an opcode, an optional operand, and an optional
/// debug comment attached by the code generator (printed by `--ir`, not
/// consulted by the virtual machine).
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Option<Value>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
            comment: None,
        }
    }

    pub fn with_operand(opcode: OpCode, operand: Value) -> Self {
        Self {
            opcode,
            operand: Some(operand),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        if let Some(operand) = &self.operand {
            write!(f, " {operand}")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, "  // {comment}")?;
        }
        Ok(())
    }
}

/// A function's compiled instruction stream, as the virtual machine
/// loads it into a `Frame`.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub function_name: String,
    pub arg_count: usize,
    pub instructions: Vec<Instruction>,
}

/// Renders a compiled program's frames in the textual `--ir` form: a
/// `Frame '<name>'` header per function followed by its numbered
/// instructions, each rendered `MNEMONIC(operand)` with an empty operand
/// list when the instruction carries none.
pub fn render_ir(frames: &IndexMap<String, FrameInfo>) -> String {
    let mut out = String::new();
    for (name, frame) in frames {
        out.push_str(&format!("\nFrame '{name}'\n"));
        for (i, instr) in frame.instructions.iter().enumerate() {
            let operand = instr
                .operand
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default();
            out.push_str(&format!("  {i}: {}({operand})", instr.opcode.mnemonic()));
            if let Some(comment) = &instr.comment {
                out.push_str(&format!("  // {comment}"));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_ir_includes_frame_header_and_numbered_instructions() {
        let mut frames = IndexMap::new();
        frames.insert(
            "main".to_string(),
            FrameInfo {
                function_name: "main".into(),
                arg_count: 0,
                instructions: vec![
                    Instruction::with_operand(OpCode::Push, Value::Int(1)),
                    Instruction::new(OpCode::Ret),
                ],
            },
        );
        let text = render_ir(&frames);
        assert!(text.contains("Frame 'main'"));
        assert!(text.contains("0: PUSH(1)"));
        assert!(text.contains("1: RET()"));
    }

    #[test]
    fn display_includes_operand_and_comment() {
        let instr = Instruction::with_operand(OpCode::Load, Value::Int(2)).with_comment("x");
        assert_eq!(instr.to_string(), "LOAD 2  // x");
    }

    #[test]
    fn display_without_operand_is_bare_mnemonic() {
        assert_eq!(Instruction::new(OpCode::Ret).to_string(), "RET");
    }
}
