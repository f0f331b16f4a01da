//! The stack-based bytecode interpreter: one call stack of [`Frame`]s plus
//! a [`Heap`] for struct, array, and class instances.

use std::io::{self, BufRead, Write as _};
use std::rc::Rc;

use indexmap::IndexMap;
use tyro_util::error::{VMError, VMResult};
use tyro_util::FxHashMap;

use tyro_bc::{FrameInfo, Instruction, OpCode, Value};

use crate::frame::Frame;
use crate::heap::Heap;

/// Executes a compiled program to completion, writing `print`/`write`
/// output to `out` and reading `read` input from `in_`.
pub struct VM<R, W> {
    frame_info: FxHashMap<String, Rc<FrameInfo>>,
    heap: Heap,
    call_stack: Vec<Frame>,
    stdin: R,
    stdout: W,
}

impl VM<io::StdinLock<'static>, io::Stdout> {
    pub fn new(frames: IndexMap<String, FrameInfo>) -> Self {
        Self::with_io(frames, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: std::io::Write> VM<R, W> {
    pub fn with_io(frames: IndexMap<String, FrameInfo>, stdin: R, stdout: W) -> Self {
        let frame_info = frames
            .into_iter()
            .map(|(name, info)| (name, Rc::new(info)))
            .collect();
        Self {
            frame_info,
            heap: Heap::new(),
            call_stack: Vec::new(),
            stdin,
            stdout,
        }
    }

    /// Runs the program starting from its `main` frame, returning the
    /// value left on `main`'s stack when it returns (if any).
    pub fn run(&mut self) -> VMResult<Option<Value>> {
        let main = self
            .frame_info
            .get("main")
            .ok_or_else(|| VMError::new("no 'main' function defined"))?
            .clone();
        self.call_stack.push(Frame::new(main));

        loop {
            let Some(frame) = self.call_stack.last() else {
                return Ok(None);
            };
            if frame.pc >= frame.info.instructions.len() {
                return Err(VMError::new(format!(
                    "frame '{}' ran off the end of its instructions without a RET",
                    frame.info.function_name
                )));
            }
            let instr = frame.info.instructions[frame.pc].clone();
            if let Some(ret) = self.step(&instr)? {
                return Ok(ret);
            }
        }
    }

    /// Executes one instruction. Returns `Some` (possibly `None` inside,
    /// for a bare `return;`) only when the outermost frame has just
    /// returned, ending the program.
    fn step(&mut self, instr: &Instruction) -> VMResult<Option<Option<Value>>> {
        let mut advance = true;
        match instr.opcode {
            OpCode::Nop => {}

            OpCode::Push => {
                let v = self.operand(instr)?;
                self.push(v);
            }

            OpCode::Pop => {
                self.pop()?;
            }

            OpCode::Dup => {
                let v = self.pop()?;
                self.push(v.clone());
                self.push(v);
            }

            OpCode::Load => {
                let idx = self.operand_index(instr)?;
                let frame = self.top_frame_mut()?;
                let v = frame
                    .variables
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| VMError::new("non int index in LOAD/STORE instr"))?;
                self.push(v);
            }

            OpCode::Store => {
                let idx = self.operand_index(instr)?;
                let v = self.pop()?;
                let frame = self.top_frame_mut()?;
                if idx == frame.variables.len() {
                    frame.variables.push(v);
                } else if idx < frame.variables.len() {
                    frame.variables[idx] = v;
                } else {
                    return Err(VMError::new("non int index in LOAD/STORE instr"));
                }
            }

            OpCode::Add => self.binop_arith(|a, b| match (a, b) {
                (Value::Str(lhs), Value::Str(rhs)) => Ok(Value::Str(format!("{lhs}{rhs}"))),
                _ => Ok(a.checked_add_num(b)?),
            })?,
            OpCode::Sub => self.binop_arith(|a, b| Ok(a.checked_sub_num(b)?))?,
            OpCode::Mul => self.binop_arith(|a, b| Ok(a.checked_mul_num(b)?))?,
            OpCode::Div => self.binop_arith(|a, b| a.checked_div_num(b))?,

            OpCode::And => self.binop_bool(|a, b| a && b)?,
            OpCode::Or => self.binop_bool(|a, b| a || b)?,

            OpCode::Not => {
                let x = self.pop_not_null()?;
                let b = x
                    .as_bool()
                    .ok_or_else(|| VMError::new("NOT applied to a non-bool value"))?;
                self.push(Value::Bool(!b));
            }

            OpCode::CmpLt => self.binop_cmp(|o| o.is_lt())?,
            OpCode::CmpLe => self.binop_cmp(|o| o.is_le())?,
            OpCode::CmpGt => self.binop_cmp(|o| o.is_gt())?,
            OpCode::CmpGe => self.binop_cmp(|o| o.is_ge())?,

            OpCode::CmpEq => {
                let x = self.pop()?;
                let y = self.pop()?;
                self.push(Value::Bool(values_equal(&y, &x)));
            }
            OpCode::CmpNe => {
                let x = self.pop()?;
                let y = self.pop()?;
                self.push(Value::Bool(!values_equal(&y, &x)));
            }

            OpCode::Jmp => {
                let target = self.operand_index(instr)?;
                self.top_frame_mut()?.pc = target;
                advance = false;
            }

            OpCode::Jmpf => {
                let target = self.operand_index(instr)?;
                let cond = self.pop()?;
                let cond = cond
                    .as_bool()
                    .ok_or_else(|| VMError::new("JMPF condition is not a bool"))?;
                if !cond {
                    self.top_frame_mut()?.pc = target;
                    advance = false;
                }
            }

            OpCode::Call => {
                let name = self.operand_str(instr)?;
                let callee_info = self
                    .frame_info
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| VMError::new(format!("call to undefined function '{name}'")))?;
                let arg_count = callee_info.arg_count;
                let caller = self.top_frame_mut()?;
                // Transfer args top-to-bottom onto the callee's own operand
                // stack, exactly as pushed there; the callee's own prologue
                // (STORE per parameter) consumes them in declaration order.
                let mut args = Vec::with_capacity(arg_count);
                for _ in 0..arg_count {
                    args.push(
                        caller
                            .operand_stack
                            .pop()
                            .ok_or_else(|| VMError::new("operand stack underflow on CALL"))?,
                    );
                }
                // Advance past the CALL before pushing the callee frame, so
                // that when it returns control lands on the instruction
                // after CALL rather than re-entering the call.
                self.top_frame_mut()?.pc += 1;
                let mut callee = Frame::new(callee_info);
                callee.operand_stack = args;
                self.call_stack.push(callee);
                advance = false;
            }

            OpCode::Ret => {
                let ret = self.top_frame_mut()?.operand_stack.last().cloned();
                self.call_stack.pop();
                match self.call_stack.last_mut() {
                    Some(caller) => {
                        if let Some(v) = ret {
                            caller.operand_stack.push(v);
                        }
                    }
                    None => return Ok(Some(Some(ret.unwrap_or(Value::Null)))),
                }
                advance = false;
            }

            OpCode::Write => {
                let v = self.pop()?;
                write!(self.stdout, "{v}").map_err(|e| VMError::new(e.to_string()))?;
            }

            OpCode::Read => {
                let mut line = String::new();
                self.stdin
                    .read_line(&mut line)
                    .map_err(|e| VMError::new(e.to_string()))?;
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                self.push(Value::Str(line));
            }

            OpCode::SLen => {
                let x = self.pop_not_null()?;
                let s = x
                    .as_str()
                    .ok_or_else(|| VMError::new("SLEN applied to a non-string value"))?;
                self.push(Value::Int(s.chars().count() as i64));
            }

            OpCode::ALen => {
                let x = self.pop_not_null()?;
                let oid = expect_int(&x, "ALEN")?;
                let len = self.heap.array_len(oid)?;
                self.push(Value::Int(len as i64));
            }

            OpCode::GetC => {
                let x = self.pop_not_null()?;
                let y = self.pop_not_null()?;
                let s = x
                    .as_str()
                    .ok_or_else(|| VMError::new("GETC applied to a non-string value"))?;
                let idx = expect_int(&y, "GETC")?;
                let chars: Vec<char> = s.chars().collect();
                if idx < 0 || idx as usize >= chars.len() {
                    return Err(VMError::new(format!(
                        "out-of-bounds string index {idx} of {}",
                        chars.len()
                    )));
                }
                self.push(Value::Str(chars[idx as usize].to_string()));
            }

            OpCode::ToInt => {
                let x = self.pop()?;
                let v = match x {
                    Value::Str(s) => Value::Int(
                        s.trim()
                            .parse()
                            .map_err(|_| VMError::new("cannot convert string to int"))?,
                    ),
                    Value::Int(n) => Value::Int(n),
                    Value::Double(d) => Value::Int(d as i64),
                    _ => return Err(VMError::new("TOINT applied to an unconvertible value")),
                };
                self.push(v);
            }

            OpCode::ToDbl => {
                let x = self.pop()?;
                let v = match x {
                    Value::Str(s) => Value::Double(
                        s.trim()
                            .parse()
                            .map_err(|_| VMError::new("cannot convert string to double"))?,
                    ),
                    Value::Double(d) => Value::Double(d),
                    Value::Int(n) => Value::Double(n as f64),
                    _ => return Err(VMError::new("TODBL applied to an unconvertible value")),
                };
                self.push(v);
            }

            OpCode::ToStr => {
                let x = self.pop()?;
                self.push(Value::Str(x.to_string()));
            }

            OpCode::Concat => {
                let x = self.pop_not_null()?;
                let y = self.pop_not_null()?;
                let a = y
                    .as_str()
                    .ok_or_else(|| VMError::new("CONCAT applied to a non-string value"))?;
                let b = x
                    .as_str()
                    .ok_or_else(|| VMError::new("CONCAT applied to a non-string value"))?;
                self.push(Value::Str(format!("{a}{b}")));
            }

            OpCode::Allocs => {
                let oid = self.heap.alloc_struct();
                self.push(Value::Int(oid));
            }

            OpCode::Allocc => {
                let oid = self.heap.alloc_class();
                self.push(Value::Int(oid));
            }

            OpCode::Alloca => {
                let fill = self.pop()?;
                let size = self.pop_not_null()?;
                let size = expect_int(&size, "ALLOCA")?;
                if size < 0 {
                    return Err(VMError::new(format!("negative array size {size}")));
                }
                let oid = self.heap.alloc_array(size as usize, fill);
                self.push(Value::Int(oid));
            }

            OpCode::AddF => {
                let x = self.pop_not_null()?;
                let oid = expect_int(&x, "ADDF")?;
                let name = self.operand_str(instr)?;
                self.heap.add_field(oid, &name)?;
            }

            OpCode::SetF => {
                let x = self.pop()?;
                let y = self.pop()?;
                let oid = expect_int(&y, "SETF")?;
                let name = self.operand_str(instr)?;
                self.heap.set_field(oid, &name, x)?;
            }

            OpCode::GetF => {
                let x = self.pop_not_null()?;
                let oid = expect_int(&x, "GETF")?;
                let name = self.operand_str(instr)?;
                let v = self.heap.get_field(oid, &name)?;
                self.push(v);
            }

            OpCode::AddMem => {
                let x = self.pop_not_null()?;
                let oid = expect_int(&x, "ADDMEM")?;
                let name = self.operand_str(instr)?;
                self.heap.add_member(oid, &name)?;
            }

            OpCode::SetMem => {
                let x = self.pop()?;
                let y = self.pop()?;
                let oid = expect_int(&y, "SETMEM")?;
                let name = self.operand_str(instr)?;
                self.heap.set_member(oid, &name, x)?;
            }

            OpCode::GetMem => {
                let x = self.pop_not_null()?;
                let oid = expect_int(&x, "GETMEM")?;
                let name = self.operand_str(instr)?;
                let v = self.heap.get_member(oid, &name)?;
                self.push(v);
            }

            OpCode::SetI => {
                let x = self.pop_not_null()?;
                let y = self.pop_not_null()?;
                let z = self.pop_not_null()?;
                let idx = expect_int(&y, "SETI")?;
                let oid = expect_int(&z, "SETI")?;
                self.heap.set_index(oid, idx, x)?;
            }

            OpCode::GetI => {
                let x = self.pop_not_null()?;
                let y = self.pop_not_null()?;
                let idx = expect_int(&x, "GETI")?;
                let oid = expect_int(&y, "GETI")?;
                let v = self.heap.get_index(oid, idx)?;
                self.push(v);
            }
        }

        if advance {
            self.top_frame_mut()?.pc += 1;
        }
        Ok(None)
    }

    fn top_frame_mut(&mut self) -> VMResult<&mut Frame> {
        self.call_stack
            .last_mut()
            .ok_or_else(|| VMError::new("no active frame"))
    }

    fn push(&mut self, v: Value) {
        if let Some(frame) = self.call_stack.last_mut() {
            frame.operand_stack.push(v);
        }
    }

    fn pop(&mut self) -> VMResult<Value> {
        self.top_frame_mut()?
            .operand_stack
            .pop()
            .ok_or_else(|| VMError::new("operand stack underflow"))
    }

    fn pop_not_null(&mut self) -> VMResult<Value> {
        let v = self.pop()?;
        if v.is_null() {
            return Err(VMError::new("unexpected null value"));
        }
        Ok(v)
    }

    fn operand(&self, instr: &Instruction) -> VMResult<Value> {
        instr
            .operand
            .clone()
            .ok_or_else(|| VMError::new(format!("{} is missing its operand", instr.opcode.mnemonic())))
    }

    fn operand_index(&self, instr: &Instruction) -> VMResult<usize> {
        let v = self.operand(instr)?;
        if v.is_null() {
            return match instr.opcode {
                OpCode::Load | OpCode::Store => {
                    Err(VMError::new("non int index in LOAD/STORE instr"))
                }
                _ => Err(VMError::new(format!(
                    "{} operand is null",
                    instr.opcode.mnemonic()
                ))),
            };
        }
        expect_int(&v, instr.opcode.mnemonic()).map(|n| n as usize)
    }

    fn operand_str(&self, instr: &Instruction) -> VMResult<String> {
        match self.operand(instr)? {
            Value::Str(s) => Ok(s),
            _ => Err(VMError::new(format!(
                "{} operand is not a name",
                instr.opcode.mnemonic()
            ))),
        }
    }

    fn binop_arith(&mut self, op: impl Fn(&Value, &Value) -> VMResult<Value>) -> VMResult<()> {
        let x = self.pop_not_null()?;
        let y = self.pop_not_null()?;
        let v = op(&y, &x)?;
        self.push(v);
        Ok(())
    }

    fn binop_bool(&mut self, op: impl Fn(bool, bool) -> bool) -> VMResult<()> {
        let x = self.pop_not_null()?;
        let y = self.pop_not_null()?;
        let a = y.as_bool().ok_or_else(|| VMError::new("expected a bool operand"))?;
        let b = x.as_bool().ok_or_else(|| VMError::new("expected a bool operand"))?;
        self.push(Value::Bool(op(a, b)));
        Ok(())
    }

    fn binop_cmp(&mut self, op: impl Fn(std::cmp::Ordering) -> bool) -> VMResult<()> {
        let x = self.pop_not_null()?;
        let y = self.pop_not_null()?;
        let ord = numeric_cmp(&y, &x)?;
        self.push(Value::Bool(op(ord)));
        Ok(())
    }
}

trait NumOps {
    fn checked_add_num(&self, other: &Value) -> VMResult<Value>;
    fn checked_sub_num(&self, other: &Value) -> VMResult<Value>;
    fn checked_mul_num(&self, other: &Value) -> VMResult<Value>;
    fn checked_div_num(&self, other: &Value) -> VMResult<Value>;
}

impl NumOps for Value {
    fn checked_add_num(&self, other: &Value) -> VMResult<Value> {
        numeric_op(self, other, |a, b| a + b, |a, b| a + b)
    }
    fn checked_sub_num(&self, other: &Value) -> VMResult<Value> {
        numeric_op(self, other, |a, b| a - b, |a, b| a - b)
    }
    fn checked_mul_num(&self, other: &Value) -> VMResult<Value> {
        numeric_op(self, other, |a, b| a * b, |a, b| a * b)
    }
    fn checked_div_num(&self, other: &Value) -> VMResult<Value> {
        match (self, other) {
            (Value::Int(_), Value::Int(b)) if *b == 0 => Err(VMError::new("division by zero")),
            _ => numeric_op(self, other, |a, b| a / b, |a, b| a / b),
        }
    }
}

fn numeric_op(
    a: &Value,
    b: &Value,
    int_op: impl Fn(i64, i64) -> i64,
    dbl_op: impl Fn(f64, f64) -> f64,
) -> VMResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(*x, *y))),
        (Value::Double(x), Value::Double(y)) => Ok(Value::Double(dbl_op(*x, *y))),
        (Value::Int(x), Value::Double(y)) => Ok(Value::Double(dbl_op(*x as f64, *y))),
        (Value::Double(x), Value::Int(y)) => Ok(Value::Double(dbl_op(*x, *y as f64))),
        _ => Err(VMError::new("arithmetic applied to non-numeric operands")),
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> VMResult<std::cmp::Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        _ => {
            let x = as_f64(a)?;
            let y = as_f64(b)?;
            x.partial_cmp(&y)
                .ok_or_else(|| VMError::new("comparison of non-numeric operands"))
        }
    }
}

fn as_f64(v: &Value) -> VMResult<f64> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Double(d) => Ok(*d),
        _ => Err(VMError::new("comparison applied to non-numeric operands")),
    }
}

fn expect_int(v: &Value, opcode: &str) -> VMResult<i64> {
    v.as_int()
        .ok_or_else(|| VMError::new(format!("{opcode} expected an int operand")))
}

/// `CMPEQ`/`CMPNE` skip the usual null check: two nulls compare equal,
/// one null against a non-null value compares unequal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Int(x), Value::Double(y)) | (Value::Double(y), Value::Int(x)) => *x as f64 == *y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(entries: Vec<(&str, usize, Vec<Instruction>)>) -> IndexMap<String, FrameInfo> {
        entries
            .into_iter()
            .map(|(name, arg_count, instructions)| {
                (
                    name.to_string(),
                    FrameInfo {
                        function_name: name.to_string(),
                        arg_count,
                        instructions,
                    },
                )
            })
            .collect()
    }

    fn run(frames: IndexMap<String, FrameInfo>) -> VMResult<Option<Value>> {
        let input = io::Cursor::new(Vec::new());
        let mut vm = VM::with_io(frames, input, Vec::new());
        vm.run()
    }

    #[test]
    fn arithmetic_and_return_value() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Int(2)),
            Instruction::with_operand(OpCode::Push, Value::Int(3)),
            Instruction::new(OpCode::Add),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main)])).unwrap();
        assert_eq!(result, Some(Value::Int(5)));
    }

    #[test]
    fn add_concatenates_two_strings() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Str("3".into())),
            Instruction::with_operand(OpCode::Push, Value::Str("4".into())),
            Instruction::new(OpCode::Add),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main)])).unwrap();
        assert_eq!(result, Some(Value::Str("34".into())));
    }

    #[test]
    fn call_transfers_args_in_push_order() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Int(10)),
            Instruction::with_operand(OpCode::Push, Value::Int(4)),
            Instruction::with_operand(OpCode::Call, Value::Str("sub".into())),
            Instruction::new(OpCode::Ret),
        ];
        let sub = vec![
            Instruction::with_operand(OpCode::Store, Value::Int(0)),
            Instruction::with_operand(OpCode::Store, Value::Int(1)),
            Instruction::with_operand(OpCode::Load, Value::Int(0)),
            Instruction::with_operand(OpCode::Load, Value::Int(1)),
            Instruction::new(OpCode::Sub),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main), ("sub", 2, sub)])).unwrap();
        assert_eq!(result, Some(Value::Int(6)));
    }

    #[test]
    fn jmpf_skips_forward_when_condition_is_false() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Bool(false)),
            Instruction::with_operand(OpCode::Jmpf, Value::Int(4)),
            Instruction::with_operand(OpCode::Push, Value::Int(1)),
            Instruction::new(OpCode::Ret),
            Instruction::with_operand(OpCode::Push, Value::Int(2)),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main)])).unwrap();
        assert_eq!(result, Some(Value::Int(2)));
    }

    #[test]
    fn array_allocation_and_out_of_bounds_index() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Int(2)), // size
            Instruction::with_operand(OpCode::Push, Value::Int(0)), // fill
            Instruction::new(OpCode::Alloca),
            Instruction::with_operand(OpCode::Store, Value::Int(0)),
            Instruction::with_operand(OpCode::Load, Value::Int(0)),
            Instruction::with_operand(OpCode::Push, Value::Int(5)),
            Instruction::new(OpCode::GetI),
            Instruction::new(OpCode::Ret),
        ];
        let err = run(frames(vec![("main", 0, main)])).unwrap_err();
        assert!(err.0.contains("out-of-bounds"));
    }

    #[test]
    fn cmpeq_treats_two_nulls_as_equal_without_null_check() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Null),
            Instruction::with_operand(OpCode::Push, Value::Null),
            Instruction::new(OpCode::CmpEq),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main)])).unwrap();
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn tostr_covers_bool_unlike_the_original_int_double_only_branch() {
        let main = vec![
            Instruction::with_operand(OpCode::Push, Value::Bool(true)),
            Instruction::new(OpCode::ToStr),
            Instruction::new(OpCode::Ret),
        ];
        let result = run(frames(vec![("main", 0, main)])).unwrap();
        assert_eq!(result, Some(Value::Str("true".into())));
    }

    #[test]
    fn missing_main_is_an_error() {
        let err = run(frames(vec![])).unwrap_err();
        assert!(err.0.contains("main"));
    }
}
