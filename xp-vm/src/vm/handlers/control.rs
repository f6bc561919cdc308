// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: Jump, JumpIfFalse, Call, Return.

use std::rc::Rc;

use tracing::trace;

use crate::opcode::OpCode;
use crate::utils::{check_arity, expect_bool};
use crate::value::{Object, Value};
use crate::vm::frame::CallFrame;
use crate::vm::{Result, RuntimeError, VM};

/// Result of control flow execution.
#[derive(Debug)]
pub enum ControlFlow {
    /// Continue execution.
    Continue,
    /// The outermost frame returned.
    Return(Value),
}

impl VM {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, op: OpCode) -> Result<ControlFlow> {
        match op {
            OpCode::Jump => {
                let target = self.read_u16()?;
                self.jump(target)?;
            }
            OpCode::JumpIfFalse => {
                let target = self.read_u16()?;
                let cond = self.stack.pop()?;
                if !expect_bool(&cond)? {
                    self.jump(target)?;
                }
            }
            OpCode::Call => {
                let argc = usize::from(self.read_byte()?);
                self.call(argc)?;
            }
            OpCode::Return => {
                let result = self.stack.pop()?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::Internal("return without a frame".into()))?;
                self.stack.truncate(frame.base);

                if self.frames.is_empty() {
                    return Ok(ControlFlow::Return(result));
                }
                self.stack.push(result)?;
            }
            _ => {
                return Err(RuntimeError::Internal(format!(
                    "execute_control: unexpected opcode {:?}",
                    op
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Call the value sitting `argc` slots below the top.
    fn call(&mut self, argc: usize) -> Result<()> {
        let callee_index = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        let callee = self.stack.get(callee_index)?;

        match &callee {
            Value::Object(Object::Native(native)) => {
                let result = native.call(self.stack.top(argc)?)?;
                self.stack.truncate(callee_index);
                self.stack.push(result)
            }
            Value::Object(Object::Function(function)) => {
                check_arity(function.name(), function.arity(), argc)?;
                trace!(
                    name = function.name(),
                    argc,
                    depth = self.frames.len(),
                    "call"
                );
                let frame = CallFrame::new(Rc::clone(&function.code), callee_index, &function.cells)?;
                self.frames.push(frame);
                Ok(())
            }
            other => Err(RuntimeError::NotCallable(other.type_name().into())),
        }
    }
}
