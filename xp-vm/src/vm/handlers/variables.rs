// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable opcode handlers: GetGlobal, SetGlobal, GetLocal, SetLocal, ScopeExit.

use crate::opcode::OpCode;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a variable opcode. Stores leave the value on the stack.
    pub(crate) fn execute_variables(&mut self, op: OpCode) -> Result<()> {
        let operand = usize::from(self.read_byte()?);
        match op {
            OpCode::GetGlobal => {
                let val = self.globals.get(operand)?;
                self.stack.push(val)?;
            }
            OpCode::SetGlobal => {
                let val = self.stack.peek(0)?.clone();
                self.globals.set(operand, val)?;
            }
            OpCode::GetLocal => {
                let base = self.frame()?.base;
                let val = self
                    .stack
                    .get(base + operand)
                    .map_err(|_| RuntimeError::LocalOutOfRange { index: operand })?;
                self.stack.push(val)?;
            }
            OpCode::SetLocal => {
                let val = self.stack.peek(0)?.clone();
                let base = self.frame()?.base;
                self.stack
                    .set(base + operand, val)
                    .map_err(|_| RuntimeError::LocalOutOfRange { index: operand })?;
            }
            OpCode::ScopeExit => {
                self.stack.collapse(operand)?;
            }
            _ => {
                return Err(RuntimeError::Internal(format!(
                    "execute_variables: unexpected opcode {:?}",
                    op
                )));
            }
        }
        Ok(())
    }
}
