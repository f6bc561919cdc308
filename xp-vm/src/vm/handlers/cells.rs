// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Cell opcode handlers: GetCell, SetCell, LoadCell, NewCell, MakeFunction.

use std::rc::Rc;

use crate::opcode::OpCode;
use crate::value::{CellObject, FunctionObject, Value};
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a cell opcode.
    pub(crate) fn execute_cells(&mut self, op: OpCode) -> Result<()> {
        let operand = usize::from(self.read_byte()?);
        match op {
            OpCode::GetCell => {
                let val = self.frame()?.cell(operand)?.get();
                self.stack.push(val)?;
            }
            OpCode::SetCell => {
                let val = self.stack.peek(0)?.clone();
                self.frame()?.cell(operand)?.set(val);
            }
            OpCode::LoadCell => {
                // The cell itself, not its value: the closure shares it
                let cell = Rc::clone(self.frame()?.cell(operand)?);
                self.stack.push(Value::cell(cell))?;
            }
            OpCode::NewCell => self.frame_mut()?.renew_cell(operand)?,
            OpCode::MakeFunction => self.make_function(operand)?,
            _ => {
                return Err(RuntimeError::Internal(format!(
                    "execute_cells: unexpected opcode {:?}",
                    op
                )));
            }
        }
        Ok(())
    }

    /// Bind a code object to the `count` cells pushed beneath it.
    fn make_function(&mut self, count: usize) -> Result<()> {
        let code = self.stack.pop()?;
        let code = code
            .as_code()
            .cloned()
            .ok_or_else(|| RuntimeError::type_error("code", code.type_name()))?;
        let cells = self
            .stack
            .pop_n(count)?
            .iter()
            .map(|value| {
                value
                    .as_cell()
                    .cloned()
                    .ok_or_else(|| RuntimeError::type_error("cell", value.type_name()))
            })
            .collect::<Result<Vec<Rc<CellObject>>>>()?;

        if cells.len() != code.free_count {
            return Err(RuntimeError::Internal(format!(
                "{} captures {} cells, got {}",
                code.name,
                code.free_count,
                cells.len()
            )));
        }
        self.stack
            .push(Value::function(FunctionObject::new(code, cells)))
    }
}
