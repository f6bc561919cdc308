// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use crate::code::CodeObject;
use crate::value::{CellObject, Value};

use super::{Result, RuntimeError};

/// A call frame on the VM's call stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The code object being executed.
    pub code: Rc<CodeObject>,

    /// Instruction pointer (index into `code.code`).
    pub ip: usize,

    /// Stack base: slot 0 of the frame, the callee itself for a function call.
    pub base: usize,

    /// The frame's cells: captured ones first, then one fresh cell per owned name.
    pub cells: Vec<Rc<CellObject>>,
}

impl CallFrame {
    /// Create a call frame. `captured` must supply every free variable of `code`.
    pub fn new(code: Rc<CodeObject>, base: usize, captured: &[Rc<CellObject>]) -> Result<Self> {
        if captured.len() != code.free_count {
            return Err(RuntimeError::Internal(format!(
                "{} expects {} captured cells, got {}",
                code.name,
                code.free_count,
                captured.len()
            )));
        }
        let owned = code.cell_names.len().saturating_sub(code.free_count);
        let cells = captured
            .iter()
            .cloned()
            .chain((0..owned).map(|_| CellObject::new(Value::number(0.0))))
            .collect();
        Ok(Self {
            code,
            ip: 0,
            base,
            cells,
        })
    }

    pub fn cell(&self, index: usize) -> Result<&Rc<CellObject>> {
        self.cells
            .get(index)
            .ok_or(RuntimeError::CellOutOfRange(index))
    }

    /// Give cell `index` a fresh, unshared box. Closures that captured the
    /// previous one keep it.
    pub fn renew_cell(&mut self, index: usize) -> Result<()> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(RuntimeError::CellOutOfRange(index))?;
        *cell = CellObject::new(Value::number(0.0));
        Ok(())
    }
}
