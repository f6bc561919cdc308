// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode emission for one code object.
//!
//! A [`CodeUnit`] wraps the [`CodeObject`] being built and tracks how many
//! values the emitted code leaves on the frame's stack segment. Local slots
//! are assigned from that depth, so a block nested inside an expression
//! still addresses its locals correctly.

use crate::code::CodeObject;
use crate::opcode::OpCode;
use crate::value::Value;

use super::analysis::ScopeId;
use super::types::{CompileError, Result, operand};

/// Visibility of one entry in `cell_names`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellSlot {
    /// Inherited, or owned by the function scope: visible for the whole body.
    Function,
    /// Owned by a block at this nesting level.
    Block(usize),
    /// The owning block has ended.
    Retired,
}

/// A forward jump waiting for its target.
#[must_use = "a jump must be bound to a target"]
#[derive(Debug)]
pub struct JumpLabel {
    operand: usize,
}

/// The code object under construction plus its compile-time stack depth.
#[derive(Debug)]
pub struct CodeUnit {
    pub code: CodeObject,
    /// The function (or global) scope this unit compiles.
    pub scope: ScopeId,
    depth: usize,
    cells: Vec<CellSlot>,
}

impl CodeUnit {
    /// A unit for the program body. The frame base is the stack bottom.
    pub fn main(scope: ScopeId) -> Self {
        Self {
            code: CodeObject::new("main", 0),
            scope,
            depth: 0,
            cells: Vec::new(),
        }
    }

    /// A unit for a function body. The callee and its arguments are already
    /// on the stack, so the depth starts at `arity + 1`.
    pub fn function(code: CodeObject, scope: ScopeId) -> Self {
        let depth = code.arity + 1;
        let cells = vec![CellSlot::Function; code.cell_names.len()];
        Self {
            code,
            scope,
            depth,
            cells,
        }
    }

    pub fn finish(self) -> CodeObject {
        self.code
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    fn track(&mut self, op: OpCode, operand: u8) {
        let depth = self.depth as isize + op.stack_effect(usize::from(operand));
        self.depth = depth.max(0) as usize;
    }

    /// Emit an instruction without operands.
    pub fn emit(&mut self, op: OpCode) {
        self.code.emit_op(op);
        self.track(op, 0);
    }

    /// Emit an instruction with a one-byte operand.
    pub fn emit_with(&mut self, op: OpCode, operand: u8) {
        self.code.emit_op(op);
        self.code.emit(operand);
        self.track(op, operand);
    }

    pub fn emit_constant(&mut self, value: Value) -> Result<()> {
        let index = self
            .code
            .add_constant(value)
            .ok_or_else(|| CompileError::TooManyConstants(self.code.name.clone()))?;
        self.emit_with(OpCode::Const, index);
        Ok(())
    }

    /// Emit a jump with a placeholder target.
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        self.code.emit_op(op);
        let operand = self.code.offset();
        self.code.emit(0xFF);
        self.code.emit(0xFF);
        self.track(op, 0);
        JumpLabel { operand }
    }

    /// Point `label` at the next instruction.
    pub fn bind(&mut self, label: JumpLabel) -> Result<()> {
        let target = jump_target(self.code.offset())?;
        self.code.patch_u16(label.operand, target);
        Ok(())
    }

    /// Emit a jump to an already known address.
    pub fn emit_jump_to(&mut self, op: OpCode, target: usize) -> Result<()> {
        let [hi, lo] = jump_target(target)?.to_be_bytes();
        self.code.emit_op(op);
        self.code.emit(hi);
        self.code.emit(lo);
        self.track(op, 0);
        Ok(())
    }

    /// Register `name` as the value on top of the stack and return its slot.
    pub fn declare_local(&mut self, name: &str) -> Result<u8> {
        let slot = self.depth.saturating_sub(1);
        let operand = operand(slot, || CompileError::TooManyLocals(self.code.name.clone()))?;
        self.code.add_local(name, slot);
        Ok(operand)
    }

    /// Index of the innermost visible cell called `name`.
    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.code
            .cell_names
            .iter()
            .zip(&self.cells)
            .rposition(|(cell, slot)| cell == name && *slot != CellSlot::Retired)
    }

    /// Index of a cell the function scope itself owns.
    pub fn owned_cell(&self, name: &str) -> Option<usize> {
        (self.code.free_count..self.code.cell_names.len())
            .find(|&i| self.cells[i] == CellSlot::Function && self.code.cell_names[i] == name)
    }

    /// Append a cell owned by the current block.
    pub fn declare_block_cell(&mut self, name: &str) -> usize {
        self.code.cell_names.push(name.to_string());
        self.cells.push(CellSlot::Block(self.code.scope_level));
        self.code.cell_names.len() - 1
    }

    pub fn enter_block(&mut self) {
        self.code.scope_level += 1;
    }

    /// Leave the current block, returning how many locals it declared.
    /// Its cells stop being visible but keep their indices.
    pub fn exit_block(&mut self) -> usize {
        let count = self.code.pop_scope_locals();
        let level = self.code.scope_level;
        for slot in &mut self.cells {
            if *slot == CellSlot::Block(level) {
                *slot = CellSlot::Retired;
            }
        }
        self.code.scope_level = level.saturating_sub(1);
        count
    }
}

fn jump_target(offset: usize) -> Result<u16> {
    u16::try_from(offset).map_err(|_| CompileError::JumpTooFar(offset))
}
