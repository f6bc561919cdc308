// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.

/// Bytecode instructions for the XP VM.
///
/// Code is a flat byte stream: one opcode byte followed by its operands.
/// One-byte operands index constants, globals, local slots or cells. Jump
/// targets are two-byte big-endian absolute offsets into the same code object.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    // =========================================================================
    // Constants & Stack
    // =========================================================================
    /// Stop execution: pop and return the final value.
    Halt = 0x00,

    /// Push constant `[u8 index]` from the constant pool.
    Const = 0x01,

    /// Discard the top value.
    Pop = 0x11,

    // =========================================================================
    // Arithmetic & Comparison
    // =========================================================================
    /// Pop b, pop a, push a + b. Two strings concatenate.
    Add = 0x02,

    /// Pop b, pop a, push a - b.
    Sub = 0x03,

    /// Pop b, pop a, push a * b.
    Mul = 0x04,

    /// Pop b, pop a, push a / b (IEEE semantics, no trap on zero).
    Div = 0x05,

    /// Pop b, pop a, push the boolean `a <kind> b`. Operand: `[u8 CompareOp]`.
    Compare = 0x06,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Pop a boolean; jump to `[u16 target]` when it is false.
    JumpIfFalse = 0x07,

    /// Jump to `[u16 target]`.
    Jump = 0x08,

    // =========================================================================
    // Variables
    // =========================================================================
    /// Push globals[`u8`].
    GetGlobal = 0x09,

    /// globals[`u8`] = peek(0). The value stays on the stack.
    SetGlobal = 0x0A,

    /// Push stack[base + `u8`].
    GetLocal = 0x12,

    /// stack[base + `u8`] = peek(0). The value stays on the stack.
    SetLocal = 0x13,

    /// Collapse `[u8 n]` slots: copy the top over the slot n below it, then drop n.
    ScopeExit = 0x14,

    // =========================================================================
    // Functions
    // =========================================================================
    /// Call the callee sitting `[u8 argc]` below the top with argc arguments.
    Call = 0x15,

    /// Return the top value to the caller.
    Return = 0x16,

    // =========================================================================
    // Cells (captured variables)
    // =========================================================================
    /// Push the value held in frame cell `[u8]`.
    GetCell = 0x17,

    /// Write peek(0) into frame cell `[u8]`. The value stays on the stack.
    SetCell = 0x18,

    /// Push a reference to frame cell `[u8]` itself (closure construction).
    LoadCell = 0x19,

    /// Replace frame cell `[u8]` with a fresh one. Runs each time a captured
    /// variable's declaration executes, so earlier closures keep the old cell.
    NewCell = 0x1A,

    /// Pop a code object and `[u8 n]` cell references, push a function.
    MakeFunction = 0x20,
}

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        Some(match byte {
            0x00 => OpCode::Halt,
            0x01 => OpCode::Const,
            0x02 => OpCode::Add,
            0x03 => OpCode::Sub,
            0x04 => OpCode::Mul,
            0x05 => OpCode::Div,
            0x06 => OpCode::Compare,
            0x07 => OpCode::JumpIfFalse,
            0x08 => OpCode::Jump,
            0x09 => OpCode::GetGlobal,
            0x0A => OpCode::SetGlobal,
            0x11 => OpCode::Pop,
            0x12 => OpCode::GetLocal,
            0x13 => OpCode::SetLocal,
            0x14 => OpCode::ScopeExit,
            0x15 => OpCode::Call,
            0x16 => OpCode::Return,
            0x17 => OpCode::GetCell,
            0x18 => OpCode::SetCell,
            0x19 => OpCode::LoadCell,
            0x1A => OpCode::NewCell,
            0x20 => OpCode::MakeFunction,
            _ => return None,
        })
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Halt
            | OpCode::Pop
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Return => 0,

            OpCode::Jump | OpCode::JumpIfFalse => 2,

            OpCode::Const
            | OpCode::Compare
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::ScopeExit
            | OpCode::Call
            | OpCode::GetCell
            | OpCode::SetCell
            | OpCode::LoadCell
            | OpCode::NewCell
            | OpCode::MakeFunction => 1,
        }
    }

    /// Mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Halt => "HALT",
            OpCode::Const => "CONST",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Compare => "COMPARE",
            OpCode::JumpIfFalse => "JMP_IF_FALSE",
            OpCode::Jump => "JMP",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::Pop => "POP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::ScopeExit => "SCOPE_EXIT",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::GetCell => "GET_CELL",
            OpCode::SetCell => "SET_CELL",
            OpCode::LoadCell => "LOAD_CELL",
            OpCode::NewCell => "NEW_CELL",
            OpCode::MakeFunction => "MAKE_FUNCTION",
        }
    }

    /// Net change in operand-stack depth, given the instruction's operand.
    ///
    /// `Return` and `Halt` end the code object; their effect only matters for
    /// the code that follows them, which is unreachable.
    pub fn stack_effect(self, operand: usize) -> isize {
        match self {
            // Push 1
            OpCode::Const | OpCode::GetGlobal | OpCode::GetLocal | OpCode::GetCell | OpCode::LoadCell => 1,

            // Pop 1
            OpCode::Pop
            | OpCode::Halt
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Compare
            | OpCode::JumpIfFalse => -1,

            // Neutral
            OpCode::Jump
            | OpCode::SetGlobal
            | OpCode::SetLocal
            | OpCode::SetCell
            | OpCode::NewCell
            | OpCode::Return => 0,

            // Pop n: slots collapsed, arguments consumed, cells bound
            OpCode::ScopeExit | OpCode::Call | OpCode::MakeFunction => -(operand as isize),
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::from_byte(byte).ok_or(byte)
    }
}

/// Comparison kinds carried by [`OpCode::Compare`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt = 0,
    Gt = 1,
    Eq = 2,
    Ge = 3,
    Le = 4,
    Ne = 5,
}

impl CompareOp {
    pub fn from_byte(byte: u8) -> Option<CompareOp> {
        Some(match byte {
            0 => CompareOp::Lt,
            1 => CompareOp::Gt,
            2 => CompareOp::Eq,
            3 => CompareOp::Ge,
            4 => CompareOp::Le,
            5 => CompareOp::Ne,
            _ => return None,
        })
    }

    /// Map a source operator to its comparison kind.
    pub fn from_symbol(symbol: &str) -> Option<CompareOp> {
        Some(match symbol {
            "<" => CompareOp::Lt,
            ">" => CompareOp::Gt,
            "==" => CompareOp::Eq,
            ">=" => CompareOp::Ge,
            "<=" => CompareOp::Le,
            "!=" => CompareOp::Ne,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Eq => "==",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Ne => "!=",
        }
    }

    /// Apply the comparison to any partially ordered operands.
    pub fn apply<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            CompareOp::Lt => a < b,
            CompareOp::Gt => a > b,
            CompareOp::Eq => a == b,
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
            CompareOp::Ne => a != b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OpCode; 22] = [
        OpCode::Halt,
        OpCode::Const,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Compare,
        OpCode::JumpIfFalse,
        OpCode::Jump,
        OpCode::GetGlobal,
        OpCode::SetGlobal,
        OpCode::Pop,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::ScopeExit,
        OpCode::Call,
        OpCode::Return,
        OpCode::GetCell,
        OpCode::SetCell,
        OpCode::LoadCell,
        OpCode::NewCell,
        OpCode::MakeFunction,
    ];

    #[test]
    fn test_byte_values_decode_to_themselves() {
        for op in ALL {
            assert_eq!(OpCode::from_byte(op as u8), Some(op), "{}", op.name());
        }
    }

    #[test]
    fn test_unassigned_bytes_are_rejected() {
        for byte in [0x0B, 0x10, 0x1B, 0x21, 0xFF] {
            assert_eq!(OpCode::try_from(byte), Err(byte));
        }
    }

    #[test]
    fn test_stack_effect_of_variable_ops() {
        assert_eq!(OpCode::ScopeExit.stack_effect(3), -3);
        assert_eq!(OpCode::Call.stack_effect(2), -2);
        assert_eq!(OpCode::MakeFunction.stack_effect(1), -1);
        assert_eq!(OpCode::Const.stack_effect(0), 1);
    }

    #[test]
    fn test_compare_symbols() {
        for byte in 0..6 {
            let op = CompareOp::from_byte(byte).unwrap();
            assert_eq!(CompareOp::from_symbol(op.symbol()), Some(op));
        }
        assert!(CompareOp::Le.apply(&2.0, &2.0));
        assert!(CompareOp::Lt.apply("abc", "abd"));
        assert!(!CompareOp::Ne.apply(&1.0, &1.0));
    }
}
