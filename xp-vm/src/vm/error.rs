// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use thiserror::Error;

/// Runtime error during VM execution. Any error aborts the current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Push beyond the configured stack capacity.
    #[error("Stack overflow: capacity of {capacity} values exceeded")]
    StackOverflow { capacity: usize },
    /// Pop or peek on an empty stack.
    #[error("Stack underflow")]
    StackUnderflow,
    /// Local slot outside the live stack.
    #[error("Local slot {index} is out of range")]
    LocalOutOfRange { index: usize },
    /// Byte that doesn't decode to an instruction.
    #[error("Unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    /// Operand of the wrong type.
    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
    /// Call on a value that isn't a function.
    #[error("Value is not callable: {0}")]
    NotCallable(String),
    /// Wrong number of arguments.
    #[error("Wrong number of arguments to {name}: expected {expected}, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Constant index {0} is out of range")]
    ConstantOutOfRange(usize),
    #[error("Global index {0} is out of range")]
    GlobalOutOfRange(usize),
    #[error("Cell index {0} is out of range")]
    CellOutOfRange(usize),
    /// Execution ran off the end of a code object.
    #[error("Instruction pointer {0} is out of bounds")]
    IpOutOfBounds(usize),
    /// Failure reported by a native function.
    #[error("{0}")]
    Native(String),
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub(crate) fn type_error(expected: &str, got: &str) -> Self {
        RuntimeError::TypeError {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
