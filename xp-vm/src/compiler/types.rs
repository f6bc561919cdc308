// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the bytecode compiler.

use thiserror::Error;

/// Error during compilation. Any error aborts the whole compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A name that no enclosing scope declares.
    #[error("Reference error: {0} is not defined")]
    Reference(String),
    /// A name with no visible binding at code generation time.
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    /// `set` on a name with no binding.
    #[error("Cannot set undefined variable: {0}")]
    UndefinedSetTarget(String),
    /// Invalid syntax.
    #[error("Syntax error: {0}")]
    Syntax(String),
    /// Constant pool overflow.
    #[error("Too many constants in {0}")]
    TooManyConstants(String),
    /// Global table overflow.
    #[error("Too many global variables")]
    TooManyGlobals,
    /// Local slot beyond a one-byte operand.
    #[error("Too many local variables in {0}")]
    TooManyLocals(String),
    /// Cell index beyond a one-byte operand.
    #[error("Too many captured variables in {0}")]
    TooManyCells(String),
    /// More call arguments or parameters than a one-byte operand holds.
    #[error("Too many arguments: {0}")]
    TooManyArguments(usize),
    /// Jump target beyond a two-byte operand.
    #[error("Jump target {0} is out of range")]
    JumpTooFar(usize),
    /// The code generator disagreed with the scope analysis.
    #[error("Internal compiler error: {0}")]
    Internal(String),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Convert an index into a one-byte operand, or build the overflow error.
pub(crate) fn operand(index: usize, overflow: impl FnOnce() -> CompileError) -> Result<u8> {
    u8::try_from(index).map_err(|_| overflow())
}
