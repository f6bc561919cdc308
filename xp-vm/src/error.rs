// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Umbrella error for running source text end to end.

use thiserror::Error;
use xp_parser::ParseError;

use crate::compiler::CompileError;
use crate::vm::RuntimeError;

/// Any failure from [`VM::exec`](crate::VM::exec): reading, compiling or running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result type for end-to-end execution.
pub type Result<T> = std::result::Result<T, Error>;
