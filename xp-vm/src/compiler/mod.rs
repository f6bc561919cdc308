// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms XP expressions to code objects.
//!
//! The compiler operates in two phases:
//! 1. Analysis: build the scope tree, decide global/local/cell storage
//! 2. Code generation: emit bytecode into one code object per function

pub mod analysis;
pub mod codegen;
pub mod emit;
pub mod forms;
pub mod types;

pub use analysis::{AllocKind, Analyser, Scope, ScopeId, ScopeKind, ScopeTree};
pub use codegen::{Compiler, compile};
pub use emit::{CodeUnit, JumpLabel};
pub use types::{CompileError, Result};
