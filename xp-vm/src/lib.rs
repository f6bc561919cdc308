// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for XP.
//!
//! Source text is read by `xp-parser`, analysed and compiled into code
//! objects, then executed by the VM:
//!
//! ```
//! use xp_vm::{VM, Value};
//!
//! let mut vm = VM::new();
//! let result = vm.exec("(def square (x) (* x x)) (square 4)").unwrap();
//! assert_eq!(result, Value::number(16.0));
//! ```

pub mod builtins;
pub mod code;
pub mod compiler;
pub mod disassembler;
pub mod error;
pub mod globals;
pub mod opcode;
pub mod utils;
pub mod value;
pub mod vm;

pub use code::{CodeObject, LocalVar};
pub use compiler::{CompileError, compile};
pub use disassembler::disassemble;
pub use error::Error;
pub use globals::{GlobalVar, Globals};
pub use opcode::{CompareOp, OpCode};
pub use value::{CellObject, FunctionObject, NativeObject, Object, Value};
pub use vm::{DEFAULT_STACK_CAPACITY, RuntimeError, VM, VmConfig};
