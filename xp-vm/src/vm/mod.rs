// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing XP bytecode.

pub mod error;
pub mod frame;
pub mod handlers;
pub mod stack;

use std::rc::Rc;

use tracing::{debug, trace};

use crate::code::CodeObject;
use crate::compiler;
use crate::globals::Globals;
use crate::opcode::OpCode;
use crate::value::Value;

pub use error::{Result, RuntimeError};
pub use frame::CallFrame;
pub use handlers::control::ControlFlow;
pub use stack::ValueStack;

/// Operand stack capacity used unless configured otherwise.
pub const DEFAULT_STACK_CAPACITY: usize = 512;

/// VM tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of values on the operand stack. Deep recursion runs into this.
    pub stack_capacity: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

/// The XP virtual machine.
///
/// Globals survive between runs, so one VM can execute a program piece by
/// piece. The stack and call frames are reset at the start of every run and
/// after every error.
pub struct VM {
    /// Value stack.
    stack: ValueStack,

    /// Call frame stack.
    frames: Vec<CallFrame>,

    /// Global variables, shared with the compiler.
    globals: Globals,

    config: VmConfig,
}

impl VM {
    /// Create a VM with the default configuration and the built-in globals.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: ValueStack::with_capacity(config.stack_capacity),
            frames: Vec::new(),
            globals: Globals::with_builtins(),
            config,
        }
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Mutable access to the globals, e.g. to register host functions.
    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    /// Current value of the global called `name`.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    /// Parse and compile `source` against this VM's globals without running it.
    pub fn compile(&mut self, source: &str) -> crate::error::Result<Rc<CodeObject>> {
        let program = xp_parser::read_program(source)?;
        Ok(compiler::compile(&program, &mut self.globals)?)
    }

    /// Parse, compile and run `source`, returning the program's value.
    pub fn exec(&mut self, source: &str) -> crate::error::Result<Value> {
        let code = self.compile(source)?;
        Ok(self.run(code)?)
    }

    /// Execute a compiled `main` code object.
    pub fn run(&mut self, code: Rc<CodeObject>) -> Result<Value> {
        debug!(name = %code.name, bytes = code.code.len(), "running");
        self.stack.clear();
        self.frames.clear();

        let result = CallFrame::new(code, 0, &[]).and_then(|frame| {
            self.frames.push(frame);
            self.run_loop()
        });

        if let Err(error) = &result {
            debug!(%error, "run failed; resetting stack");
            self.stack.clear();
            self.frames.clear();
        }
        result
    }

    fn run_loop(&mut self) -> Result<Value> {
        loop {
            let op = self.read_op()?;

            match op {
                // Constants & Stack - handled inline (simple operations)
                OpCode::Halt => {
                    let result = self.stack.pop()?;
                    self.frames.clear();
                    return Ok(result);
                }
                OpCode::Const => {
                    let index = usize::from(self.read_byte()?);
                    let val = self.get_constant(index)?;
                    self.stack.push(val)?;
                }
                OpCode::Pop => {
                    self.stack.pop()?;
                }

                // Arithmetic - delegated to handler
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Compare => {
                    self.execute_arithmetic(op)?;
                }

                // Variables - delegated to handler
                OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::ScopeExit => {
                    self.execute_variables(op)?;
                }

                // Cells - delegated to handler
                OpCode::GetCell
                | OpCode::SetCell
                | OpCode::LoadCell
                | OpCode::NewCell
                | OpCode::MakeFunction => {
                    self.execute_cells(op)?;
                }

                // Control flow - delegated to handler
                OpCode::Jump | OpCode::JumpIfFalse | OpCode::Call | OpCode::Return => {
                    match self.execute_control(op)? {
                        ControlFlow::Continue => {}
                        ControlFlow::Return(result) => return Ok(result),
                    }
                }
            }
        }
    }

    fn read_op(&mut self) -> Result<OpCode> {
        let ip = self.frame()?.ip;
        let byte = self.read_byte()?;
        let op = OpCode::from_byte(byte).ok_or(RuntimeError::UnknownOpcode(byte))?;
        trace!(ip, op = op.name(), depth = self.stack.len(), "exec");
        Ok(op)
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let frame = self.frame_mut()?;
        let byte = frame
            .code
            .read_byte(frame.ip)
            .ok_or(RuntimeError::IpOutOfBounds(frame.ip))?;
        frame.ip += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub(crate) fn frame(&self) -> Result<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::Internal("No active frame".into()))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("No active frame".into()))
    }

    fn get_constant(&self, index: usize) -> Result<Value> {
        self.frame()?
            .code
            .constants
            .get(index)
            .cloned()
            .ok_or(RuntimeError::ConstantOutOfRange(index))
    }

    /// Jump to an absolute offset in the current code object.
    pub(crate) fn jump(&mut self, target: u16) -> Result<()> {
        let frame = self.frame_mut()?;
        let target = usize::from(target);
        if target > frame.code.code.len() {
            return Err(RuntimeError::IpOutOfBounds(target));
        }
        frame.ip = target;
        Ok(())
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
