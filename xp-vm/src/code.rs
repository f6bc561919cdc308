// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code objects: one compiled function body with its constant pool.

use std::rc::Rc;

use crate::opcode::OpCode;
use crate::value::{Object, Value};

/// A local variable known to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub name: String,
    /// Block nesting level the variable was declared at.
    pub scope_level: usize,
    /// Stack slot relative to the frame base.
    pub slot: usize,
}

/// The compiled form of a function body (or of the whole program, `main`).
#[derive(Debug, Clone)]
pub struct CodeObject {
    /// Function name (for debugging and self-recursion).
    pub name: String,

    /// Number of declared parameters.
    pub arity: usize,

    /// The bytecode: opcodes interleaved with their operands.
    pub code: Vec<u8>,

    /// Constant pool: literals and nested functions. Indices are addresses.
    pub constants: Vec<Value>,

    /// Names of every cell the body touches: inherited free variables first,
    /// then the cells this function owns.
    pub cell_names: Vec<String>,

    /// How many leading `cell_names` are supplied by the enclosing closure.
    pub free_count: usize,

    /// Current block nesting while compiling.
    pub scope_level: usize,

    /// Locals visible at the current point of compilation.
    pub locals: Vec<LocalVar>,
}

impl CodeObject {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            code: Vec::new(),
            constants: Vec::new(),
            cell_names: Vec::new(),
            free_count: 0,
            scope_level: 0,
            locals: Vec::new(),
        }
    }

    pub fn emit(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn emit_op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    /// Current instruction offset (the address of the next emitted byte).
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Add a constant to the pool and return its index.
    ///
    /// Returns `None` if the pool is full (one-byte operands address at most 256 entries).
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        // Check for existing constant to deduplicate
        for (i, existing) in self.constants.iter().enumerate() {
            if Self::constants_equal(existing, &value) {
                return Some(i as u8);
            }
        }

        let idx = self.constants.len();
        if idx > u8::MAX as usize {
            return None;
        }
        self.constants.push(value);
        Some(idx as u8)
    }

    /// Check if two constants are equal for deduplication purposes.
    /// Code objects and functions are never deduplicated.
    fn constants_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Object(Object::String(a)), Value::Object(Object::String(b))) => a == b,
            _ => false,
        }
    }

    /// Register a local at `slot` in the current scope level.
    pub fn add_local(&mut self, name: impl Into<String>, slot: usize) {
        self.locals.push(LocalVar {
            name: name.into(),
            scope_level: self.scope_level,
            slot,
        });
    }

    /// Slot of the innermost visible local called `name`.
    pub fn local_slot(&self, name: &str) -> Option<usize> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| local.slot)
    }

    /// Pop every local declared at the current scope level, returning how many went.
    pub fn pop_scope_locals(&mut self) -> usize {
        let mut count = 0;
        while self
            .locals
            .last()
            .is_some_and(|local| local.scope_level == self.scope_level)
        {
            self.locals.pop();
            count += 1;
        }
        count
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a big-endian two-byte operand.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = self.read_byte(offset)?;
        let lo = self.read_byte(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Overwrite the two-byte operand at `offset`.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    /// Code objects reachable from the constant pool, directly or through a function constant.
    pub fn nested(&self) -> impl Iterator<Item = &Rc<CodeObject>> {
        self.constants.iter().filter_map(|constant| match constant {
            Value::Object(Object::Code(code)) => Some(code),
            Value::Object(Object::Function(function)) => Some(&function.code),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FunctionObject;

    #[test]
    fn test_constants_are_deduplicated() {
        let mut code = CodeObject::new("main", 0);
        assert_eq!(code.add_constant(Value::number(10.0)), Some(0));
        assert_eq!(code.add_constant(Value::string("x")), Some(1));
        assert_eq!(code.add_constant(Value::number(10.0)), Some(0));
        assert_eq!(code.add_constant(Value::string("x")), Some(1));
        assert_eq!(code.add_constant(Value::boolean(true)), Some(2));
        assert_eq!(code.add_constant(Value::boolean(true)), Some(2));
        assert_eq!(code.constants.len(), 3);
    }

    #[test]
    fn test_functions_are_never_deduplicated() {
        let mut code = CodeObject::new("main", 0);
        let inner = Rc::new(CodeObject::new("f", 0));
        let a = code.add_constant(Value::function(FunctionObject::new(inner.clone(), vec![])));
        let b = code.add_constant(Value::function(FunctionObject::new(inner, vec![])));
        assert_ne!(a, b);
        assert_eq!(code.nested().count(), 2);
    }

    #[test]
    fn test_constant_pool_limit() {
        let mut code = CodeObject::new("main", 0);
        for i in 0..256 {
            assert_eq!(code.add_constant(Value::number(i as f64)), Some(i as u8));
        }
        assert_eq!(code.add_constant(Value::number(1000.0)), None);
        // Existing entries are still found when full
        assert_eq!(code.add_constant(Value::number(7.0)), Some(7));
    }

    #[test]
    fn test_locals_pop_by_level() {
        let mut code = CodeObject::new("f", 1);
        code.add_local("f", 0);
        code.add_local("x", 1);
        code.scope_level = 1;
        code.add_local("a", 2);
        code.add_local("x", 3);
        assert_eq!(code.local_slot("x"), Some(3));
        assert_eq!(code.pop_scope_locals(), 2);
        assert_eq!(code.local_slot("x"), Some(1));
        assert_eq!(code.local_slot("a"), None);
    }

    #[test]
    fn test_u16_operands_are_big_endian() {
        let mut code = CodeObject::new("main", 0);
        code.emit_op(OpCode::Jump);
        code.emit(0xFF);
        code.emit(0xFF);
        code.patch_u16(1, 0x0102);
        assert_eq!(code.code, vec![OpCode::Jump as u8, 0x01, 0x02]);
        assert_eq!(code.read_u16(1), Some(0x0102));
        assert_eq!(code.read_u16(2), None);
    }
}
