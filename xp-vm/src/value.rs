// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values and heap objects.
//!
//! Numbers and booleans are carried by value. Everything else lives behind an
//! `Rc` handle inside [`Object`], so copying a value never copies the object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::code::CodeObject;
use crate::utils::check_arity;
use crate::vm::Result;

/// A value on the operand stack, in a constant pool, a global or a cell.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Object(Object),
}

/// Heap object variants.
#[derive(Debug, Clone)]
pub enum Object {
    String(Rc<str>),
    Code(Rc<CodeObject>),
    Native(Rc<NativeObject>),
    Function(Rc<FunctionObject>),
    Cell(Rc<CellObject>),
}

/// Type tag of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    String,
    Code,
    Native,
    Function,
    Cell,
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::String(_) => ObjectType::String,
            Object::Code(_) => ObjectType::Code,
            Object::Native(_) => ObjectType::Native,
            Object::Function(_) => ObjectType::Function,
            Object::Cell(_) => ObjectType::Cell,
        }
    }
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn boolean(b: bool) -> Self {
        Value::Boolean(b)
    }

    pub fn string(s: &str) -> Self {
        Value::Object(Object::String(Rc::from(s)))
    }

    pub fn code(code: Rc<CodeObject>) -> Self {
        Value::Object(Object::Code(code))
    }

    pub fn function(function: FunctionObject) -> Self {
        Value::Object(Object::Function(Rc::new(function)))
    }

    pub fn native(native: NativeObject) -> Self {
        Value::Object(Object::Native(Rc::new(native)))
    }

    pub fn cell(cell: Rc<CellObject>) -> Self {
        Value::Object(Object::Cell(cell))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Object(Object::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&Rc<CodeObject>> {
        match self {
            Value::Object(Object::Code(code)) => Some(code),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionObject>> {
        match self {
            Value::Object(Object::Function(function)) => Some(function),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Rc<CellObject>> {
        match self {
            Value::Object(Object::Cell(cell)) => Some(cell),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Object(obj) => match obj.object_type() {
                ObjectType::String => "string",
                ObjectType::Code => "code",
                ObjectType::Native => "native",
                ObjectType::Function => "function",
                ObjectType::Cell => "cell",
            },
        }
    }
}

/// Numbers and booleans compare by value, strings by content, and every
/// other object by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => match (a, b) {
                (Object::String(x), Object::String(y)) => x == y,
                (Object::Code(x), Object::Code(y)) => Rc::ptr_eq(x, y),
                (Object::Native(x), Object::Native(y)) => Rc::ptr_eq(x, y),
                (Object::Function(x), Object::Function(y)) => Rc::ptr_eq(x, y),
                (Object::Cell(x), Object::Cell(y)) => Rc::ptr_eq(x, y),
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Object(Object::String(s)) => write!(f, "{}", s),
            Value::Object(Object::Code(code)) => write!(f, "<code {}>", code.name),
            Value::Object(Object::Native(native)) => write!(f, "<native {}>", native.name),
            Value::Object(Object::Function(function)) => {
                write!(f, "<fn {}>", function.code.name)
            }
            Value::Object(Object::Cell(cell)) => write!(f, "<cell {}>", cell.get()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

// ============================================================================
// Functions and cells
// ============================================================================

/// Signature of a host function. Receives exactly `arity` arguments.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value>;

/// A host function callable from XP code.
pub struct NativeObject {
    pub name: String,
    pub arity: usize,
    function: Box<NativeFn>,
}

impl NativeObject {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        function: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            function: Box::new(function),
        }
    }

    /// Call the host function. The argument count is checked first, so the
    /// function itself may index `args` freely.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        check_arity(&self.name, self.arity, args.len())?;
        (self.function)(args)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A callable function: a code object plus the cells it captured.
///
/// `cells[i]` is the cell for `code.cell_names[i]`, for `i < code.free_count`.
#[derive(Debug)]
pub struct FunctionObject {
    pub code: Rc<CodeObject>,
    pub cells: Vec<Rc<CellObject>>,
}

impl FunctionObject {
    pub fn new(code: Rc<CodeObject>, cells: Vec<Rc<CellObject>>) -> Self {
        Self { code, cells }
    }

    pub fn name(&self) -> &str {
        &self.code.name
    }

    pub fn arity(&self) -> usize {
        self.code.arity
    }
}

/// A shared mutable box holding a captured variable.
#[derive(Debug)]
pub struct CellObject(RefCell<Value>);

impl CellObject {
    pub fn new(value: Value) -> Rc<Self> {
        Rc::new(Self(RefCell::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }
}
