// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The global variable table.
//!
//! Globals are addressed by index from bytecode, so the table only grows:
//! defining an existing name returns its slot rather than allocating a new one.

use tracing::trace;

use crate::value::{NativeObject, Value};
use crate::vm::{Result, RuntimeError};

/// One named global slot.
#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub value: Value,
}

/// Append-only table of top-level bindings.
#[derive(Debug, Default)]
pub struct Globals {
    vars: Vec<GlobalVar>,
}

impl Globals {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table preloaded with the built-in constants and natives.
    pub fn with_builtins() -> Self {
        let mut globals = Self::new();
        crate::builtins::install(&mut globals);
        globals
    }

    /// Index of `name`, scanning from the most recent definition.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vars.iter().rposition(|var| var.name == name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Define `name` and return its slot. An existing name keeps its slot and value.
    pub fn define(&mut self, name: &str) -> usize {
        if let Some(index) = self.index_of(name) {
            return index;
        }
        trace!(name, index = self.vars.len(), "defining global");
        self.vars.push(GlobalVar {
            name: name.to_string(),
            value: Value::Number(0.0),
        });
        self.vars.len() - 1
    }

    /// Add a named constant. An existing name is left untouched.
    pub fn add_constant(&mut self, name: &str, value: Value) {
        if self.exists(name) {
            return;
        }
        self.vars.push(GlobalVar {
            name: name.to_string(),
            value,
        });
    }

    /// Add a host function of fixed arity. An existing name is left untouched.
    pub fn add_native(
        &mut self,
        name: &str,
        arity: usize,
        function: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) {
        self.add_constant(name, Value::native(NativeObject::new(name, arity, function)));
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        self.vars
            .get(index)
            .map(|var| var.value.clone())
            .ok_or(RuntimeError::GlobalOutOfRange(index))
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let var = self
            .vars
            .get_mut(index)
            .ok_or(RuntimeError::GlobalOutOfRange(index))?;
        var.value = value;
        Ok(())
    }

    /// Value of the most recent global called `name`.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.index_of(name).map(|index| self.vars[index].value.clone())
    }

    /// Name of the global at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.vars.get(index).map(|var| var.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|var| var.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
