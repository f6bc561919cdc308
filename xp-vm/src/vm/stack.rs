// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Value stack for the VM.

use crate::value::Value;

use super::{Result, RuntimeError};

/// The VM's operand stack, bounded by a fixed capacity.
#[derive(Debug)]
pub struct ValueStack {
    values: Vec<Value>,
    capacity: usize,
}

impl ValueStack {
    /// Create an empty stack holding at most `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a value onto the stack.
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.values.len() >= self.capacity {
            return Err(RuntimeError::StackOverflow {
                capacity: self.capacity,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Peek at a value on the stack without removing it.
    /// `distance` is the offset from the top (0 = top).
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&Value> {
        let len = self.values.len();
        if distance >= len {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(&self.values[len - 1 - distance])
    }

    /// Get a value at an absolute index.
    #[inline]
    pub fn get(&self, index: usize) -> Result<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or(RuntimeError::LocalOutOfRange { index })
    }

    /// Set a value at an absolute index.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(RuntimeError::LocalOutOfRange { index })?;
        *slot = value;
        Ok(())
    }

    /// Get the current stack size.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Truncate the stack to the given size.
    #[inline]
    pub fn truncate(&mut self, size: usize) {
        self.values.truncate(size);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// The top `n` values, bottom first.
    pub fn top(&self, n: usize) -> Result<&[Value]> {
        let start = self
            .values
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(&self.values[start..])
    }

    /// Pop n values and return them in push order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        let start = self.values.len() - n;
        Ok(self.values.drain(start..).collect())
    }

    /// Drop `n` slots below the top, keeping the top value.
    pub fn collapse(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let len = self.values.len();
        if n >= len {
            return Err(RuntimeError::StackUnderflow);
        }
        self.values.swap(len - 1, len - 1 - n);
        self.values.truncate(len - n);
        Ok(())
    }
}
