// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared utility functions for the VM.

use crate::value::Value;
use crate::vm::{Result, RuntimeError};

/// Extract a number, or report what was found instead.
pub fn expect_number(value: &Value) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::type_error("number", value.type_name()))
}

/// Extract a boolean. Conditions must be real booleans; there is no truthiness.
pub fn expect_bool(value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| RuntimeError::type_error("boolean", value.type_name()))
}

/// Check function arity, returning an ArityMismatch if the counts differ.
pub fn check_arity(name: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}
