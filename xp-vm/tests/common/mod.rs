// xp-vm - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared test helpers and utilities for XP integration tests.
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Available Helpers
//!
//! - [`eval_str`] - Run a program in a fresh VM
//! - [`eval_with_stack`] - Run a program with a custom stack capacity
//! - [`compile_str`] - Compile a program against fresh globals
//!
//! # Macros
//!
//! - [`assert_eval!`] - Assert that a program evaluates to an expected value
//! - [`assert_eval_err!`] - Assert that a program fails, optionally matching the error

use std::rc::Rc;

// Re-export common types for convenience
#[allow(unused_imports)]
pub use xp_vm::{CodeObject, CompileError, Error, Globals, OpCode, RuntimeError, VM, Value, VmConfig};

/// Run `source` in a fresh VM with the built-in globals.
pub fn eval_str(source: &str) -> Result<Value, Error> {
    VM::new().exec(source)
}

/// Run `source` in a fresh VM whose stack holds at most `capacity` values.
#[allow(dead_code)]
pub fn eval_with_stack(source: &str, capacity: usize) -> Result<Value, Error> {
    VM::with_config(VmConfig {
        stack_capacity: capacity,
    })
    .exec(source)
}

/// Compile `source` in a fresh VM, returning the `main` code object.
///
/// # Panics
///
/// Panics if the program fails to parse or compile.
#[allow(dead_code)]
pub fn compile_str(source: &str) -> Rc<CodeObject> {
    VM::new()
        .compile(source)
        .unwrap_or_else(|e| panic!("failed to compile '{}': {}", source, e))
}

/// Assert that a program evaluates to the expected value.
///
/// The expected value is anything convertible into a [`Value`]: `f64`, `bool` or `&str`.
#[macro_export]
macro_rules! assert_eval {
    ($input:expr, $expected:expr) => {
        let result = $crate::common::eval_str($input);
        assert!(
            result.is_ok(),
            "Failed to evaluate '{}': {:?}",
            $input,
            result.as_ref().err()
        );
        assert_eq!(
            result.unwrap(),
            $crate::common::Value::from($expected),
            "Evaluation of '{}' did not match expected",
            $input
        );
    };
}

/// Assert that a program fails, optionally matching the error against a pattern.
#[macro_export]
macro_rules! assert_eval_err {
    ($input:expr) => {
        let result = $crate::common::eval_str($input);
        assert!(
            result.is_err(),
            "Expected error for '{}' but got {:?}",
            $input,
            result.ok()
        );
    };
    ($input:expr, $pattern:pat) => {
        let result = $crate::common::eval_str($input);
        assert!(
            matches!(result, Err($pattern)),
            "Expected {} for '{}' but got {:?}",
            stringify!($pattern),
            $input,
            result
        );
    };
}
