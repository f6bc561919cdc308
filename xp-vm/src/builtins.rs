// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Constants and native functions every VM starts with.

use crate::globals::Globals;
use crate::utils::expect_number;
use crate::value::Value;
use crate::vm::Result;

/// Language version reported by the `VERSION` global.
pub const VERSION: f64 = 1.0;

/// Install the built-ins into `globals`.
pub fn install(globals: &mut Globals) {
    globals.add_constant("VERSION", Value::number(VERSION));
    globals.add_native("native-square", 1, builtin_square);
    globals.add_native("sum", 2, builtin_sum);
    globals.add_native("print", 1, builtin_print);
}

pub(crate) fn builtin_square(args: &[Value]) -> Result<Value> {
    let x = expect_number(&args[0])?;
    Ok(Value::number(x * x))
}

pub(crate) fn builtin_sum(args: &[Value]) -> Result<Value> {
    let a = expect_number(&args[0])?;
    let b = expect_number(&args[1])?;
    Ok(Value::number(a + b))
}

/// Print a value followed by a newline and return it.
pub(crate) fn builtin_print(args: &[Value]) -> Result<Value> {
    println!("{}", args[0]);
    Ok(args[0].clone())
}
