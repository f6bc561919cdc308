// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic opcode handlers: Add, Sub, Mul, Div, Compare.

use crate::opcode::{CompareOp, OpCode};
use crate::utils::expect_number;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute an arithmetic or comparison opcode.
    pub(crate) fn execute_arithmetic(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Add => self.execute_add(),
            OpCode::Sub => self.binary_num_op(|a, b| a - b),
            OpCode::Mul => self.binary_num_op(|a, b| a * b),
            // IEEE division: x/0 is an infinity, 0/0 is NaN
            OpCode::Div => self.binary_num_op(|a, b| a / b),
            OpCode::Compare => {
                let kind = self.read_byte()?;
                self.execute_compare(kind)
            }
            _ => Err(RuntimeError::Internal(format!(
                "execute_arithmetic: unexpected opcode {:?}",
                op
            ))),
        }
    }

    /// Numbers add; two strings concatenate.
    fn execute_add(&mut self) -> Result<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let result = match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => Value::number(x + y),
            _ => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Value::string(&format!("{}{}", x, y)),
                _ => {
                    return Err(RuntimeError::type_error(
                        "two numbers or two strings",
                        &format!("{} + {}", a.type_name(), b.type_name()),
                    ));
                }
            },
        };
        self.stack.push(result)
    }

    fn binary_num_op(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let result = f(expect_number(&a)?, expect_number(&b)?);
        self.stack.push(Value::number(result))
    }

    /// Numbers and strings order; booleans only test for equality.
    fn execute_compare(&mut self, kind: u8) -> Result<()> {
        let kind = CompareOp::from_byte(kind)
            .ok_or_else(|| RuntimeError::Internal(format!("unknown comparison kind {}", kind)))?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;

        let result = if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            kind.apply(&x, &y)
        } else if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
            kind.apply(x, y)
        } else if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool())
            && matches!(kind, CompareOp::Eq | CompareOp::Ne)
        {
            kind.apply(&x, &y)
        } else {
            return Err(RuntimeError::type_error(
                "comparable operands",
                &format!("{} {} {}", a.type_name(), kind.symbol(), b.type_name()),
            ));
        };
        self.stack.push(Value::boolean(result))
    }
}
