// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Human-readable rendering of compiled code objects.

use std::fmt::Write;

use crate::code::CodeObject;
use crate::globals::Globals;
use crate::opcode::{CompareOp, OpCode};
use crate::value::Value;

/// Render `code` and every code object nested in its constants.
///
/// Pass the globals the code was compiled against to see global names
/// next to their indices.
pub fn disassemble(code: &CodeObject, globals: Option<&Globals>) -> String {
    let mut out = String::new();
    render(&mut out, code, globals);
    out
}

fn render(out: &mut String, code: &CodeObject, globals: Option<&Globals>) {
    let _ = writeln!(
        out,
        "\n-------------- Disassembly: {} --------------\n",
        code.name
    );

    let mut offset = 0;
    while offset < code.code.len() {
        offset = instruction(out, code, offset, globals);
    }

    for nested in code.nested() {
        render(out, nested, globals);
    }
}

/// Render one instruction and return the offset of the next.
fn instruction(out: &mut String, code: &CodeObject, offset: usize, globals: Option<&Globals>) -> usize {
    let byte = code.code[offset];
    let Some(op) = OpCode::from_byte(byte) else {
        line(out, code, offset, 1, "UNKNOWN", String::new());
        return offset + 1;
    };

    let width = 1 + op.operand_width();
    if offset + width > code.code.len() {
        let available = code.code.len() - offset;
        line(out, code, offset, available, op.name(), "<truncated>".into());
        return code.code.len();
    }

    let operand = match op.operand_width() {
        0 => String::new(),
        2 => match code.read_u16(offset + 1) {
            Some(target) => format!("{:04X}", target),
            None => String::new(),
        },
        _ => describe(op, code.code[offset + 1], code, globals),
    };
    line(out, code, offset, width, op.name(), operand);
    offset + width
}

fn describe(op: OpCode, arg: u8, code: &CodeObject, globals: Option<&Globals>) -> String {
    let index = usize::from(arg);
    let note = match op {
        OpCode::Const => code.constants.get(index).map(constant),
        OpCode::Compare => CompareOp::from_byte(arg).map(|kind| kind.symbol().to_string()),
        OpCode::GetGlobal | OpCode::SetGlobal => {
            globals.and_then(|g| g.name(index)).map(str::to_string)
        }
        OpCode::GetCell | OpCode::SetCell | OpCode::LoadCell | OpCode::NewCell => {
            code.cell_names.get(index).cloned()
        }
        _ => None,
    };
    match note {
        Some(note) => format!("{} ({})", arg, note),
        None => arg.to_string(),
    }
}

fn constant(value: &Value) -> String {
    match value.as_str() {
        Some(s) => format!("{:?}", s),
        None => value.to_string(),
    }
}

fn line(out: &mut String, code: &CodeObject, offset: usize, count: usize, name: &str, operand: String) {
    let bytes: String = code.code[offset..offset + count]
        .iter()
        .map(|byte| format!("{:02X}  ", byte))
        .collect();
    let _ = writeln!(out, "{:04X}    {:<12}{:<20}{}", offset, bytes, name, operand);
}
