// xp-parser - Lexer and s-expression reader for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # xp-parser
//!
//! Lexer and parser for the XP language.
//! Produces the `Exp` tree consumed by the compiler in `xp-vm`.

pub mod exp;
pub mod lexer;
pub mod parser;

pub use exp::Exp;
pub use lexer::{Lexer, LexerError, Token};
pub use parser::{ParseError, Parser, read, read_program};
