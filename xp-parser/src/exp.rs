// xp-parser - Lexer and s-expression reader for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The expression tree handed to the compiler.

use std::fmt;

/// A parsed XP expression.
///
/// The tree is immutable once read; the compiler identifies scope-introducing
/// nodes by address, so it must not be moved between analysis and code generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    Number(f64),
    String(String),
    Symbol(String),
    List(Vec<Exp>),
}

impl Exp {
    pub fn number(n: f64) -> Self {
        Exp::Number(n)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Exp::String(s.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Exp::Symbol(name.into())
    }

    pub fn list(items: Vec<Exp>) -> Self {
        Exp::List(items)
    }

    /// The symbol name, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Exp::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Exp]> {
        match self {
            Exp::List(items) => Some(items),
            _ => None,
        }
    }

    /// The head symbol of a non-empty list, e.g. `"var"` for `(var x 1)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(Exp::as_symbol)
    }

    /// Whether this is a list whose head is the symbol `tag`.
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Number(n) => write!(f, "{}", n),
            Exp::String(s) => write!(f, "{:?}", s),
            Exp::Symbol(name) => write!(f, "{}", name),
            Exp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}
