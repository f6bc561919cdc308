// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shape checks for special forms, shared by analysis and code generation.

use xp_parser::Exp;

use super::types::{CompileError, Result};

/// `(var name init)` and `(set name value)`.
pub struct Binding<'a> {
    pub name: &'a str,
    pub value: &'a Exp,
}

/// Parameters and body of `(def name (params...) body)` or `(lambda (params...) body)`.
pub struct Function<'a> {
    pub params: Vec<&'a str>,
    pub body: &'a Exp,
}

/// `(if cond then [else])`.
pub struct Conditional<'a> {
    pub test: &'a Exp,
    pub then: &'a Exp,
    pub otherwise: Option<&'a Exp>,
}

/// `(while cond body)`.
pub struct Loop<'a> {
    pub test: &'a Exp,
    pub body: &'a Exp,
}

/// Arithmetic and comparison operators.
pub fn is_operator(name: &str) -> bool {
    matches!(
        name,
        "+" | "-" | "*" | "/" | "<" | ">" | "==" | ">=" | "<=" | "!="
    )
}

fn syntax<T>(message: impl Into<String>) -> Result<T> {
    Err(CompileError::Syntax(message.into()))
}

fn symbol<'a>(exp: &'a Exp, what: &str, form: &str) -> Result<&'a str> {
    exp.as_symbol().ok_or_else(|| {
        CompileError::Syntax(format!("{} in `{}` must be a symbol, got {}", what, form, exp))
    })
}

/// `items` is the whole form, head symbol included.
pub fn binding<'a>(items: &'a [Exp], form: &str) -> Result<Binding<'a>> {
    let [_, name, value] = items else {
        return syntax(format!("`{}` expects a name and a value", form));
    };
    Ok(Binding {
        name: symbol(name, "name", form)?,
        value,
    })
}

/// The function name and its parameters and body.
pub fn def(items: &[Exp]) -> Result<(&str, Function<'_>)> {
    let [_, name, params, body] = items else {
        return syntax("`def` expects a name, a parameter list and a body");
    };
    let function = Function {
        params: params_of(params, "def")?,
        body,
    };
    Ok((symbol(name, "name", "def")?, function))
}

pub fn lambda(items: &[Exp]) -> Result<Function<'_>> {
    let [_, params, body] = items else {
        return syntax("`lambda` expects a parameter list and a body");
    };
    Ok(Function {
        params: params_of(params, "lambda")?,
        body,
    })
}

fn params_of<'a>(params: &'a Exp, form: &str) -> Result<Vec<&'a str>> {
    let Some(list) = params.as_list() else {
        return syntax(format!("parameters of `{}` must be a list, got {}", form, params));
    };
    list.iter()
        .map(|param| symbol(param, "parameter", form))
        .collect()
}

pub fn conditional(items: &[Exp]) -> Result<Conditional<'_>> {
    match items {
        [_, test, then] => Ok(Conditional {
            test,
            then,
            otherwise: None,
        }),
        [_, test, then, otherwise] => Ok(Conditional {
            test,
            then,
            otherwise: Some(otherwise),
        }),
        _ => syntax("`if` expects a condition, a branch and an optional else branch"),
    }
}

pub fn while_loop(items: &[Exp]) -> Result<Loop<'_>> {
    let [_, test, body] = items else {
        return syntax("`while` expects a condition and a body");
    };
    Ok(Loop { test, body })
}

/// Operands of a binary operator.
pub fn operands<'a>(items: &'a [Exp], op: &str) -> Result<(&'a Exp, &'a Exp)> {
    let [_, lhs, rhs] = items else {
        return syntax(format!("`{}` expects exactly two operands", op));
    };
    Ok((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xp_parser::Parser;

    fn items(src: &str) -> Vec<Exp> {
        match Parser::parse_str(src).unwrap().unwrap() {
            Exp::List(items) => items,
            other => panic!("expected a list, got {}", other),
        }
    }

    #[test]
    fn test_def_shape() {
        let form = items("(def add (a b) (+ a b))");
        let (name, function) = def(&form).unwrap();
        assert_eq!(name, "add");
        assert_eq!(function.params, vec!["a", "b"]);
    }

    #[test]
    fn test_bad_shapes() {
        assert!(matches!(binding(&items("(var x)"), "var"), Err(CompileError::Syntax(_))));
        assert!(matches!(binding(&items("(var 1 2)"), "var"), Err(CompileError::Syntax(_))));
        assert!(matches!(lambda(&items("(lambda x x)")), Err(CompileError::Syntax(_))));
        assert!(matches!(lambda(&items("(lambda (1) x)")), Err(CompileError::Syntax(_))));
        assert!(matches!(conditional(&items("(if c)")), Err(CompileError::Syntax(_))));
        assert!(matches!(operands(&items("(+ 1 2 3)"), "+"), Err(CompileError::Syntax(_))));
    }
}
