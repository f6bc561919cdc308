// xp-vm - Error reporting integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Integration tests for parse, compile and runtime errors.

mod common;

use common::*;

// =============================================================================
// Parse and compile errors
// =============================================================================

#[test]
fn test_parse_errors() {
    assert_eval_err!("(+ 1", Error::Parse(_));
    assert_eval_err!(")", Error::Parse(_));
    assert_eval_err!("\"unterminated", Error::Parse(_));
}

#[test]
fn test_undefined_name() {
    assert_eval_err!("(+ 1 nope)", Error::Compile(CompileError::Reference(_)));
    assert_eval_err!("(def f () missing) (f)", Error::Compile(CompileError::Reference(_)));
}

#[test]
fn test_set_of_undefined_name() {
    assert_eval_err!("(set nope 1)", Error::Compile(CompileError::UndefinedSetTarget(_)));
    assert_eval_err!(
        "(def f () (set nope 1)) (f)",
        Error::Compile(CompileError::UndefinedSetTarget(_))
    );
    let err = eval_str("(set nope 1)").unwrap_err();
    assert_eq!(err.to_string(), "Cannot set undefined variable: nope");
}

#[test]
fn test_malformed_forms() {
    assert_eval_err!("()", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(var x)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(var 1 2)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(if true)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(while true)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(+ 1 2 3)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(def f x x)", Error::Compile(CompileError::Syntax(_)));
    assert_eval_err!("(lambda (1) 1)", Error::Compile(CompileError::Syntax(_)));
}

#[test]
fn test_error_messages() {
    let err = eval_str("(+ 1 nope)").unwrap_err();
    assert_eq!(err.to_string(), "Reference error: nope is not defined");

    let err = eval_str("(def f (a b) a) (f 1)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Wrong number of arguments to f: expected 2, got 1"
    );
}

// =============================================================================
// Runtime errors
// =============================================================================

#[test]
fn test_type_errors() {
    assert_eval_err!("(+ 1 \"a\")", Error::Runtime(RuntimeError::TypeError { .. }));
    assert_eval_err!("(* \"a\" 2)", Error::Runtime(RuntimeError::TypeError { .. }));
    assert_eval_err!("(< true false)", Error::Runtime(RuntimeError::TypeError { .. }));
    assert_eval_err!("(== 1 \"1\")", Error::Runtime(RuntimeError::TypeError { .. }));
}

#[test]
fn test_condition_must_be_boolean() {
    assert_eval_err!("(if 1 2 3)", Error::Runtime(RuntimeError::TypeError { .. }));
    assert_eval_err!("(while 0 1)", Error::Runtime(RuntimeError::TypeError { .. }));
}

#[test]
fn test_not_callable() {
    assert_eval_err!("(1 2)", Error::Runtime(RuntimeError::NotCallable(_)));
    assert_eval_err!("(\"f\")", Error::Runtime(RuntimeError::NotCallable(_)));
}

#[test]
fn test_arity_mismatch() {
    assert_eval_err!(
        "(def f (a b) a) (f 1)",
        Error::Runtime(RuntimeError::ArityMismatch { expected: 2, got: 1, .. })
    );
    assert_eval_err!(
        "(native-square 1 2)",
        Error::Runtime(RuntimeError::ArityMismatch { expected: 1, got: 2, .. })
    );
}

#[test]
fn test_unbounded_recursion_overflows_stack() {
    let result = eval_with_stack("(def f () (f)) (f)", 64);
    assert_eq!(
        result,
        Err(Error::Runtime(RuntimeError::StackOverflow { capacity: 64 }))
    );
}

#[test]
fn test_deep_recursion_fits_default_stack() {
    assert_eval!(
        "(def count (n) (if (== n 0) 0 (+ 1 (count (- n 1)))))
         (count 100)",
        100.0
    );
}

#[test]
fn test_vm_recovers_after_runtime_error() {
    let mut vm = VM::new();
    vm.exec("(var x 5)").unwrap();
    assert!(vm.exec("(begin (set x 7) (+ x true))").is_err());
    // Assignments made before the error stick
    assert_eq!(vm.global("x"), Some(Value::number(7.0)));
    assert_eq!(vm.exec("(+ x 1)").unwrap(), Value::number(8.0));
}

#[test]
fn test_native_errors_propagate() {
    let mut vm = VM::new();
    vm.globals_mut().add_native("fail", 0, |_| {
        Err(RuntimeError::Native("boom".into()))
    });
    assert_eq!(
        vm.exec("(fail)"),
        Err(Error::Runtime(RuntimeError::Native("boom".into())))
    );
}
