// xp-vm - Evaluation integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Integration tests for expressions, variables, blocks and control flow.

mod common;

use common::*;

// =============================================================================
// Literals and arithmetic
// =============================================================================

#[test]
fn test_literals() {
    assert_eval!("42", 42.0);
    assert_eval!("-3.5", -3.5);
    assert_eval!("\"hello\"", "hello");
    assert_eval!("true", true);
    assert_eval!("false", false);
}

#[test]
fn test_arithmetic() {
    assert_eval!("(+ 1 2)", 3.0);
    assert_eval!("(- 5 8)", -3.0);
    assert_eval!("(* (+ 2 3) 4)", 20.0);
    assert_eval!("(/ 10 4)", 2.5);
}

#[test]
fn test_division_by_zero_is_infinite() {
    assert_eval!("(/ 1 0)", f64::INFINITY);
    let result = eval_str("(/ 0 0)").unwrap();
    assert!(result.as_number().is_some_and(f64::is_nan));
}

#[test]
fn test_string_concatenation() {
    assert_eval!("(+ \"foo\" \"bar\")", "foobar");
    assert_eval!("(+ (+ \"a\" \"b\") \"c\")", "abc");
}

#[test]
fn test_comparisons() {
    assert_eval!("(< 1 2)", true);
    assert_eval!("(> 1 2)", false);
    assert_eval!("(>= 3 3)", true);
    assert_eval!("(<= 4 3)", false);
    assert_eval!("(== 2 2)", true);
    assert_eval!("(!= 2 2)", false);
    assert_eval!("(< \"abc\" \"abd\")", true);
    assert_eval!("(== \"x\" \"x\")", true);
    assert_eval!("(!= true false)", true);
    assert_eval!("(== false false)", true);
}

// =============================================================================
// Globals
// =============================================================================

#[test]
fn test_global_var_and_set() {
    assert_eval!("(var x 10) x", 10.0);
    assert_eval!("(var x 10) (set x (+ x 5)) x", 15.0);
    // set yields the assigned value
    assert_eval!("(var x 1) (set x 99)", 99.0);
}

#[test]
fn test_builtins() {
    assert_eval!("VERSION", 1.0);
    assert_eval!("(native-square 4)", 16.0);
    assert_eval!("(sum 2 3)", 5.0);
    assert_eval!("(print 5)", 5.0);
}

// =============================================================================
// Conditionals and loops
// =============================================================================

#[test]
fn test_if() {
    assert_eval!("(if (> 5 3) 1 2)", 1.0);
    assert_eval!("(if (< 5 3) 1 2)", 2.0);
    assert_eval!("(if false 1)", false);
    assert_eval!("(if (== 1 1) \"yes\" \"no\")", "yes");
}

#[test]
fn test_while_counts_to_ten() {
    assert_eval!(
        "(var i 0)
         (var count 0)
         (while (< i 10)
           (begin
             (set i (+ i 1))
             (set count (+ count 1))))
         count",
        10.0
    );
}

#[test]
fn test_while_yields_false() {
    assert_eval!("(while false 1)", false);
    assert_eval!("(var i 0) (while (< i 3) (set i (+ i 1)))", false);
}

// =============================================================================
// Blocks
// =============================================================================

#[test]
fn test_block_value_is_last_expression() {
    assert_eval!("(begin (var a 5) (var b 6) (* a b))", 30.0);
    assert_eval!("(begin 1 2 3)", 3.0);
}

#[test]
fn test_empty_block_is_false() {
    assert_eval!("(begin)", false);
}

#[test]
fn test_block_ending_in_declaration() {
    assert_eval!("(begin (var a 7))", 7.0);
}

#[test]
fn test_block_shadows_global() {
    assert_eval!(
        "(var x 1)
         (var y (begin (var x 2) (+ x 10)))
         (+ x y)",
        13.0
    );
}

#[test]
fn test_nested_blocks() {
    assert_eval!(
        "(begin
           (var a 1)
           (begin
             (var b 2)
             (set a (+ a b)))
           a)",
        3.0
    );
}

#[test]
fn test_block_sets_local() {
    assert_eval!("(begin (var a 1) (set a 41) (+ a 1))", 42.0);
}

// =============================================================================
// Declarations used as values
// =============================================================================

#[test]
fn test_declaration_as_if_branch() {
    assert_eval!(
        "(def g ()
           (begin
             (var a 10)
             (if true (var y 5) 0)
             (+ a 1)))
         (g)",
        11.0
    );
    assert_eval!("(def g () (begin (var a 1) (if true (var y 5) 0))) (g)", 5.0);
}

#[test]
fn test_declaration_as_loop_body() {
    assert_eval!(
        "(def f ()
           (begin
             (var i 0)
             (while (< i 3) (var j (set i (+ i 1))))
             i))
         (f)",
        3.0
    );
    assert_eval!("(begin (var a 1) (while false (var k 2)) a)", 1.0);
}

#[test]
fn test_declaration_as_operand() {
    assert_eval!(
        "(def h ()
           (begin
             (var a 1)
             (+ 100 (var z 2))
             a))
         (h)",
        1.0
    );
    assert_eval!("(begin (var a 1) (+ a (var b 2)))", 3.0);
}

#[test]
fn test_top_level_declaration_in_branch_defines_global() {
    assert_eval!("(if true (var y 5) 0) y", 5.0);
}
