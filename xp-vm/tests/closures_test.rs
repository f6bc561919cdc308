// xp-vm - Functions and closures integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Integration tests for functions, recursion and captured variables.

mod common;

use common::*;

// =============================================================================
// Functions
// =============================================================================

#[test]
fn test_def_and_call() {
    assert_eval!("(def square (x) (* x x)) (square 4)", 16.0);
    assert_eval!("(def add (a b) (+ a b)) (add 2 3)", 5.0);
    assert_eval!("(def five () 5) (five)", 5.0);
}

#[test]
fn test_lambda() {
    assert_eval!("((lambda (x) (* x 2)) 21)", 42.0);
    assert_eval!("(var square (lambda (x) (* x x))) (square 6)", 36.0);
}

#[test]
fn test_functions_are_values() {
    assert_eval!("(def apply (f x) (f x)) (apply native-square 5)", 25.0);
    assert_eval!(
        "(def twice (f x) (f (f x)))
         (def inc (n) (+ n 1))
         (twice inc 5)",
        7.0
    );
}

#[test]
fn test_function_body_block() {
    assert_eval!(
        "(def f (x)
           (begin
             (var y (* x 2))
             (var z (+ y 1))
             (+ y z)))
         (f 3)",
        13.0
    );
}

#[test]
fn test_recursion_through_own_slot() {
    assert_eval!(
        "(def fact (n)
           (if (== n 1)
             1
             (* n (fact (- n 1)))))
         (fact 5)",
        120.0
    );
}

#[test]
fn test_recursion_through_cell() {
    assert_eval!(
        "(def run ()
           (begin
             (var f (lambda (n) (if (== n 0) 0 (+ n (f (- n 1))))))
             (f 4)))
         (run)",
        10.0
    );
}

#[test]
fn test_block_nested_in_expression() {
    assert_eval!(
        "(def g (x) (+ x (begin (var y 2) (* y x))))
         (g 3)",
        9.0
    );
}

// =============================================================================
// Closures
// =============================================================================

#[test]
fn test_make_adder() {
    assert_eval!(
        "(def makeAdder (x)
           (begin
             (def inner (y) (+ x y))
             inner))
         (var add5 (makeAdder 5))
         (add5 3)",
        8.0
    );
}

#[test]
fn test_closures_from_separate_calls_are_independent() {
    assert_eval!(
        "(def makeAdder (x) (lambda (y) (+ x y)))
         (var add5 (makeAdder 5))
         (var add10 (makeAdder 10))
         (+ (add5 1) (add10 1))",
        17.0
    );
}

#[test]
fn test_counter_keeps_state() {
    assert_eval!(
        "(def makeCounter ()
           (begin
             (var count 0)
             (lambda () (begin (set count (+ count 1)) count))))
         (var c (makeCounter))
         (c)
         (c)
         (c)",
        3.0
    );
}

#[test]
fn test_counters_do_not_share_state() {
    assert_eval!(
        "(def makeCounter ()
           (begin
             (var count 0)
             (lambda () (begin (set count (+ count 1)) count))))
         (var a (makeCounter))
         (var b (makeCounter))
         (a)
         (a)
         (b)
         (+ (* 10 (a)) (b))",
        32.0
    );
}

#[test]
fn test_closure_sees_later_assignment() {
    assert_eval!(
        "(def pair ()
           (begin
             (var n 1)
             (var get (lambda () n))
             (set n 10)
             (get)))
         (pair)",
        10.0
    );
}

#[test]
fn test_assignment_inside_closure_is_shared() {
    assert_eval!(
        "(def box ()
           (begin
             (var v 0)
             (var put (lambda (x) (set v x)))
             (put 42)
             v))
         (box)",
        42.0
    );
}

#[test]
fn test_captured_parameter() {
    assert_eval!(
        "(def scale (k) (lambda (x) (* k x)))
         ((scale 3) 7)",
        21.0
    );
}

#[test]
fn test_free_variables_thread_through_middle_function() {
    assert_eval!(
        "(def outer (a)
           (begin
             (def middle (b)
               (begin
                 (def inner (c) (+ a (+ b c)))
                 (inner 3)))
             (middle 2)))
         (outer 1)",
        6.0
    );
}

#[test]
fn test_closure_over_global_reads_current_value() {
    assert_eval!(
        "(var base 1)
         (def add (x) (+ base x))
         (set base 100)
         (add 1)",
        101.0
    );
}

#[test]
fn test_each_loop_iteration_captures_its_own_variable() {
    assert_eval!(
        "(def t ()
           (begin
             (var i 0)
             (var a 0)
             (var b 0)
             (while (< i 2)
               (begin
                 (var j i)
                 (if (== i 0)
                   (set a (lambda () j))
                   (set b (lambda () j)))
                 (set i (+ i 1))))
             (+ (* 10 (a)) (b))))
         (t)",
        1.0
    );
}

#[test]
fn test_recursive_block_function_survives_fresh_cells() {
    assert_eval!(
        "(def run ()
           (begin
             (var i 0)
             (var total 0)
             (while (< i 3)
               (begin
                 (var down (lambda (n) (if (== n 0) 0 (+ 1 (down (- n 1))))))
                 (set total (+ total (down i)))
                 (set i (+ i 1))))
             total))
         (run)",
        3.0
    );
}
