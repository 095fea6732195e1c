//! Tree-walking evaluator and built-in runtime for the yc language.

mod builtins;
mod error;
mod evaluator;

pub use error::InterpreterError;
pub use evaluator::{ControlSignal, Evaluator};

use ychir::Program;

/// Runs a parsed program to completion: registers its declarations, runs
/// its global variable initializers in source order, then calls `main` if
/// one is declared.
pub fn run(program: &Program) -> Result<(), InterpreterError> {
    let mut evaluator = Evaluator::new();
    evaluator.run_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_source(src: &str) -> Result<(), InterpreterError> {
        let program = ychir::parse_source(src).expect("source parses");
        run(&program)
    }

    #[test]
    fn runs_a_function_returning_an_arithmetic_expression() {
        let src = r#"
            function add(a: int32, b: int32): int32 {
                return a + b;
            }
            function main(): void {
                var sum: int32 = add(2, 3);
                print(sum);
            }
        "#;
        run_source(src).expect("program evaluates without error");
    }

    #[test]
    fn while_loop_counts_down() {
        let src = r#"
            function main(): void {
                var n: int32 = 3;
                while (n > 0) {
                    n = n - 1;
                }
                print(n);
            }
        "#;
        run_source(src).expect("while loop terminates and runs cleanly");
    }

    #[test]
    fn move_invalidates_the_source_binding() {
        let src = r#"
            function main(): void {
                var a: int32 = 1;
                var b: int32 = 0;
                move(b, a);
            }
        "#;
        run_source(src).expect("move between locals succeeds");
    }

    #[test]
    fn const_reassignment_through_copy_is_rejected() {
        let src = r#"
            function main(): void {
                const a: int32 = 1;
                var b: int32 = 2;
                a = b;
            }
        "#;
        let err = run_source(src).expect_err("assigning to a const binding must fail");
        assert!(matches!(err, InterpreterError::ConstError { .. }));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let src = r#"
            function main(): void {
                var a: int32 = 1;
                var b: int32 = 0;
                var c: int32 = a / b;
            }
        "#;
        let err = run_source(src).expect_err("division by zero must fail");
        assert!(matches!(err, InterpreterError::InternalError { .. }));
    }

    #[test]
    fn declared_array_type_is_zero_initialized_and_indexable() {
        let src = r#"
            function main(): int32 {
                var a: int32[3];
                for (var i: int32 = 0; i < 3; i = i + 1;) {
                    a[i] = i * i;
                }
                print(a[2]);
                return 0;
            }
        "#;
        run_source(src).expect("declared-length array is pre-materialized and writable");
    }

    #[test]
    fn array_index_out_of_bounds_is_reported() {
        let src = r#"
            function main(): void {
                var xs: int32 = [1, 2, 3];
                var y: int32 = xs[5];
            }
        "#;
        let err = run_source(src);
        assert!(err.is_err());
    }

    #[test]
    fn named_conversion_builtins_cast_between_primitives() {
        let src = r#"
            function main(): void {
                var f: fp64 = 3.5;
                var i: int32 = to_int32(f);
                var c: char = to_char(i);
                var b: uint8 = to_uint8(i);
                print(i);
                print(c);
                print(b);
            }
        "#;
        run_source(src).expect("to_int32/to_char/to_uint8 dispatch as named builtins");
    }

    #[test]
    fn classes_construct_and_read_back_fields() {
        let src = r#"
            class Point {
                var x: int32;
                var y: int32;
                function new(x: int32, y: int32): void {
                    this.x = x;
                    this.y = y;
                }
            }
            function main(): void {
                var p: Point = Point.new(1, 2);
                print(p.x);
            }
        "#;
        run_source(src).expect("class construction and field access succeed");
    }

    #[test]
    fn bare_class_name_call_constructs_like_dot_new() {
        let src = r#"
            class Box {
                var v: int32;
                function new(v: int32): void {
                    this.v = v;
                }
            }
            function main(): void {
                var b: Box = Box(7);
                print(b.v);
            }
        "#;
        run_source(src).expect("ClassName(args) constructs the same as ClassName.new(args)");
    }

    #[test]
    fn match_runs_the_first_matching_arm() {
        let src = r#"
            union Shape {
                class Circle {
                    var r: int32;
                    function new(r: int32): void {
                        this.r = r;
                    }
                }
                class Square { var side: int32; }
            }
            function main(): void {
                var s: Shape = Circle(5);
                match (s) {
                    Circle(c) { print(c.r); }
                    Square { print(0); }
                }
            }
        "#;
        run_source(src).expect("match dispatches to the first arm whose tag matches the variant");
    }
}
