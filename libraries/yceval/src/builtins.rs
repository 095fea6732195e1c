//! The small set of global functions the language exposes without a
//! user-level declaration, grounded on `runtime_bind`/`runtime_print`/
//! `runtime_debug`/`runtime_string_size` in
//! `examples/original_source/src/runtime.cpp`.

use crate::error::InterpreterError;
use crate::evaluator::Evaluator;
use ychir::{BaseType, Expr, Position, TypeDecl};
use ycvalue::{Cell, Value};

/// Tries to run `name` as a builtin. Returns `Ok(None)` when `name` isn't
/// one of the reserved builtin names, so the caller falls back to looking
/// it up as a user-defined function.
pub fn dispatch(
    ev: &mut Evaluator,
    name: &str,
    args: &[Expr],
    pos: Position,
) -> Result<Option<Cell>, InterpreterError> {
    match name {
        "print" => {
            run_print(ev, args, pos)?;
            Ok(Some(void_cell(ev)))
        }
        "debug" => {
            run_debug(ev, args, pos)?;
            Ok(Some(void_cell(ev)))
        }
        "__string_size" => Ok(Some(string_size(ev, args, pos)?)),
        "to_int32" => Ok(Some(cast_builtin(ev, args, BaseType::Int32, name, pos)?)),
        "to_uint8" => Ok(Some(cast_builtin(ev, args, BaseType::Uint8, name, pos)?)),
        "to_fp32" => Ok(Some(cast_builtin(ev, args, BaseType::Fp32, name, pos)?)),
        "to_fp64" => Ok(Some(cast_builtin(ev, args, BaseType::Fp64, name, pos)?)),
        "to_char" => Ok(Some(cast_builtin(ev, args, BaseType::Char, name, pos)?)),
        "import" => {
            let path = single_string_arg(ev, args, "import", pos)?;
            Ok(Some(ev.import_module(&path, pos)?))
        }
        "open" => Err(InterpreterError::NotImplemented {
            feature: "open".to_string(),
            pos,
        }),
        _ => Ok(None),
    }
}

fn void_cell(ev: &mut Evaluator) -> Cell {
    let cell = Cell::new();
    ev.registry.alloc_into(&cell, Value::Void, TypeDecl::simple(BaseType::Void));
    cell
}

fn single_string_arg(
    ev: &mut Evaluator,
    args: &[Expr],
    builtin: &str,
    pos: Position,
) -> Result<String, InterpreterError> {
    if args.len() != 1 {
        return Err(InterpreterError::ArityError {
            name: builtin.to_string(),
            expected: 1,
            found: args.len(),
            pos,
        });
    }
    let cell = ev.eval_expr(&args[0])?;
    match ev.registry.value_of(&cell) {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(InterpreterError::TypeError {
            expected: "str".to_string(),
            found: other.type_name().to_string(),
            pos,
        }),
        None => Err(InterpreterError::InternalError {
            message: "use of a value after it was moved out of this binding".to_string(),
            pos,
        }),
    }
}

/// `print(args…)`: each argument rendered followed by a space, then one
/// trailing newline for the whole call — matching
/// `runtime_print`'s per-argument `std::cout << ... << " "` loop capped
/// with a single `std::endl`, not one newline per argument.
fn run_print(ev: &mut Evaluator, args: &[Expr], pos: Position) -> Result<(), InterpreterError> {
    let mut out = String::new();
    for arg in args {
        let cell = ev.eval_expr(arg)?;
        let value = ev
            .registry
            .value_of(&cell)
            .cloned()
            .ok_or_else(|| InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            })?;
        if matches!(value, Value::Array(_)) {
            return Err(InterpreterError::TypeError {
                expected: "a scalar printable type".to_string(),
                found: "array".to_string(),
                pos,
            });
        }
        out.push_str(&format_value(ev, &value, false));
        out.push(' ');
    }
    println!("{out}");
    Ok(())
}

/// `debug(args…)`: const-flag, reference count, declared type, and value
/// for each argument, one block per argument, grounded on
/// `runtime_debug`'s `Const Flag`/`Reference Counter`/`Type`/`Value` lines.
fn run_debug(ev: &mut Evaluator, args: &[Expr], pos: Position) -> Result<(), InterpreterError> {
    for arg in args {
        let cell = ev.eval_expr(arg)?;
        let id = cell.value_id().ok_or_else(|| InterpreterError::InternalError {
            message: "use of a value after it was moved out of this binding".to_string(),
            pos,
        })?;
        let value = ev.registry.get(id).cloned().ok_or_else(|| InterpreterError::InternalError {
            message: "debug(): value id not found in the registry".to_string(),
            pos,
        })?;
        let ty = ev
            .registry
            .declared_type(id)
            .cloned()
            .unwrap_or_else(|| TypeDecl::simple(BaseType::Void));
        println!("const flag: {}", cell.is_const());
        println!("reference count: {}", ev.registry.ref_count(id));
        println!("type: {}", ychir::type_to_string(&ty));
        println!("value: {}", format_value(ev, &value, true));
    }
    Ok(())
}

fn format_value(ev: &Evaluator, value: &Value, debug: bool) -> String {
    match value {
        Value::Void => "void".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int32(i) => i.to_string(),
        Value::Uint8(u) => u.to_string(),
        Value::Fp32(f) => f.to_string(),
        Value::Fp64(f) => f.to_string(),
        Value::Char(c) => {
            if debug {
                format!("'{c}'")
            } else {
                c.to_string()
            }
        }
        Value::Str(s) => {
            if debug {
                format!("\"{s}\"")
            } else {
                s.clone()
            }
        }
        Value::Array(cells) => {
            let items: Vec<String> = cells
                .iter()
                .map(|c| match ev.registry.value_of(c) {
                    Some(v) => format_value(ev, v, true),
                    None => "<moved>".to_string(),
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::Instance(inst) => format!("{}{{..}}", inst.class_name),
    }
}

/// `to_int32`/`to_uint8`/`to_fp32`/`to_fp64`/`to_char`: the named-function
/// form of the conversion matrix `eval_cast` also reaches through the
/// `(type) expr` surface syntax, grounded on the same
/// `runtime_typeconv` this module's [`typeconv`] implements.
fn cast_builtin(
    ev: &mut Evaluator,
    args: &[Expr],
    target: BaseType,
    name: &str,
    pos: Position,
) -> Result<Cell, InterpreterError> {
    if args.len() != 1 {
        return Err(InterpreterError::ArityError {
            name: name.to_string(),
            expected: 1,
            found: args.len(),
            pos,
        });
    }
    let cell = ev.eval_expr(&args[0])?;
    let value = ev
        .registry
        .value_of(&cell)
        .cloned()
        .ok_or_else(|| InterpreterError::InternalError {
            message: "use of a value after it was moved out of this binding".to_string(),
            pos,
        })?;
    let converted = typeconv(&value, &target, pos)?;
    let result = Cell::new();
    ev.registry.alloc_into(&result, converted, TypeDecl::simple(target));
    Ok(result)
}

fn string_size(ev: &mut Evaluator, args: &[Expr], pos: Position) -> Result<Cell, InterpreterError> {
    let s = single_string_arg(ev, args, "__string_size", pos)?;
    let cell = Cell::new();
    ev.registry
        .alloc_into(&cell, Value::Int32(s.len() as i32), TypeDecl::simple(BaseType::Int32));
    Ok(cell)
}

/// The conversion matrix behind `(type) expr` casts, grounded on
/// `runtime_typeconv` in `examples/original_source/src/runtime.cpp`.
pub fn typeconv(value: &Value, target: &BaseType, pos: Position) -> Result<Value, InterpreterError> {
    let unsupported = || InterpreterError::TypeError {
        expected: format!("{target:?}"),
        found: value.type_name().to_string(),
        pos,
    };
    match target {
        BaseType::Int32 => match value {
            Value::Int32(i) => Ok(Value::Int32(*i)),
            Value::Uint8(u) => Ok(Value::Int32(*u as i32)),
            Value::Fp32(f) => Ok(Value::Int32(*f as i32)),
            Value::Fp64(f) => Ok(Value::Int32(*f as i32)),
            Value::Char(c) => Ok(Value::Int32(*c as i32)),
            Value::Bool(b) => Ok(Value::Int32(*b as i32)),
            _ => Err(unsupported()),
        },
        BaseType::Uint8 => match value {
            Value::Int32(i) => Ok(Value::Uint8(*i as u8)),
            Value::Uint8(u) => Ok(Value::Uint8(*u)),
            Value::Fp32(f) => Ok(Value::Uint8(*f as u8)),
            Value::Fp64(f) => Ok(Value::Uint8(*f as u8)),
            Value::Char(c) => Ok(Value::Uint8(*c as u8)),
            _ => Err(unsupported()),
        },
        BaseType::Fp32 => match value {
            Value::Int32(i) => Ok(Value::Fp32(*i as f32)),
            Value::Uint8(u) => Ok(Value::Fp32(*u as f32)),
            Value::Fp32(f) => Ok(Value::Fp32(*f)),
            Value::Fp64(f) => Ok(Value::Fp32(*f as f32)),
            _ => Err(unsupported()),
        },
        BaseType::Fp64 => match value {
            Value::Int32(i) => Ok(Value::Fp64(*i as f64)),
            Value::Uint8(u) => Ok(Value::Fp64(*u as f64)),
            Value::Fp32(f) => Ok(Value::Fp64(*f as f64)),
            Value::Fp64(f) => Ok(Value::Fp64(*f)),
            _ => Err(unsupported()),
        },
        BaseType::Char => match value {
            Value::Int32(i) => char::from_u32(*i as u32).map(Value::Char).ok_or_else(unsupported),
            Value::Uint8(u) => Ok(Value::Char(*u as char)),
            Value::Char(c) => Ok(Value::Char(*c)),
            _ => Err(unsupported()),
        },
        BaseType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int32(i) => Ok(Value::Bool(*i != 0)),
            _ => Err(unsupported()),
        },
        BaseType::Str => match value {
            Value::Str(s) => Ok(Value::Str(s.clone())),
            _ => Err(unsupported()),
        },
        BaseType::Void | BaseType::Named(_) => Err(unsupported()),
    }
}
