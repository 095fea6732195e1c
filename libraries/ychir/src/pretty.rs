//! Renders an AST back to `yc` source text.
//!
//! Used by `ycfmt` and by the parser's round-trip tests: positions are not
//! reproduced, so comparing `parse(print(parse(src)))` against
//! `parse(src)` requires stripping positions first (see
//! [`crate::ast`]'s derived `PartialEq`, which does compare positions —
//! tests that want position-blind equality build their own comparator).

use crate::ast::*;
use std::fmt::Write;

pub fn print_program(program: &Program) -> String {
    let mut out = String::new();
    for decl in &program.decls {
        print_decl(&mut out, decl, 0);
        out.push('\n');
    }
    out
}

/// Renders a single type reference the same way `print_type` would, for
/// callers (e.g. `debug()`) that want a type's surface spelling without a
/// whole program to print.
pub fn type_to_string(ty: &TypeDecl) -> String {
    let mut out = String::new();
    print_type(&mut out, ty);
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn print_type(out: &mut String, ty: &TypeDecl) {
    let name = match &ty.base {
        BaseType::Void => "void",
        BaseType::Bool => "bool",
        BaseType::Int32 => "int32",
        BaseType::Uint8 => "uint8",
        BaseType::Char => "char",
        BaseType::Fp32 => "fp32",
        BaseType::Fp64 => "fp64",
        BaseType::Str => "str",
        BaseType::Named(n) => n.as_str(),
    };
    out.push_str(name);
    if let Some(arg) = &ty.generic_arg {
        out.push('<');
        print_type(out, arg);
        out.push('>');
    }
    if ty.array_len > 0 {
        out.push('[');
        out.push_str(&ty.array_len.to_string());
        out.push(']');
    }
}

fn print_params(out: &mut String, params: &[Param]) {
    out.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write!(out, "{}: ", p.name).unwrap();
        print_type(out, &p.ty);
    }
    out.push(')');
}

fn print_func_decl(out: &mut String, f: &FuncDecl, level: usize) {
    indent(out, level);
    write!(out, "function {}", f.name).unwrap();
    if let Some(g) = &f.generic_param {
        write!(out, "<{g}>").unwrap();
    }
    print_params(out, &f.params);
    out.push_str(": ");
    print_type(out, &f.ret);
    out.push(' ');
    print_block(out, &f.body, level);
    out.push('\n');
}

fn print_class_body(out: &mut String, c: &ClassDecl, level: usize) {
    write!(out, "class {}", c.name).unwrap();
    if let Some(g) = &c.generic_param {
        write!(out, "<{g}>").unwrap();
    }
    out.push_str(" {\n");
    for field in &c.fields {
        indent(out, level + 1);
        print_var_decl(out, field);
        out.push_str(";\n");
    }
    if let Some(ctor) = &c.constructor {
        print_func_decl(out, ctor, level + 1);
    }
    for m in &c.methods {
        print_func_decl(out, m, level + 1);
    }
    indent(out, level);
    out.push_str("}\n");
}

fn print_decl(out: &mut String, decl: &Decl, level: usize) {
    match decl {
        Decl::Func(f) => print_func_decl(out, f, level),
        Decl::Class(c) => {
            indent(out, level);
            print_class_body(out, c, level);
        }
        Decl::Union(u) => {
            indent(out, level);
            write!(out, "union {}", u.name).unwrap();
            if let Some(g) = &u.generic_param {
                write!(out, "<{g}>").unwrap();
            }
            out.push_str(" {\n");
            for v in &u.variants {
                indent(out, level + 1);
                print_class_body(out, v, level + 1);
            }
            indent(out, level);
            out.push_str("}\n");
        }
        Decl::Var(v) => {
            indent(out, level);
            print_var_decl(out, v);
            out.push_str(";\n");
        }
    }
}

fn print_var_decl(out: &mut String, v: &VarDecl) {
    let kw = if v.is_const { "const" } else { "var" };
    write!(out, "{kw} {}: ", v.name).unwrap();
    print_type(out, &v.ty);
    if let Some(init) = &v.init {
        out.push_str(" = ");
        print_expr(out, init);
    }
}

fn print_block(out: &mut String, block: &Block, level: usize) {
    out.push_str("{\n");
    for stmt in &block.stmts {
        print_stmt(out, stmt, level + 1);
    }
    indent(out, level);
    out.push('}');
}

fn print_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::VarDecl(v) => {
            indent(out, level);
            print_var_decl(out, v);
            out.push_str(";\n");
        }
        Stmt::Expr(e) => {
            indent(out, level);
            print_expr(out, e);
            out.push_str(";\n");
        }
        Stmt::While(w) => {
            indent(out, level);
            out.push_str("while (");
            print_expr(out, &w.cond);
            out.push_str(") ");
            print_block(out, &w.body, level);
            out.push('\n');
        }
        Stmt::For(f) => {
            indent(out, level);
            out.push_str("for (");
            if let Some(init) = &f.init {
                print_stmt_inline(out, init);
            }
            out.push_str("; ");
            if let Some(cond) = &f.cond {
                print_expr(out, cond);
            }
            out.push_str("; ");
            if let Some(step) = &f.step {
                print_expr(out, step);
            }
            out.push_str(") ");
            print_block(out, &f.body, level);
            out.push('\n');
        }
        Stmt::Return(value, _) => {
            indent(out, level);
            out.push_str("return");
            if let Some(v) = value {
                out.push(' ');
                print_expr(out, v);
            }
            out.push_str(";\n");
        }
        Stmt::Break(_) => {
            indent(out, level);
            out.push_str("break;\n");
        }
        Stmt::Continue(_) => {
            indent(out, level);
            out.push_str("continue;\n");
        }
        Stmt::Block(b) => {
            indent(out, level);
            print_block(out, b, level);
            out.push('\n');
        }
    }
}

fn print_stmt_inline(out: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl(v) => print_var_decl(out, v),
        Stmt::Expr(e) => print_expr(out, e),
        _ => {}
    }
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Copy => "=",
        BinOp::Move => "move",
        BinOp::DeepCopy => "deepcopy",
    }
}

fn print_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Literal(v, _) => print_literal(out, v),
        Expr::Array(items, _) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(out, item);
            }
            out.push(']');
        }
        Expr::Name(name, _) => {
            write!(out, "{name}").unwrap();
        }
        Expr::Binary(b) => match b.op {
            BinOp::Move | BinOp::DeepCopy => {
                write!(out, "{}(", bin_op_str(b.op)).unwrap();
                print_expr(out, &b.lhs);
                out.push_str(", ");
                print_expr(out, &b.rhs);
                out.push(')');
            }
            _ => {
                out.push('(');
                print_expr(out, &b.lhs);
                write!(out, " {} ", bin_op_str(b.op)).unwrap();
                print_expr(out, &b.rhs);
                out.push(')');
            }
        },
        Expr::Call(c) => {
            write!(out, "{}(", c.callee).unwrap();
            for (i, a) in c.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(out, a);
            }
            out.push(')');
        }
        Expr::Index(idx) => {
            print_expr(out, &idx.target);
            out.push('[');
            print_expr(out, &idx.index);
            out.push(']');
        }
        Expr::Cast(c) => {
            out.push('(');
            print_type(out, &c.target_ty);
            out.push(')');
            print_expr(out, &c.value);
        }
        Expr::If(i) => {
            out.push_str("if (");
            print_expr(out, &i.cond);
            out.push_str(") ");
            print_block(out, &i.then_branch, 0);
            if let Some(e) = &i.else_branch {
                out.push_str(" else ");
                print_block(out, e, 0);
            }
        }
        Expr::Match(m) => {
            out.push_str("match (");
            print_expr(out, &m.scrutinee);
            out.push_str(") {\n");
            for line in &m.lines {
                out.push_str(&line.tag);
                if let Some(capture) = &line.capture {
                    write!(out, "({capture})").unwrap();
                }
                out.push(' ');
                print_block(out, &line.body, 0);
                out.push('\n');
            }
            out.push('}');
        }
        Expr::Not(e, _) => {
            out.push('!');
            print_expr(out, e);
        }
        Expr::Neg(e, _) => {
            out.push('-');
            print_expr(out, e);
        }
    }
}

fn print_literal(out: &mut String, v: &LiteralValue) {
    match v {
        LiteralValue::Bool(b) => write!(out, "{b}").unwrap(),
        LiteralValue::Int(i) => write!(out, "{i}").unwrap(),
        LiteralValue::Uint8(u) => write!(out, "{u}").unwrap(),
        LiteralValue::Fp32(f) => write!(out, "{f}").unwrap(),
        LiteralValue::Fp64(f) => write!(out, "{f}").unwrap(),
        LiteralValue::Char(c) => write!(out, "'{c}'").unwrap(),
        LiteralValue::Str(s) => write!(out, "\"{s}\"").unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    #[test]
    fn round_trips_a_function() {
        let src = "function add(a: int32, b: int32): int32 { return (a + b); }\n";
        let program = parse(tokenize(src).unwrap()).unwrap();
        let printed = print_program(&program);
        let reparsed = parse(tokenize(&printed).unwrap()).unwrap();
        assert_eq!(program.decls.len(), reparsed.decls.len());
        match (&program.decls[0], &reparsed.decls[0]) {
            (Decl::Func(a), Decl::Func(b)) => assert_eq!(a.name, b.name),
            _ => panic!("expected function decls"),
        }
    }
}
