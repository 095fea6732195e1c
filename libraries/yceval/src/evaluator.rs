//! The tree-walking evaluator: statement execution, expression
//! evaluation, and the move/copy/deepcopy assignment disciplines, all
//! grounded on the `INTERPRET(...)`/`EvalExpr::interpret` methods in
//! `examples/original_source/src/ast.cpp`.

use crate::error::InterpreterError;
use std::collections::HashMap;
use ychir::{
    BaseType, BinOp, Block, ClassDecl, Decl, Expr, ForExpr, FuncDecl, IfExpr, LiteralValue,
    MatchExpr, Name, Position, Program, Stmt, TypeDecl, TypeTable, WhileExpr, types_equal,
};
use ycvalue::{Cell, Instance, Registry, RegistryError, SymbolTable, Value};

/// Non-local control transfer out of statement execution, the Rust
/// analogue of the original interpreter's ad-hoc `bool` return codes.
pub enum ControlSignal {
    Normal,
    Return(Cell),
    Break,
    Continue,
}

pub struct Evaluator {
    pub registry: Registry,
    types: TypeTable,
    functions: HashMap<String, FuncDecl>,
    scopes: SymbolTable,
}

fn to_internal(err: RegistryError, pos: Position) -> InterpreterError {
    InterpreterError::InternalError {
        message: err.to_string(),
        pos,
    }
}

fn void_ty() -> TypeDecl {
    TypeDecl::simple(BaseType::Void)
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            registry: Registry::new(),
            types: TypeTable::default(),
            functions: HashMap::new(),
            scopes: SymbolTable::new(),
        }
    }

    pub fn run_program(&mut self, program: &Program) -> Result<(), InterpreterError> {
        self.types = TypeTable::from_program(program);
        for decl in &program.decls {
            if let Decl::Func(f) = decl {
                self.functions.insert(f.name.clone(), f.clone());
            }
        }
        for decl in &program.decls {
            if let Decl::Var(v) = decl {
                self.exec_var_decl(v)?;
            }
        }
        if let Some(main) = self.functions.get("main").cloned() {
            self.call_function(&main, &[], main.pos)?;
        }
        Ok(())
    }

    /// `import(path)`: parses `path` as a program, merges its functions and
    /// class/union declarations into this evaluator's own tables so they
    /// become callable, evaluates its top-level `var`s into a fresh frame,
    /// and hands that frame back as a class-typed value, the way `this`'s
    /// own field table is built in [`Evaluator::init_instance_fields`].
    pub(crate) fn import_module(&mut self, path: &str, pos: Position) -> Result<Cell, InterpreterError> {
        let contents = std::fs::read_to_string(path).map_err(|e| InterpreterError::ImportError {
            path: path.to_string(),
            reason: e.to_string(),
            pos,
        })?;
        let program = ychir::parse_source(&contents).map_err(|e| InterpreterError::ImportError {
            path: path.to_string(),
            reason: e.to_string(),
            pos,
        })?;

        let module_types = TypeTable::from_program(&program);
        for (name, class) in module_types.classes {
            self.types.classes.entry(name).or_insert(class);
        }
        for (name, union) in module_types.unions {
            self.types.unions.entry(name).or_insert(union);
        }
        for decl in &program.decls {
            if let Decl::Func(f) = decl {
                self.functions.entry(f.name.clone()).or_insert_with(|| f.clone());
            }
        }

        self.scopes.add_layer();
        let mut result = Ok(());
        for decl in &program.decls {
            if let Decl::Var(v) = decl {
                if let Err(e) = self.exec_var_decl(v) {
                    result = Err(e);
                    break;
                }
            }
        }
        let frame = self.scopes.remove_layer().unwrap_or_default();
        result?;

        let mut fields = SymbolTable::new();
        for (name, cell) in frame {
            fields.insert(name, cell);
        }
        let declared_type = TypeDecl::simple(BaseType::Named(path.to_string()));
        let cell = Cell::new();
        self.registry.alloc_into(
            &cell,
            Value::Instance(Instance {
                class_name: path.to_string(),
                fields,
            }),
            declared_type,
        );
        Ok(cell)
    }

    fn materialize(&mut self, value: Value, ty: TypeDecl) -> Cell {
        let cell = Cell::new();
        self.registry.alloc_into(&cell, value, ty);
        cell
    }

    // ---- name resolution ------------------------------------------------

    fn resolve_name(&self, name: &Name, pos: Position) -> Result<Cell, InterpreterError> {
        if name.owners.is_empty() {
            return self
                .scopes
                .lookup(&name.base)
                .ok_or_else(|| InterpreterError::NameError {
                    name: name.to_string(),
                    pos,
                });
        }
        let mut cell = self
            .scopes
            .lookup(&name.owners[0])
            .ok_or_else(|| InterpreterError::NameError {
                name: name.owners[0].clone(),
                pos,
            })?;
        for owner in &name.owners[1..] {
            cell = self.instance_field(&cell, owner, pos)?;
        }
        self.instance_field(&cell, &name.base, pos)
    }

    fn instance_field(&self, cell: &Cell, field: &str, pos: Position) -> Result<Cell, InterpreterError> {
        match self.registry.value_of(cell) {
            Some(Value::Instance(inst)) => {
                inst.fields.lookup(field).ok_or_else(|| InterpreterError::NameError {
                    name: field.to_string(),
                    pos,
                })
            }
            Some(other) => Err(InterpreterError::TypeError {
                expected: "instance".to_string(),
                found: other.type_name().to_string(),
                pos,
            }),
            None => Err(InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            }),
        }
    }

    fn eval_lvalue(&mut self, expr: &Expr) -> Result<Cell, InterpreterError> {
        match expr {
            Expr::Name(name, pos) => self.resolve_name(name, *pos),
            Expr::Index(idx) => {
                let target = self.eval_expr(&idx.target)?;
                let index = self.eval_index_value(&idx.index)?;
                let pos = idx.pos;
                match self.registry.value_of(&target) {
                    Some(Value::Array(cells)) => {
                        if index < 0 || index as usize >= cells.len() {
                            return Err(InterpreterError::IndexError {
                                index,
                                len: cells.len(),
                                pos,
                            });
                        }
                        Ok(cells[index as usize].clone())
                    }
                    Some(other) => Err(InterpreterError::TypeError {
                        expected: "array".to_string(),
                        found: other.type_name().to_string(),
                        pos,
                    }),
                    None => Err(InterpreterError::InternalError {
                        message: "use of a value after it was moved out of this binding".to_string(),
                        pos,
                    }),
                }
            }
            other => Err(InterpreterError::InternalError {
                message: "expression is not assignable".to_string(),
                pos: other.pos(),
            }),
        }
    }

    fn eval_index_value(&mut self, expr: &Expr) -> Result<i64, InterpreterError> {
        let pos = expr.pos();
        let cell = self.eval_expr(expr)?;
        match self.registry.value_of(&cell) {
            Some(Value::Int32(i)) => Ok(*i as i64),
            Some(Value::Uint8(u)) => Ok(*u as i64),
            Some(other) => Err(InterpreterError::TypeError {
                expected: "int32".to_string(),
                found: other.type_name().to_string(),
                pos,
            }),
            None => Err(InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            }),
        }
    }

    // ---- declarations -----------------------------------------------------

    fn exec_var_decl(&mut self, v: &ychir::VarDecl) -> Result<(), InterpreterError> {
        if self.scopes.declared_in_current_frame(&v.name) {
            return Err(InterpreterError::NameError {
                name: v.name.clone(),
                pos: v.pos,
            });
        }
        let cell = if v.is_const {
            Cell::new_const()
        } else {
            Cell::new()
        };
        match &v.init {
            Some(init) => {
                let src = self.eval_expr(init)?;
                self.registry
                    .copy_into(&cell, &src)
                    .map_err(|e| to_internal(e, v.pos))?;
            }
            None => {
                let value = default_value(&mut self.registry, &v.ty);
                self.registry.alloc_into(&cell, value, v.ty.clone());
            }
        }
        self.scopes.insert(v.name.clone(), cell);
        Ok(())
    }

    // ---- statements ---------------------------------------------------

    pub fn exec_block(&mut self, block: &Block) -> Result<ControlSignal, InterpreterError> {
        self.scopes.add_layer();
        let result = self.exec_stmts(&block.stmts);
        if let Some(frame) = self.scopes.remove_layer() {
            for cell in frame.values() {
                self.registry.release_cell(cell);
            }
        }
        result
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<ControlSignal, InterpreterError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                ControlSignal::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(ControlSignal::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<ControlSignal, InterpreterError> {
        match stmt {
            Stmt::VarDecl(v) => {
                self.exec_var_decl(v)?;
                Ok(ControlSignal::Normal)
            }
            Stmt::Expr(Expr::If(i)) => self.exec_if(i),
            Stmt::Expr(Expr::Match(m)) => self.exec_match(m),
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
                Ok(ControlSignal::Normal)
            }
            Stmt::While(w) => self.exec_while(w),
            Stmt::For(f) => self.exec_for(f),
            Stmt::Return(value, pos) => {
                let src = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => self.materialize(Value::Void, void_ty()),
                };
                let ret_cell = Cell::new();
                self.registry
                    .copy_into(&ret_cell, &src)
                    .map_err(|e| to_internal(e, *pos))?;
                Ok(ControlSignal::Return(ret_cell))
            }
            Stmt::Break(_) => Ok(ControlSignal::Break),
            Stmt::Continue(_) => Ok(ControlSignal::Continue),
            Stmt::Block(b) => self.exec_block(b),
        }
    }

    fn exec_if(&mut self, i: &IfExpr) -> Result<ControlSignal, InterpreterError> {
        if self.eval_bool(&i.cond)? {
            self.exec_block(&i.then_branch)
        } else if let Some(else_branch) = &i.else_branch {
            self.exec_block(else_branch)
        } else {
            Ok(ControlSignal::Normal)
        }
    }

    fn exec_while(&mut self, w: &WhileExpr) -> Result<ControlSignal, InterpreterError> {
        while self.eval_bool(&w.cond)? {
            match self.exec_block(&w.body)? {
                ControlSignal::Break => break,
                ControlSignal::Continue | ControlSignal::Normal => {}
                signal @ ControlSignal::Return(_) => return Ok(signal),
            }
        }
        Ok(ControlSignal::Normal)
    }

    fn exec_for(&mut self, f: &ForExpr) -> Result<ControlSignal, InterpreterError> {
        self.scopes.add_layer();
        let result = self.exec_for_inner(f);
        if let Some(frame) = self.scopes.remove_layer() {
            for cell in frame.values() {
                self.registry.release_cell(cell);
            }
        }
        result
    }

    fn exec_for_inner(&mut self, f: &ForExpr) -> Result<ControlSignal, InterpreterError> {
        if let Some(init) = &f.init {
            self.exec_stmt(init)?;
        }
        loop {
            if let Some(cond) = &f.cond {
                if !self.eval_bool(cond)? {
                    break;
                }
            }
            match self.exec_block(&f.body)? {
                ControlSignal::Break => break,
                ControlSignal::Continue | ControlSignal::Normal => {}
                signal @ ControlSignal::Return(_) => return Ok(signal),
            }
            if let Some(step) = &f.step {
                self.eval_expr(step)?;
            }
        }
        Ok(ControlSignal::Normal)
    }

    /// `match (subject) { TAG(capture)? { ... } ... }`: the subject must be
    /// a union-variant instance; its class name is the tag compared against
    /// each line in declaration order (first match wins), per §4.5. A
    /// matching line with a capture name gets the whole subject bound under
    /// that name for its body; no matching line yields the Void sentinel.
    fn exec_match(&mut self, m: &MatchExpr) -> Result<ControlSignal, InterpreterError> {
        let scrutinee = self.eval_expr(&m.scrutinee)?;
        let tag = match self.registry.value_of(&scrutinee) {
            Some(Value::Instance(inst)) => inst.class_name.clone(),
            Some(other) => {
                return Err(InterpreterError::TypeError {
                    expected: "a union instance".to_string(),
                    found: other.type_name().to_string(),
                    pos: m.pos,
                })
            }
            None => {
                return Err(InterpreterError::InternalError {
                    message: "use of a value after it was moved out of this binding".to_string(),
                    pos: m.pos,
                })
            }
        };
        for line in &m.lines {
            if line.tag != tag {
                continue;
            }
            self.scopes.add_layer();
            if let Some(capture) = &line.capture {
                let bound = Cell::new();
                self.registry
                    .copy_into(&bound, &scrutinee)
                    .map_err(|e| to_internal(e, line.pos))?;
                self.scopes.insert(capture.clone(), bound);
            }
            let result = self.exec_block(&line.body);
            if let Some(frame) = self.scopes.remove_layer() {
                for cell in frame.values() {
                    self.registry.release_cell(cell);
                }
            }
            return result;
        }
        Ok(ControlSignal::Normal)
    }

    fn eval_bool(&mut self, expr: &Expr) -> Result<bool, InterpreterError> {
        let pos = expr.pos();
        let cell = self.eval_expr(expr)?;
        match self.registry.value_of(&cell) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(InterpreterError::TypeError {
                expected: "bool".to_string(),
                found: other.type_name().to_string(),
                pos,
            }),
            None => Err(InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            }),
        }
    }

    /// A `&&`/`||` operand: bool as-is, numeric types coerced by zero/
    /// non-zero, matching `land`/`lor`'s switch over numeric base types in
    /// `examples/original_source/src/ast.cpp`. Unlike [`Evaluator::eval_bool`],
    /// which backs `if`/`while`/`for` conditions and stays strictly boolean.
    fn eval_logical_operand(&mut self, expr: &Expr) -> Result<bool, InterpreterError> {
        let pos = expr.pos();
        let cell = self.eval_expr(expr)?;
        match self.registry.value_of(&cell) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Int32(i)) => Ok(*i != 0),
            Some(Value::Uint8(u)) => Ok(*u != 0),
            Some(Value::Fp32(f)) => Ok(*f != 0.0),
            Some(Value::Fp64(f)) => Ok(*f != 0.0),
            Some(other) => Err(InterpreterError::TypeError {
                expected: "bool".to_string(),
                found: other.type_name().to_string(),
                pos,
            }),
            None => Err(InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            }),
        }
    }

    // ---- expressions ----------------------------------------------------

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Cell, InterpreterError> {
        match expr {
            Expr::Literal(v, pos) => Ok(self.materialize(literal_to_value(v), literal_ty(v, *pos))),
            Expr::Array(items, _) => {
                let mut cells = Vec::with_capacity(items.len());
                let mut elem_ty = None;
                for item in items {
                    let src = self.eval_expr(item)?;
                    if elem_ty.is_none() {
                        elem_ty = self.registry.declared_type(
                            src.value_id().expect("just-evaluated cell is bound"),
                        ).cloned();
                    }
                    let slot = Cell::new();
                    self.registry
                        .copy_into(&slot, &src)
                        .map_err(|e| to_internal(e, item.pos()))?;
                    cells.push(slot);
                }
                let array_ty = TypeDecl {
                    array_len: cells.len(),
                    ..elem_ty.unwrap_or_else(void_ty)
                };
                Ok(self.materialize(Value::Array(cells), array_ty))
            }
            Expr::Name(name, pos) => self.resolve_name(name, *pos),
            Expr::Binary(b) => self.eval_binary(b),
            Expr::Call(c) => self.eval_call(c),
            Expr::Index(idx) => self.eval_lvalue(&Expr::Index(idx.clone())),
            Expr::Cast(c) => self.eval_cast(c),
            Expr::If(i) => {
                self.exec_if(i)?;
                Ok(self.materialize(Value::Void, void_ty()))
            }
            Expr::Match(m) => {
                self.exec_match(m)?;
                Ok(self.materialize(Value::Void, void_ty()))
            }
            Expr::Not(inner, pos) => {
                let b = self.eval_bool(inner)?;
                let _ = pos;
                Ok(self.materialize(Value::Bool(!b), TypeDecl::simple(BaseType::Bool)))
            }
            Expr::Neg(inner, pos) => self.eval_neg(inner, *pos),
        }
    }

    fn eval_neg(&mut self, inner: &Expr, pos: Position) -> Result<Cell, InterpreterError> {
        let cell = self.eval_expr(inner)?;
        match self.registry.value_of(&cell) {
            Some(Value::Int32(i)) => Ok(self.materialize(Value::Int32(-i), TypeDecl::simple(BaseType::Int32))),
            Some(Value::Fp32(f)) => Ok(self.materialize(Value::Fp32(-f), TypeDecl::simple(BaseType::Fp32))),
            Some(Value::Fp64(f)) => Ok(self.materialize(Value::Fp64(-f), TypeDecl::simple(BaseType::Fp64))),
            Some(other) => Err(InterpreterError::TypeError {
                expected: "a numeric type".to_string(),
                found: other.type_name().to_string(),
                pos,
            }),
            None => Err(InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos,
            }),
        }
    }

    fn eval_binary(&mut self, b: &ychir::BinaryExpr) -> Result<Cell, InterpreterError> {
        match b.op {
            BinOp::Copy | BinOp::Move | BinOp::DeepCopy => self.eval_assignment(b),
            BinOp::And => {
                let lhs = self.eval_logical_operand(&b.lhs)?;
                if !lhs {
                    return Ok(self.materialize(Value::Bool(false), TypeDecl::simple(BaseType::Bool)));
                }
                let rhs = self.eval_logical_operand(&b.rhs)?;
                Ok(self.materialize(Value::Bool(rhs), TypeDecl::simple(BaseType::Bool)))
            }
            BinOp::Or => {
                let lhs = self.eval_logical_operand(&b.lhs)?;
                if lhs {
                    return Ok(self.materialize(Value::Bool(true), TypeDecl::simple(BaseType::Bool)));
                }
                let rhs = self.eval_logical_operand(&b.rhs)?;
                Ok(self.materialize(Value::Bool(rhs), TypeDecl::simple(BaseType::Bool)))
            }
            _ => {
                let lhs_cell = self.eval_expr(&b.lhs)?;
                let rhs_cell = self.eval_expr(&b.rhs)?;
                let lhs = self
                    .registry
                    .value_of(&lhs_cell)
                    .cloned()
                    .ok_or_else(|| InterpreterError::InternalError {
                        message: "use of a value after it was moved out of this binding".to_string(),
                        pos: b.pos,
                    })?;
                let rhs = self
                    .registry
                    .value_of(&rhs_cell)
                    .cloned()
                    .ok_or_else(|| InterpreterError::InternalError {
                        message: "use of a value after it was moved out of this binding".to_string(),
                        pos: b.pos,
                    })?;
                let (result, ty) = eval_numeric_binop(b.op, &lhs, &rhs, b.pos)?;
                Ok(self.materialize(result, ty))
            }
        }
    }

    fn eval_assignment(&mut self, b: &ychir::BinaryExpr) -> Result<Cell, InterpreterError> {
        let dst = self.eval_lvalue(&b.lhs)?;
        let src = self.eval_expr(&b.rhs)?;
        if let (Some(dst_id), Some(src_id)) = (dst.value_id(), src.value_id()) {
            if let (Some(dst_ty), Some(src_ty)) =
                (self.registry.declared_type(dst_id), self.registry.declared_type(src_id))
            {
                if !types_equal(dst_ty, src_ty) {
                    return Err(InterpreterError::TypeError {
                        expected: ychir::type_to_string(dst_ty),
                        found: ychir::type_to_string(src_ty),
                        pos: b.pos,
                    });
                }
            }
        }
        let result = match b.op {
            BinOp::Copy => self.registry.copy_into(&dst, &src),
            BinOp::Move => self.registry.move_into(&dst, &src),
            BinOp::DeepCopy => self.registry.deepcopy_into(&dst, &src),
            _ => unreachable!("eval_assignment only handles the three assignment ops"),
        };
        result.map_err(|e| match e {
            RegistryError::ConstReassignment => InterpreterError::ConstError {
                name: describe_lvalue(&b.lhs),
                pos: b.pos,
            },
            other => to_internal(other, b.pos),
        })?;
        Ok(dst)
    }

    fn eval_cast(&mut self, c: &ychir::CastExpr) -> Result<Cell, InterpreterError> {
        let cell = self.eval_expr(&c.value)?;
        let value = self
            .registry
            .value_of(&cell)
            .cloned()
            .ok_or_else(|| InterpreterError::InternalError {
                message: "use of a value after it was moved out of this binding".to_string(),
                pos: c.pos,
            })?;
        let converted = crate::builtins::typeconv(&value, &c.target_ty.base, c.pos)?;
        Ok(self.materialize(converted, c.target_ty.clone()))
    }

    // ---- calls ----------------------------------------------------------

    fn eval_call(&mut self, call: &ychir::FuncCall) -> Result<Cell, InterpreterError> {
        if call.callee.is_constructor_path() && call.callee.owners.len() == 1 {
            return self.construct_instance(&call.callee.owners[0], &call.args, call.pos);
        }
        // `ClassName(args)`: calling a bare class name acts as `new`, per
        // §4.6, independent of the explicit `ClassName.new(args)` spelling
        // handled above.
        if call.callee.owners.is_empty() && self.types.classes.contains_key(&call.callee.base) {
            return self.construct_instance(&call.callee.base, &call.args, call.pos);
        }
        if call.callee.owners.is_empty() {
            if let Some(result) = crate::builtins::dispatch(self, &call.callee.base, &call.args, call.pos)? {
                return Ok(result);
            }
        }
        if !call.callee.owners.is_empty() {
            return self.call_method(call);
        }
        let func = self
            .functions
            .get(&call.callee.base)
            .cloned()
            .ok_or_else(|| InterpreterError::NameError {
                name: call.callee.to_string(),
                pos: call.pos,
            })?;
        self.call_function(&func, &call.args, call.pos)
    }

    fn call_method(&mut self, call: &ychir::FuncCall) -> Result<Cell, InterpreterError> {
        let owner_name = Name::path(
            call.callee.owners[..call.callee.owners.len() - 1].to_vec(),
            call.callee.owners.last().unwrap().clone(),
        );
        let receiver = if call.callee.owners.len() == 1 {
            self.resolve_name(&Name::simple(call.callee.owners[0].clone()), call.pos)?
        } else {
            self.resolve_name(&owner_name, call.pos)?
        };
        let class_name = match self.registry.value_of(&receiver) {
            Some(Value::Instance(inst)) => inst.class_name.clone(),
            Some(other) => {
                return Err(InterpreterError::TypeError {
                    expected: "instance".to_string(),
                    found: other.type_name().to_string(),
                    pos: call.pos,
                })
            }
            None => {
                return Err(InterpreterError::InternalError {
                    message: "use of a value after it was moved out of this binding".to_string(),
                    pos: call.pos,
                })
            }
        };
        let class = self
            .types
            .classes
            .get(&class_name)
            .cloned()
            .ok_or_else(|| InterpreterError::NameError {
                name: class_name.clone(),
                pos: call.pos,
            })?;
        let method = class
            .methods
            .iter()
            .find(|m| m.name == call.callee.base)
            .cloned()
            .ok_or_else(|| InterpreterError::NameError {
                name: format!("{}.{}", class_name, call.callee.base),
                pos: call.pos,
            })?;
        self.scopes.add_layer();
        let this_cell = Cell::new();
        self.registry
            .copy_into(&this_cell, &receiver)
            .map_err(|e| to_internal(e, call.pos))?;
        self.scopes.insert("this", this_cell);
        let result = self.call_body(&method, &call.args, call.pos);
        if let Some(frame) = self.scopes.remove_layer() {
            for cell in frame.values() {
                self.registry.release_cell(cell);
            }
        }
        result
    }

    fn construct_instance(
        &mut self,
        class_name: &str,
        args: &[Expr],
        pos: Position,
    ) -> Result<Cell, InterpreterError> {
        let class = self
            .types
            .classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| InterpreterError::NameError {
                name: class_name.to_string(),
                pos,
            })?;
        let declared_type = TypeDecl::simple(BaseType::Named(class_name.to_string()));
        let (this_cell, this_id) = self
            .registry
            .alloc_instance_placeholder(class_name.to_string(), declared_type.clone());

        self.scopes.add_layer();
        self.scopes.insert("this", this_cell.clone());
        let result = self.init_instance_fields(this_id, &class);
        let ctor = class.constructor.clone();
        let result = result.and_then(|_| match &ctor {
            Some(ctor) => self.call_body(ctor, args, pos).map(|_| ()),
            None => {
                if !args.is_empty() {
                    Err(InterpreterError::ArityError {
                        name: format!("{class_name}.new"),
                        expected: 0,
                        found: args.len(),
                        pos,
                    })
                } else {
                    Ok(())
                }
            }
        });
        if let Some(frame) = self.scopes.remove_layer() {
            for cell in frame.values() {
                self.registry.release_cell(cell);
            }
        }
        result?;

        let result_cell = Cell::new();
        self.registry.rebind(&result_cell, this_id);
        Ok(result_cell)
    }

    /// Executes each class member declaration in order against the
    /// instance's own field table, with `this` already bound in scope (so
    /// an initializer can read fields set by an earlier member
    /// declaration), matching §4.6's constructor-call sequence.
    fn init_instance_fields(&mut self, id: ycvalue::ValueId, class: &ClassDecl) -> Result<(), InterpreterError> {
        for field in &class.fields {
            let cell = if field.is_const {
                Cell::new_const()
            } else {
                Cell::new()
            };
            match &field.init {
                Some(init) => {
                    let src = self.eval_expr(init)?;
                    self.registry
                        .copy_into(&cell, &src)
                        .map_err(|e| to_internal(e, field.pos))?;
                }
                None => {
                    let value = default_value(&mut self.registry, &field.ty);
                    self.registry.alloc_into(&cell, value, field.ty.clone());
                }
            }
            if let Some(Value::Instance(Instance { fields, .. })) = self.registry.get_mut(id) {
                fields.insert(field.name.clone(), cell);
            }
        }
        Ok(())
    }

    fn call_function(
        &mut self,
        func: &FuncDecl,
        args: &[Expr],
        pos: Position,
    ) -> Result<Cell, InterpreterError> {
        self.scopes.add_layer();
        let result = self.call_body(func, args, pos);
        if let Some(frame) = self.scopes.remove_layer() {
            for cell in frame.values() {
                self.registry.release_cell(cell);
            }
        }
        result
    }

    /// Binds `func`'s parameters (in the already-pushed current frame) and
    /// runs its body, returning the function's result cell.
    fn call_body(&mut self, func: &FuncDecl, args: &[Expr], pos: Position) -> Result<Cell, InterpreterError> {
        if args.len() != func.params.len() {
            return Err(InterpreterError::ArityError {
                name: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
                pos,
            });
        }
        for (param, arg) in func.params.iter().zip(args.iter()) {
            let src = self.eval_expr(arg)?;
            if let Some(src_id) = src.value_id() {
                if let Some(src_ty) = self.registry.declared_type(src_id) {
                    if !types_equal(src_ty, &param.ty) {
                        return Err(InterpreterError::TypeError {
                            expected: ychir::type_to_string(&param.ty),
                            found: ychir::type_to_string(src_ty),
                            pos: arg.pos(),
                        });
                    }
                }
            }
            let cell = Cell::new();
            self.registry
                .copy_into(&cell, &src)
                .map_err(|e| to_internal(e, pos))?;
            self.scopes.insert(param.name.clone(), cell);
        }
        match self.exec_stmts(&func.body.stmts)? {
            ControlSignal::Return(cell) => Ok(cell),
            ControlSignal::Normal => Ok(self.materialize(Value::Void, void_ty())),
            ControlSignal::Break | ControlSignal::Continue => Err(InterpreterError::InternalError {
                message: "break or continue used outside of a loop".to_string(),
                pos,
            }),
        }
    }
}

fn describe_lvalue(expr: &Expr) -> String {
    match expr {
        Expr::Name(name, _) => name.to_string(),
        Expr::Index(idx) => format!("{}[...]", describe_lvalue(&idx.target)),
        _ => "<expression>".to_string(),
    }
}

fn literal_to_value(v: &LiteralValue) -> Value {
    match v {
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Int(i) => Value::Int32(*i),
        LiteralValue::Uint8(u) => Value::Uint8(*u),
        LiteralValue::Fp32(f) => Value::Fp32(*f),
        LiteralValue::Fp64(f) => Value::Fp64(*f),
        LiteralValue::Char(c) => Value::Char(*c),
        LiteralValue::Str(s) => Value::Str(s.clone()),
    }
}

fn literal_ty(v: &LiteralValue, _pos: Position) -> TypeDecl {
    let base = match v {
        LiteralValue::Bool(_) => BaseType::Bool,
        LiteralValue::Int(_) => BaseType::Int32,
        LiteralValue::Uint8(_) => BaseType::Uint8,
        LiteralValue::Fp32(_) => BaseType::Fp32,
        LiteralValue::Fp64(_) => BaseType::Fp64,
        LiteralValue::Char(_) => BaseType::Char,
        LiteralValue::Str(_) => BaseType::Str,
    };
    TypeDecl::simple(base)
}

/// The zero value for a declared type: §4.4's "pre-materializes N cells,
/// each holding a fresh zero value of the element type" for arrays, and
/// the scalar zero for everything else.
fn default_value(registry: &mut Registry, ty: &TypeDecl) -> Value {
    if ty.array_len > 0 {
        let elem_ty = ty.element_type();
        let mut cells = Vec::with_capacity(ty.array_len);
        for _ in 0..ty.array_len {
            let elem = default_value(registry, &elem_ty);
            let cell = Cell::new();
            registry.alloc_into(&cell, elem, elem_ty.clone());
            cells.push(cell);
        }
        return Value::Array(cells);
    }
    match &ty.base {
        BaseType::Void => Value::Void,
        BaseType::Bool => Value::Bool(false),
        BaseType::Int32 => Value::Int32(0),
        BaseType::Uint8 => Value::Uint8(0),
        BaseType::Char => Value::Char('\0'),
        BaseType::Fp32 => Value::Fp32(0.0),
        BaseType::Fp64 => Value::Fp64(0.0),
        BaseType::Str => Value::Str(String::new()),
        BaseType::Named(_) => Value::Void,
    }
}

/// The arithmetic/bitwise/comparison half of the original binary operator
/// switch in `EvalExpr::interpret`; `Copy`/`Move`/`DeepCopy` and the
/// short-circuiting logical operators are handled by the caller instead.
fn eval_numeric_binop(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
    pos: Position,
) -> Result<(Value, TypeDecl), InterpreterError> {
    use BinOp::*;
    let type_error = |found: &Value| InterpreterError::TypeError {
        expected: lhs.type_name().to_string(),
        found: found.type_name().to_string(),
        pos,
    };
    match (lhs, rhs) {
        (Value::Int32(a), Value::Int32(b)) => {
            let ty = TypeDecl::simple(BaseType::Int32);
            match op {
                Add => Ok((Value::Int32(a.wrapping_add(*b)), ty)),
                Sub => Ok((Value::Int32(a.wrapping_sub(*b)), ty)),
                Mul => Ok((Value::Int32(a.wrapping_mul(*b)), ty)),
                Div => checked_div(*a, *b, pos).map(|v| (Value::Int32(v), ty)),
                Rem => checked_rem(*a, *b, pos).map(|v| (Value::Int32(v), ty)),
                BitAnd => Ok((Value::Int32(a & b), ty)),
                BitOr => Ok((Value::Int32(a | b), ty)),
                BitXor => Ok((Value::Int32(a ^ b), ty)),
                Eq => Ok((Value::Bool(a == b), TypeDecl::simple(BaseType::Bool))),
                NotEq => Ok((Value::Bool(a != b), TypeDecl::simple(BaseType::Bool))),
                Lt => Ok((Value::Bool(a < b), TypeDecl::simple(BaseType::Bool))),
                Le => Ok((Value::Bool(a <= b), TypeDecl::simple(BaseType::Bool))),
                Gt => Ok((Value::Bool(a > b), TypeDecl::simple(BaseType::Bool))),
                Ge => Ok((Value::Bool(a >= b), TypeDecl::simple(BaseType::Bool))),
                _ => Err(InterpreterError::InternalError {
                    message: "operator not valid for int32".to_string(),
                    pos,
                }),
            }
        }
        (Value::Uint8(a), Value::Uint8(b)) => {
            let ty = TypeDecl::simple(BaseType::Uint8);
            match op {
                Add => Ok((Value::Uint8(a.wrapping_add(*b)), ty)),
                Sub => Ok((Value::Uint8(a.wrapping_sub(*b)), ty)),
                Mul => Ok((Value::Uint8(a.wrapping_mul(*b)), ty)),
                Div => checked_div_u8(*a, *b, pos).map(|v| (Value::Uint8(v), ty)),
                Rem => checked_rem_u8(*a, *b, pos).map(|v| (Value::Uint8(v), ty)),
                BitAnd => Ok((Value::Uint8(a & b), ty)),
                BitOr => Ok((Value::Uint8(a | b), ty)),
                BitXor => Ok((Value::Uint8(a ^ b), ty)),
                Eq => Ok((Value::Bool(a == b), TypeDecl::simple(BaseType::Bool))),
                NotEq => Ok((Value::Bool(a != b), TypeDecl::simple(BaseType::Bool))),
                Lt => Ok((Value::Bool(a < b), TypeDecl::simple(BaseType::Bool))),
                Le => Ok((Value::Bool(a <= b), TypeDecl::simple(BaseType::Bool))),
                Gt => Ok((Value::Bool(a > b), TypeDecl::simple(BaseType::Bool))),
                Ge => Ok((Value::Bool(a >= b), TypeDecl::simple(BaseType::Bool))),
                _ => Err(InterpreterError::InternalError {
                    message: "operator not valid for uint8".to_string(),
                    pos,
                }),
            }
        }
        (Value::Fp32(a), Value::Fp32(b)) => eval_float_binop(op, *a as f64, *b as f64, pos)
            .map(|(v, is_bool)| {
                if is_bool {
                    (v, TypeDecl::simple(BaseType::Bool))
                } else if let Value::Fp64(f) = v {
                    (Value::Fp32(f as f32), TypeDecl::simple(BaseType::Fp32))
                } else {
                    (v, TypeDecl::simple(BaseType::Fp32))
                }
            }),
        (Value::Fp64(a), Value::Fp64(b)) => eval_float_binop(op, *a, *b, pos).map(|(v, is_bool)| {
            if is_bool {
                (v, TypeDecl::simple(BaseType::Bool))
            } else {
                (v, TypeDecl::simple(BaseType::Fp64))
            }
        }),
        (Value::Char(a), Value::Char(b)) => match op {
            Eq => Ok((Value::Bool(a == b), TypeDecl::simple(BaseType::Bool))),
            NotEq => Ok((Value::Bool(a != b), TypeDecl::simple(BaseType::Bool))),
            Lt => Ok((Value::Bool(a < b), TypeDecl::simple(BaseType::Bool))),
            Le => Ok((Value::Bool(a <= b), TypeDecl::simple(BaseType::Bool))),
            Gt => Ok((Value::Bool(a > b), TypeDecl::simple(BaseType::Bool))),
            Ge => Ok((Value::Bool(a >= b), TypeDecl::simple(BaseType::Bool))),
            _ => Err(InterpreterError::InternalError {
                message: "operator not valid for char".to_string(),
                pos,
            }),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            Eq => Ok((Value::Bool(a == b), TypeDecl::simple(BaseType::Bool))),
            NotEq => Ok((Value::Bool(a != b), TypeDecl::simple(BaseType::Bool))),
            _ => Err(InterpreterError::InternalError {
                message: "operator not valid for bool".to_string(),
                pos,
            }),
        },
        (Value::Str(a), Value::Str(b)) => match op {
            Add => Ok((Value::Str(format!("{a}{b}")), TypeDecl::simple(BaseType::Str))),
            Eq => Ok((Value::Bool(a == b), TypeDecl::simple(BaseType::Bool))),
            NotEq => Ok((Value::Bool(a != b), TypeDecl::simple(BaseType::Bool))),
            _ => Err(InterpreterError::InternalError {
                message: "operator not valid for str".to_string(),
                pos,
            }),
        },
        (_, b) => Err(type_error(b)),
    }
}

fn eval_float_binop(op: BinOp, a: f64, b: f64, pos: Position) -> Result<(Value, bool), InterpreterError> {
    use BinOp::*;
    match op {
        Add => Ok((Value::Fp64(a + b), false)),
        Sub => Ok((Value::Fp64(a - b), false)),
        Mul => Ok((Value::Fp64(a * b), false)),
        Div => {
            if b == 0.0 {
                return Err(InterpreterError::InternalError {
                    message: "division by zero".to_string(),
                    pos,
                });
            }
            Ok((Value::Fp64(a / b), false))
        }
        Eq => Ok((Value::Bool(a == b), true)),
        NotEq => Ok((Value::Bool(a != b), true)),
        Lt => Ok((Value::Bool(a < b), true)),
        Le => Ok((Value::Bool(a <= b), true)),
        Gt => Ok((Value::Bool(a > b), true)),
        Ge => Ok((Value::Bool(a >= b), true)),
        _ => Err(InterpreterError::InternalError {
            message: "operator not valid for floating point types".to_string(),
            pos,
        }),
    }
}

fn checked_div(a: i32, b: i32, pos: Position) -> Result<i32, InterpreterError> {
    if b == 0 {
        return Err(InterpreterError::InternalError {
            message: "division by zero".to_string(),
            pos,
        });
    }
    Ok(a.wrapping_div(b))
}

fn checked_rem(a: i32, b: i32, pos: Position) -> Result<i32, InterpreterError> {
    if b == 0 {
        return Err(InterpreterError::InternalError {
            message: "division by zero".to_string(),
            pos,
        });
    }
    Ok(a.wrapping_rem(b))
}

fn checked_div_u8(a: u8, b: u8, pos: Position) -> Result<u8, InterpreterError> {
    if b == 0 {
        return Err(InterpreterError::InternalError {
            message: "division by zero".to_string(),
            pos,
        });
    }
    Ok(a / b)
}

fn checked_rem_u8(a: u8, b: u8, pos: Position) -> Result<u8, InterpreterError> {
    if b == 0 {
        return Err(InterpreterError::InternalError {
            message: "division by zero".to_string(),
            pos,
        });
    }
    Ok(a % b)
}
