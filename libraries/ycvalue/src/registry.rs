//! The value-ownership registry: an arena of [`Value`]s, each tracking
//! every [`Cell`] currently bound to it, mirroring `MemStore` in
//! `examples/original_source/src/ast.cpp`. All binding, release, and the
//! three assignment disciplines (`move`/`copy`/`deepcopy`) are mediated
//! here so that exactly one place enforces the invalidation and
//! placeholder-survival rules.

use crate::cell::{Cell, CellInner};
use crate::error::RegistryError;
use crate::symbol_table::SymbolTable;
use crate::value::{Instance, Value, ValueId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;
use ychir::TypeDecl;

struct ValueEntry {
    value: Value,
    declared_type: TypeDecl,
    cells: Vec<Weak<RefCell<CellInner>>>,
}

#[derive(Default)]
pub struct Registry {
    arena: HashMap<ValueId, ValueEntry>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    fn fresh_id(&mut self) -> ValueId {
        let id = ValueId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Allocates a new value in the arena and binds `cell` to it. Used for
    /// variable initializers and intermediate expression results.
    pub fn alloc_into(&mut self, cell: &Cell, value: Value, declared_type: TypeDecl) -> ValueId {
        let id = self.fresh_id();
        self.arena.insert(
            id,
            ValueEntry {
                value,
                declared_type,
                cells: Vec::new(),
            },
        );
        self.bind_unchecked(cell, id);
        id
    }

    pub fn get(&self, id: ValueId) -> Option<&Value> {
        self.arena.get(&id).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, id: ValueId) -> Option<&mut Value> {
        self.arena.get_mut(&id).map(|e| &mut e.value)
    }

    pub fn declared_type(&self, id: ValueId) -> Option<&TypeDecl> {
        self.arena.get(&id).map(|e| &e.declared_type)
    }

    /// How many live cells currently reference `id`'s value. Used by
    /// `debug()` to report the same "reference counter" the original
    /// runtime's diagnostic prints.
    pub fn ref_count(&self, id: ValueId) -> usize {
        self.arena
            .get(&id)
            .map(|e| e.cells.iter().filter(|w| w.upgrade().is_some()).count())
            .unwrap_or(0)
    }

    pub fn value_of(&self, cell: &Cell) -> Option<&Value> {
        cell.value_id().and_then(|id| self.get(id))
    }

    fn bind_unchecked(&mut self, cell: &Cell, id: ValueId) {
        if let Some(entry) = self.arena.get_mut(&id) {
            entry.cells.push(cell.downgrade());
        }
        cell.set_value_id(Some(id));
    }

    /// Detaches `cell` from whatever value it currently holds. If `cell`
    /// is not a placeholder and it was the value's last referencing cell,
    /// the value (and, if it is an instance, its fields) is torn down.
    pub fn release_cell(&mut self, cell: &Cell) {
        let Some(id) = cell.value_id() else { return };
        cell.set_value_id(None);
        let is_placeholder = cell.is_placeholder();
        let Some(entry) = self.arena.get_mut(&id) else { return };
        entry.cells.retain(|weak| match Cell::from_weak(weak) {
            Some(other) => !other.ptr_eq(cell),
            None => false,
        });
        let now_empty = entry.cells.is_empty();
        if now_empty && !is_placeholder {
            self.destroy(id);
        }
    }

    fn destroy(&mut self, id: ValueId) {
        if let Some(entry) = self.arena.remove(&id) {
            if let Value::Instance(instance) = entry.value {
                for field_cell in instance.fields.all_cells() {
                    self.release_cell(field_cell);
                }
            }
        }
    }

    /// `=` (the default): `dst` starts aliasing the same value as `src`.
    /// Neither `src` nor any other cell referencing that value is
    /// affected.
    pub fn copy_into(&mut self, dst: &Cell, src: &Cell) -> Result<(), RegistryError> {
        if dst.is_const() && dst.is_bound() {
            return Err(RegistryError::ConstReassignment);
        }
        let id = src.value_id().ok_or(RegistryError::UseOfMovedValue)?;
        self.release_cell(dst);
        self.bind_unchecked(dst, id);
        Ok(())
    }

    /// `move(dst, src)`: `dst` takes over the value and every cell that
    /// used to reference it (`src` included) is invalidated.
    pub fn move_into(&mut self, dst: &Cell, src: &Cell) -> Result<(), RegistryError> {
        if dst.is_const() && dst.is_bound() {
            return Err(RegistryError::ConstReassignment);
        }
        let id = src.value_id().ok_or(RegistryError::UseOfMovedValue)?;
        let referencing: Vec<Cell> = self
            .arena
            .get(&id)
            .map(|e| e.cells.iter().filter_map(Cell::from_weak).collect())
            .unwrap_or_default();
        for cell in &referencing {
            cell.set_value_id(None);
        }
        if let Some(entry) = self.arena.get_mut(&id) {
            entry.cells.clear();
        }
        self.release_cell(dst);
        self.bind_unchecked(dst, id);
        Ok(())
    }

    /// `deepcopy(dst, src)`: `dst` gets a freshly allocated, recursively
    /// cloned value; `src` and its value are untouched.
    pub fn deepcopy_into(&mut self, dst: &Cell, src: &Cell) -> Result<(), RegistryError> {
        if dst.is_const() && dst.is_bound() {
            return Err(RegistryError::ConstReassignment);
        }
        let id = src.value_id().ok_or(RegistryError::UseOfMovedValue)?;
        let (value, ty) = {
            let entry = self.arena.get(&id).expect("value id came from a live cell");
            (entry.value.clone(), entry.declared_type.clone())
        };
        let cloned = self.deep_clone_value(value);
        self.release_cell(dst);
        self.alloc_into(dst, cloned, ty);
        Ok(())
    }

    /// Recursively clones `value`, materializing a brand new cell (and,
    /// for nested arrays/instances, a brand new sub-tree of values) for
    /// everything it transitively holds. Takes `value` by ownership so
    /// the recursion never aliases a borrow still live in `self.arena`.
    fn deep_clone_value(&mut self, value: Value) -> Value {
        match value {
            Value::Array(cells) => {
                let mut new_cells = Vec::with_capacity(cells.len());
                for old_cell in &cells {
                    new_cells.push(self.deep_clone_cell(old_cell));
                }
                Value::Array(new_cells)
            }
            Value::Instance(instance) => {
                let mut new_frame = HashMap::new();
                for (name, old_cell) in instance.fields.base_frame() {
                    new_frame.insert(name.clone(), self.deep_clone_cell(old_cell));
                }
                Value::Instance(Instance {
                    class_name: instance.class_name,
                    fields: SymbolTable::from_base_frame(new_frame),
                })
            }
            other => other,
        }
    }

    fn deep_clone_cell(&mut self, old_cell: &Cell) -> Cell {
        let new_cell = Cell::new();
        if let Some(id) = old_cell.value_id() {
            let (value, ty) = {
                let entry = self.arena.get(&id).expect("live value");
                (entry.value.clone(), entry.declared_type.clone())
            };
            let cloned = self.deep_clone_value(value);
            self.alloc_into(&new_cell, cloned, ty);
        }
        new_cell
    }

    /// Binds `cell` (expected fresh/unbound) directly to an already-live
    /// `id`, without allocating a new value. Used to hand back a regular
    /// cell for a value that was built behind a placeholder, once
    /// construction finishes.
    pub fn rebind(&mut self, cell: &Cell, id: ValueId) {
        self.release_cell(cell);
        self.bind_unchecked(cell, id);
    }

    /// Allocates a placeholder cell bound to a freshly constructed
    /// instance value, returning both so the caller (the evaluator's
    /// constructor-call path) can bind `this` to it while the
    /// constructor body runs and later rebind the result to a regular
    /// cell.
    pub fn alloc_instance_placeholder(
        &mut self,
        class_name: impl Into<String>,
        declared_type: TypeDecl,
    ) -> (Cell, ValueId) {
        let cell = Cell::new_placeholder();
        let id = self.alloc_into(
            &cell,
            Value::Instance(Instance {
                class_name: class_name.into(),
                fields: SymbolTable::new(),
            }),
            declared_type,
        );
        (cell, id)
    }
}
