//! A stack of lexical frames mapping names to [`Cell`]s, mirroring
//! `SymTable::addLayer`/`removeLayer`/`insert`/`lookup` in
//! `examples/original_source/src/ast.cpp`.
//!
//! Dotted paths (`this.v`, `obj.field.sub`) are not resolved here: only
//! [`Registry`](crate::registry::Registry) can dereference a cell into the
//! instance it may hold, so path resolution lives there.

use crate::cell::Cell;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    frames: Vec<HashMap<String, Cell>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            frames: vec![HashMap::new()],
        }
    }

    pub fn add_layer(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn remove_layer(&mut self) -> Option<HashMap<String, Cell>> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds `name` to `cell` in the innermost frame. Shadows, rather than
    /// errors on, a binding of the same name in an outer frame.
    pub fn insert(&mut self, name: impl Into<String>, cell: Cell) {
        self.frames
            .last_mut()
            .expect("symbol table always has at least one frame")
            .insert(name.into(), cell);
    }

    /// `true` if `name` is already bound in the innermost frame — callers
    /// use this to reject redeclaration within the same scope.
    pub fn declared_in_current_frame(&self, name: &str) -> bool {
        self.frames
            .last()
            .expect("symbol table always has at least one frame")
            .contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Cell> {
        for frame in self.frames.iter().rev() {
            if let Some(cell) = frame.get(name) {
                return Some(cell.clone());
            }
        }
        None
    }

    /// All cells bound anywhere in this table, innermost frame first —
    /// used when tearing down an instance's fields on destruction.
    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.frames.iter().rev().flat_map(|frame| frame.values())
    }

    /// An instance's field table is always a single frame (field lookup
    /// never needs nested scoping). Deep-copying an instance walks this
    /// frame directly rather than the general frame stack.
    pub(crate) fn base_frame(&self) -> &HashMap<String, Cell> {
        &self.frames[0]
    }

    pub(crate) fn from_base_frame(frame: HashMap<String, Cell>) -> SymbolTable {
        SymbolTable {
            frames: vec![frame],
        }
    }
}
