//! The value ownership registry and lexically scoped symbol table for the
//! yc language.

mod cell;
mod error;
mod registry;
mod symbol_table;
mod value;

pub use cell::Cell;
pub use error::RegistryError;
pub use registry::Registry;
pub use symbol_table::SymbolTable;
pub use value::{Instance, Value, ValueId};

#[cfg(test)]
mod tests {
    use super::*;
    use ychir::{BaseType, TypeDecl};

    fn int_ty() -> TypeDecl {
        TypeDecl::simple(BaseType::Int32)
    }

    #[test]
    fn copy_shares_the_value_without_invalidating_the_source() {
        let mut reg = Registry::new();
        let a = Cell::new();
        let b = Cell::new();
        reg.alloc_into(&a, Value::Int32(7), int_ty());
        reg.copy_into(&b, &a).unwrap();
        assert!(a.value_id().is_some());
        assert_eq!(reg.value_of(&a).unwrap().type_name(), "int32");
        assert_eq!(a.value_id(), b.value_id());
    }

    #[test]
    fn move_invalidates_every_other_cell() {
        let mut reg = Registry::new();
        let a = Cell::new();
        let b = Cell::new();
        let c = Cell::new();
        reg.alloc_into(&a, Value::Int32(1), int_ty());
        reg.copy_into(&b, &a).unwrap();
        reg.move_into(&c, &a).unwrap();
        assert!(a.value_id().is_none());
        assert!(b.value_id().is_none());
        assert!(c.value_id().is_some());
    }

    #[test]
    fn deepcopy_produces_an_independent_value() {
        let mut reg = Registry::new();
        let a = Cell::new();
        let b = Cell::new();
        reg.alloc_into(&a, Value::Int32(5), int_ty());
        reg.deepcopy_into(&b, &a).unwrap();
        assert_ne!(a.value_id(), b.value_id());
        if let Some(Value::Int32(n)) = reg.value_of(&b) {
            assert_eq!(*n, 5);
        } else {
            panic!("expected int32");
        }
    }

    #[test]
    fn releasing_the_last_cell_destroys_the_value() {
        let mut reg = Registry::new();
        let a = Cell::new();
        let id = reg.alloc_into(&a, Value::Int32(9), int_ty());
        reg.release_cell(&a);
        assert!(reg.get(id).is_none());
    }

    #[test]
    fn placeholder_cells_keep_the_value_alive_with_zero_referencing_cells() {
        let mut reg = Registry::new();
        let (placeholder, id) = reg.alloc_instance_placeholder("Point", int_ty());
        reg.release_cell(&placeholder);
        assert!(reg.get(id).is_some());
    }

    #[test]
    fn const_reassignment_is_rejected() {
        let mut reg = Registry::new();
        let src = Cell::new();
        let dst = Cell::new_const();
        reg.alloc_into(&src, Value::Int32(1), int_ty());
        reg.alloc_into(&dst, Value::Int32(2), int_ty());
        let err = reg.copy_into(&dst, &src).unwrap_err();
        assert_eq!(err, RegistryError::ConstReassignment);
    }
}
