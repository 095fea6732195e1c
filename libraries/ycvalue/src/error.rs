use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("use of a value after it was moved out of this binding")]
    UseOfMovedValue,

    #[error("cannot assign to a const binding")]
    ConstReassignment,
}
