//! The interpreter's error taxonomy, covering every failure mode
//! `examples/original_source/src/err.hpp`'s single `InterpreterException`
//! collapses into one message: here each gets its own variant so callers
//! can match on what actually went wrong.

use thiserror::Error;
use ychir::Position;

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("{pos}: name `{name}` is not defined")]
    NameError { name: String, pos: Position },

    #[error("{pos}: expected type `{expected}`, found `{found}`")]
    TypeError {
        expected: String,
        found: String,
        pos: Position,
    },

    #[error("{pos}: index {index} out of bounds for array of length {len}")]
    IndexError {
        index: i64,
        len: usize,
        pos: Position,
    },

    #[error("{pos}: `{name}` expects {expected} argument(s), got {found}")]
    ArityError {
        name: String,
        expected: usize,
        found: usize,
        pos: Position,
    },

    #[error("{pos}: cannot assign to const binding `{name}`")]
    ConstError { name: String, pos: Position },

    #[error("{pos}: failed to import `{path}`: {reason}")]
    ImportError {
        path: String,
        reason: String,
        pos: Position,
    },

    #[error("{pos}: internal interpreter error: {message}")]
    InternalError { message: String, pos: Position },

    #[error("{pos}: `{feature}` is not implemented")]
    NotImplemented { feature: String, pos: Position },
}

impl InterpreterError {
    pub fn pos(&self) -> Position {
        match self {
            InterpreterError::NameError { pos, .. }
            | InterpreterError::TypeError { pos, .. }
            | InterpreterError::IndexError { pos, .. }
            | InterpreterError::ArityError { pos, .. }
            | InterpreterError::ConstError { pos, .. }
            | InterpreterError::ImportError { pos, .. }
            | InterpreterError::InternalError { pos, .. }
            | InterpreterError::NotImplemented { pos, .. } => *pos,
        }
    }
}
