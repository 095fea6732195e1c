use crate::token::Position;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexicalError {
    #[error("{pos}: unknown character '{ch}'")]
    UnknownChar { ch: char, pos: Position },

    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: Position },

    #[error("{pos}: unterminated char literal")]
    UnterminatedChar { pos: Position },

    #[error("{pos}: char literal must contain exactly one character")]
    BadCharLiteral { pos: Position },

    #[error("{pos}: unknown escape sequence '\\{ch}'")]
    BadEscape { ch: char, pos: Position },
}

#[derive(Debug, Error)]
#[error("{pos}: {non_terminal} cannot accept {found}")]
pub struct ParseError {
    pub non_terminal: String,
    pub found: String,
    pub pos: Position,
}

impl LexicalError {
    pub fn pos(&self) -> Position {
        match self {
            LexicalError::UnknownChar { pos, .. }
            | LexicalError::UnterminatedString { pos }
            | LexicalError::UnterminatedChar { pos }
            | LexicalError::BadCharLiteral { pos }
            | LexicalError::BadEscape { pos, .. } => *pos,
        }
    }
}
