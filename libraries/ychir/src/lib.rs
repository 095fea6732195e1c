//! Lexer, AST, and recursive-descent parser for the yc language.

mod ast;
mod error;
mod lexer;
mod parser;
mod pretty;
mod token;

pub use ast::{
    BaseType, BinaryExpr, BinOp, Block, CastExpr, ClassDecl, Decl, Expr, ForExpr, FuncCall,
    FuncCallArgs, FuncDecl, IfExpr, IndexExpr, LiteralValue, MatchExpr, MatchLine, Name, Param,
    Program, Stmt, TypeDecl, TypeTable, UnionDecl, VarDecl, WhileExpr, types_equal,
};
pub use error::{LexicalError, ParseError};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use pretty::{print_program, type_to_string};
pub use token::{Position, Token, TokenKind};

/// Lexes and parses a full source file in one step.
pub fn parse_source(src: &str) -> Result<Program, SourceError> {
    let tokens = tokenize(src)?;
    let program = parse(tokens)?;
    Ok(program)
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SourceError {
    pub fn pos(&self) -> Position {
        match self {
            SourceError::Lexical(e) => e.pos(),
            SourceError::Parse(e) => e.pos,
        }
    }
}

/// Renders a two-line source diagnostic, `line R:C: <source line>` followed
/// by `message`, the same shape `ErrInfo`/`InterpreterException::what()`
/// print in `examples/original_source/src/err.cpp`. Shared by `ycc` and
/// `ycfmt` so both tools report lexer/parser/interpreter failures the same
/// way, rather than each tool re-deriving the source line from `pos.row`.
pub fn diagnostic(source: &str, pos: Position, message: impl std::fmt::Display) -> String {
    let line = source.lines().nth(pos.row.saturating_sub(1)).unwrap_or("");
    format!("line {}:{}: {line}\n{message}", pos.row, pos.col)
}
