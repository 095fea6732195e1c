//! The token stream produced by the lexer.
//!
//! Every token carries the row/column it started at and the full source
//! line it appeared on, so diagnostics further down the pipeline (parser,
//! evaluator) can print `line R:C: <source line>` without re-scanning.

use std::fmt::{self, Display, Formatter};

/// A position in the source, 1-indexed to match what a human would point at
/// in an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(String),
    Float(String),
    Char(char),
    Str(String),

    KwVar,
    KwConst,
    KwFunction,
    KwClass,
    KwUnion,
    KwIf,
    KwElse,
    KwMatch,
    KwWhile,
    KwFor,
    KwBreak,
    KwContinue,
    KwReturn,

    TyVoid,
    TyBool,
    TyInt32,
    TyUint8,
    TyChar,
    TyFp32,
    TyFp64,
    TyStr,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semi,
    Dot,

    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,
    Bang,

    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            Ident(s) => write!(f, "identifier `{s}`"),
            Int(s) => write!(f, "integer literal `{s}`"),
            Float(s) => write!(f, "float literal `{s}`"),
            Char(c) => write!(f, "char literal '{c}'"),
            Str(s) => write!(f, "string literal \"{s}\""),
            KwVar => write!(f, "`var`"),
            KwConst => write!(f, "`const`"),
            KwFunction => write!(f, "`function`"),
            KwClass => write!(f, "`class`"),
            KwUnion => write!(f, "`union`"),
            KwIf => write!(f, "`if`"),
            KwElse => write!(f, "`else`"),
            KwMatch => write!(f, "`match`"),
            KwWhile => write!(f, "`while`"),
            KwFor => write!(f, "`for`"),
            KwBreak => write!(f, "`break`"),
            KwContinue => write!(f, "`continue`"),
            KwReturn => write!(f, "`return`"),
            TyVoid => write!(f, "`void`"),
            TyBool => write!(f, "`bool`"),
            TyInt32 => write!(f, "`int32`"),
            TyUint8 => write!(f, "`uint8`"),
            TyChar => write!(f, "`char`"),
            TyFp32 => write!(f, "`fp32`"),
            TyFp64 => write!(f, "`fp64`"),
            TyStr => write!(f, "`str`"),
            LParen => write!(f, "`(`"),
            RParen => write!(f, "`)`"),
            LBrace => write!(f, "`{{`"),
            RBrace => write!(f, "`}}`"),
            LBracket => write!(f, "`[`"),
            RBracket => write!(f, "`]`"),
            Comma => write!(f, "`,`"),
            Colon => write!(f, "`:`"),
            Semi => write!(f, "`;`"),
            Dot => write!(f, "`.`"),
            Assign => write!(f, "`=`"),
            EqEq => write!(f, "`==`"),
            NotEq => write!(f, "`!=`"),
            Lt => write!(f, "`<`"),
            Le => write!(f, "`<=`"),
            Gt => write!(f, "`>`"),
            Ge => write!(f, "`>=`"),
            Plus => write!(f, "`+`"),
            Minus => write!(f, "`-`"),
            Star => write!(f, "`*`"),
            Slash => write!(f, "`/`"),
            Percent => write!(f, "`%`"),
            Amp => write!(f, "`&`"),
            Pipe => write!(f, "`|`"),
            Caret => write!(f, "`^`"),
            AmpAmp => write!(f, "`&&`"),
            PipePipe => write!(f, "`||`"),
            Bang => write!(f, "`!`"),
            Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
    pub line: String,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position, line: impl Into<String>) -> Self {
        Token {
            kind,
            pos,
            line: line.into(),
        }
    }
}
