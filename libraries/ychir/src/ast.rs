//! The tagged-sum abstract syntax tree produced by the parser.
//!
//! Every node that can appear in a diagnostic carries the [`Position`] it
//! started at, so the evaluator can report precise locations without
//! threading the token stream any further than this.

use crate::token::Position;
use std::collections::HashMap;

/// A possibly-dotted name, e.g. `x`, `this.v`, `Point.new`.
///
/// Equality and hashing use every segment, not just [`Name::base`] — two
/// names that merely share a base (`a.x` and `b.x`) are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub owners: Vec<String>,
    pub base: String,
}

impl Name {
    pub fn simple(base: impl Into<String>) -> Self {
        Name {
            owners: Vec::new(),
            base: base.into(),
        }
    }

    pub fn path(owners: Vec<String>, base: impl Into<String>) -> Self {
        Name {
            owners,
            base: base.into(),
        }
    }

    /// `true` for names of the shape `X.new`, which resolve against the
    /// enclosing scope rather than an instance's own symbol table.
    pub fn is_constructor_path(&self) -> bool {
        self.base == "new" && !self.owners.is_empty()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for owner in &self.owners {
            write!(f, "{owner}.")?;
        }
        write!(f, "{}", self.base)
    }
}

/// The base primitive and user-defined type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Bool,
    Int32,
    Uint8,
    Char,
    Fp32,
    Fp64,
    Str,
    /// A user-declared class or union, by name.
    Named(String),
}

/// A type reference as written in source: a base type, an optional single
/// generic parameter (e.g. `List<int32>`), and an array length (`0` means
/// scalar, matching the source's `TYPE[N]` suffix).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDecl {
    pub base: BaseType,
    pub generic_arg: Option<Box<TypeDecl>>,
    pub array_len: usize,
}

impl TypeDecl {
    pub fn simple(base: BaseType) -> Self {
        TypeDecl {
            base,
            generic_arg: None,
            array_len: 0,
        }
    }

    /// The type of one element, stripping the array length this type
    /// carries. Used to materialize/zero-initialize array members.
    pub fn element_type(&self) -> TypeDecl {
        TypeDecl {
            base: self.base.clone(),
            generic_arg: self.generic_arg.clone(),
            array_len: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// Plain `=`: rebind the target cell without invalidating its peers.
    Copy,
    /// `move(lhs, rhs)`: rebind the target cell and invalidate every other
    /// cell currently holding that value.
    Move,
    /// `deepcopy(lhs, rhs)`: rebind the target cell to a fresh, fully
    /// cloned value.
    DeepCopy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i32),
    Uint8(u8),
    Fp32(f32),
    Fp64(f64),
    Char(char),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDecl,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub generic_param: Option<String>,
    pub params: Vec<Param>,
    pub ret: TypeDecl,
    pub body: Block,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub generic_param: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<FuncDecl>,
    pub constructor: Option<FuncDecl>,
    pub pos: Position,
}

/// `union NAME { ClassDef* }`: a union is a set of variant classes, each
/// carrying its own member declarations. A union value is an instance of
/// exactly one of those variant classes, tagged by its class name.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionDecl {
    pub name: String,
    pub generic_param: Option<String>,
    pub variants: Vec<ClassDecl>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeDecl,
    pub is_const: bool,
    pub init: Option<Box<Expr>>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub cond: Box<Expr>,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileExpr {
    pub cond: Box<Expr>,
    pub body: Block,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
    pub body: Block,
    pub pos: Position,
}

/// One arm of a `match`: `NAME (` NAME `)`? { ExprList }`. `tag` names a
/// union variant's class; `capture`, when present, binds the matched
/// instance under that name inside `body`.
///
/// The original interpreter never implemented match dispatch; this
/// interpreter gives it real first-match-wins semantics (see the design
/// notes on why that gap was closed rather than carried forward).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLine {
    pub tag: String,
    pub capture: Option<String>,
    pub body: Block,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub scrutinee: Box<Expr>,
    pub lines: Vec<MatchLine>,
    pub pos: Position,
}

/// Arguments passed to a call, by position.
pub type FuncCallArgs = Vec<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub callee: Name,
    pub args: FuncCallArgs,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub target: Box<Expr>,
    pub index: Box<Expr>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub target_ty: TypeDecl,
    pub value: Box<Expr>,
    pub pos: Position,
}

/// An expression: anything that evaluates to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue, Position),
    Array(Vec<Expr>, Position),
    Name(Name, Position),
    Binary(BinaryExpr),
    Call(FuncCall),
    Index(IndexExpr),
    Cast(CastExpr),
    If(IfExpr),
    Match(MatchExpr),
    Not(Box<Expr>, Position),
    Neg(Box<Expr>, Position),
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Literal(_, p) => *p,
            Expr::Array(_, p) => *p,
            Expr::Name(_, p) => *p,
            Expr::Binary(b) => b.pos,
            Expr::Call(c) => c.pos,
            Expr::Index(i) => i.pos,
            Expr::Cast(c) => c.pos,
            Expr::If(i) => i.pos,
            Expr::Match(m) => m.pos,
            Expr::Not(_, p) => *p,
            Expr::Neg(_, p) => *p,
        }
    }
}

/// A statement: anything executed for its side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDecl),
    Expr(Expr),
    While(WhileExpr),
    For(ForExpr),
    Return(Option<Expr>, Position),
    Break(Position),
    Continue(Position),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Class(ClassDecl),
    Union(UnionDecl),
    Var(VarDecl),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Per-type symbol bookkeeping used by the type checker and evaluator to
/// look up class/union shapes by name. Kept here, alongside the AST nodes
/// it describes, rather than in the evaluator crate.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    pub classes: HashMap<String, ClassDecl>,
    pub unions: HashMap<String, UnionDecl>,
}

impl TypeTable {
    pub fn from_program(program: &Program) -> Self {
        let mut table = TypeTable::default();
        for decl in &program.decls {
            match decl {
                Decl::Class(c) => {
                    table.classes.insert(c.name.clone(), c.clone());
                }
                Decl::Union(u) => {
                    // Each variant is itself a full class declaration and is
                    // constructed/called the same way any other class is, so
                    // it needs to be addressable by name alongside top-level
                    // classes, not just through the union's own entry.
                    for variant in &u.variants {
                        table.classes.insert(variant.name.clone(), variant.clone());
                    }
                    table.unions.insert(u.name.clone(), u.clone());
                }
                _ => {}
            }
        }
        table
    }
}

/// Structural equality between two type references, resolving named types
/// through generic substitution but not through inheritance (the language
/// has none). Array types are equal only when both element kind and
/// length match.
pub fn types_equal(a: &TypeDecl, b: &TypeDecl) -> bool {
    a.base == b.base
        && a.array_len == b.array_len
        && match (&a.generic_arg, &b.generic_arg) {
            (None, None) => true,
            (Some(a), Some(b)) => types_equal(a, b),
            _ => false,
        }
}
