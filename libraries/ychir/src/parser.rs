//! Hand-rolled recursive-descent parser with precedence climbing for
//! expressions, following the same chain of non-terminals as
//! `examples/original_source/src/parser.cpp`
//! (`e_pars` -> `e_mul_div` -> `e_add_sub` -> `e_lgte` -> `e_eq_neq` ->
//! `e_bitwise_and` -> `e_bitwise_xor` -> `e_bitwise_or` -> `e_logical_and`
//! -> `e_logical_or` -> `e_assign`).

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Position, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn cur_pos(&self) -> Position {
        self.cur().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, non_terminal: &str) -> ParseError {
        ParseError {
            non_terminal: non_terminal.to_string(),
            found: self.cur().kind.to_string(),
            pos: self.cur_pos(),
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.cur().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind, non_terminal: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(non_terminal))
        }
    }

    fn eat_ident(&mut self, non_terminal: &str) -> PResult<String> {
        match &self.cur().kind {
            TokenKind::Ident(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error(non_terminal)),
        }
    }

    fn is_ident(&self, want: &str) -> bool {
        matches!(&self.cur().kind, TokenKind::Ident(s) if s == want)
    }

    // ---- top level ----------------------------------------------------

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut decls = Vec::new();
        while !self.check(&TokenKind::Eof) {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        match &self.cur().kind {
            TokenKind::KwFunction => Ok(Decl::Func(self.parse_func_decl()?)),
            TokenKind::KwClass => Ok(Decl::Class(self.parse_class_decl()?)),
            TokenKind::KwUnion => Ok(Decl::Union(self.parse_union_decl()?)),
            TokenKind::KwVar | TokenKind::KwConst => {
                let v = self.parse_var_decl()?;
                self.eat(&TokenKind::Semi, "variable declaration")?;
                Ok(Decl::Var(v))
            }
            _ => Err(self.error("top-level declaration")),
        }
    }

    fn parse_generic_param(&mut self) -> PResult<Option<String>> {
        if self.check(&TokenKind::Lt) {
            self.advance();
            let name = self.eat_ident("generic parameter")?;
            self.eat(&TokenKind::Gt, "generic parameter list")?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_type(&mut self) -> PResult<TypeDecl> {
        let base = match &self.cur().kind {
            TokenKind::TyVoid => BaseType::Void,
            TokenKind::TyBool => BaseType::Bool,
            TokenKind::TyInt32 => BaseType::Int32,
            TokenKind::TyUint8 => BaseType::Uint8,
            TokenKind::TyChar => BaseType::Char,
            TokenKind::TyFp32 => BaseType::Fp32,
            TokenKind::TyFp64 => BaseType::Fp64,
            TokenKind::TyStr => BaseType::Str,
            TokenKind::Ident(s) => BaseType::Named(s.clone()),
            _ => return Err(self.error("type name")),
        };
        self.advance();
        let generic_arg = if self.check(&TokenKind::Lt) {
            self.advance();
            let inner = self.parse_type()?;
            self.eat(&TokenKind::Gt, "generic type argument")?;
            Some(Box::new(inner))
        } else {
            None
        };
        let array_len = if self.check(&TokenKind::LBracket) {
            self.advance();
            let len = match &self.cur().kind {
                TokenKind::Int(s) => s.parse::<usize>().map_err(|_| self.error("array length"))?,
                _ => return Err(self.error("array length")),
            };
            self.advance();
            self.eat(&TokenKind::RBracket, "array type")?;
            len
        } else {
            0
        };
        Ok(TypeDecl {
            base,
            generic_arg,
            array_len,
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.eat(&TokenKind::LParen, "parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let pos = self.cur_pos();
                let name = self.eat_ident("parameter name")?;
                self.eat(&TokenKind::Colon, "parameter type annotation")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty, pos });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat(&TokenKind::RParen, "parameter list")?;
        Ok(params)
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwFunction, "function declaration")?;
        let name = self.eat_ident("function name")?;
        let generic_param = self.parse_generic_param()?;
        let params = self.parse_params()?;
        let ret = if self.check(&TokenKind::Colon) {
            self.advance();
            self.parse_type()?
        } else {
            TypeDecl::simple(BaseType::Void)
        };
        let body = self.parse_block()?;
        Ok(FuncDecl {
            name,
            generic_param,
            params,
            ret,
            body,
            pos,
        })
    }

    /// `ClassDef := class NAME Generic? { (VarDef|ConstDef|FuncDecl)* }` —
    /// member declarations are ordinary var/const declarations (with their
    /// usual optional initializer), not a bare name:type pair.
    fn parse_class_decl(&mut self) -> PResult<ClassDecl> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwClass, "class declaration")?;
        let name = self.eat_ident("class name")?;
        let generic_param = self.parse_generic_param()?;
        self.eat(&TokenKind::LBrace, "class body")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructor = None;
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::KwFunction) {
                let f = self.parse_func_decl()?;
                if f.name == "new" {
                    constructor = Some(f);
                } else {
                    methods.push(f);
                }
            } else {
                let v = self.parse_var_decl()?;
                self.eat(&TokenKind::Semi, "member declaration")?;
                fields.push(v);
            }
        }
        self.eat(&TokenKind::RBrace, "class body")?;
        Ok(ClassDecl {
            name,
            generic_param,
            fields,
            methods,
            constructor,
            pos,
        })
    }

    /// `UnionDef := union NAME Generic? { ClassDef* }` — each variant is a
    /// full class declaration, tagged at runtime by its class name.
    fn parse_union_decl(&mut self) -> PResult<UnionDecl> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwUnion, "union declaration")?;
        let name = self.eat_ident("union name")?;
        let generic_param = self.parse_generic_param()?;
        self.eat(&TokenKind::LBrace, "union body")?;
        let mut variants = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            variants.push(self.parse_class_decl()?);
        }
        self.eat(&TokenKind::RBrace, "union body")?;
        Ok(UnionDecl {
            name,
            generic_param,
            variants,
            pos,
        })
    }

    fn parse_var_decl(&mut self) -> PResult<VarDecl> {
        let pos = self.cur_pos();
        let is_const = self.check(&TokenKind::KwConst);
        self.advance(); // `var` or `const`
        let name = self.eat_ident("variable name")?;
        self.eat(&TokenKind::Colon, "variable type annotation")?;
        let ty = self.parse_type()?;
        let init = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        if is_const && init.is_none() {
            return Err(self.error("const declaration requires an initializer"));
        }
        Ok(VarDecl {
            name,
            ty,
            is_const,
            init,
            pos,
        })
    }

    // ---- statements -----------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        self.eat(&TokenKind::LBrace, "block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.eat(&TokenKind::RBrace, "block")?;
        Ok(Block { stmts })
    }

    /// Recognizes the special statement-position forms `move(lhs, rhs);`
    /// and `deepcopy(lhs, rhs);`, which the grammar's single `=` token
    /// cannot express on its own.
    fn try_parse_assignment_form(&mut self) -> PResult<Option<Stmt>> {
        let op = if self.is_ident("move") {
            BinOp::Move
        } else if self.is_ident("deepcopy") {
            BinOp::DeepCopy
        } else {
            return Ok(None);
        };
        if !matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::LParen)) {
            return Ok(None);
        }
        let pos = self.cur_pos();
        self.advance(); // `move` / `deepcopy`
        self.advance(); // `(`
        let lhs = self.parse_expr()?;
        self.eat(&TokenKind::Comma, "assignment form argument list")?;
        let rhs = self.parse_expr()?;
        self.eat(&TokenKind::RParen, "assignment form argument list")?;
        self.eat(&TokenKind::Semi, "statement")?;
        Ok(Some(Stmt::Expr(Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            pos,
        }))))
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if let Some(stmt) = self.try_parse_assignment_form()? {
            return Ok(stmt);
        }
        match &self.cur().kind {
            TokenKind::KwVar | TokenKind::KwConst => {
                let v = self.parse_var_decl()?;
                self.eat(&TokenKind::Semi, "variable declaration")?;
                Ok(Stmt::VarDecl(v))
            }
            TokenKind::KwWhile => Ok(Stmt::While(self.parse_while()?)),
            TokenKind::KwFor => Ok(Stmt::For(self.parse_for()?)),
            TokenKind::KwIf => Ok(Stmt::Expr(Expr::If(self.parse_if()?))),
            TokenKind::KwMatch => Ok(Stmt::Expr(Expr::Match(self.parse_match()?))),
            TokenKind::KwReturn => {
                let pos = self.cur_pos();
                self.advance();
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.eat(&TokenKind::Semi, "return statement")?;
                Ok(Stmt::Return(value, pos))
            }
            TokenKind::KwBreak => {
                let pos = self.cur_pos();
                self.advance();
                self.eat(&TokenKind::Semi, "break statement")?;
                Ok(Stmt::Break(pos))
            }
            TokenKind::KwContinue => {
                let pos = self.cur_pos();
                self.advance();
                self.eat(&TokenKind::Semi, "continue statement")?;
                Ok(Stmt::Continue(pos))
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => {
                let e = self.parse_expr()?;
                self.eat(&TokenKind::Semi, "expression statement")?;
                Ok(Stmt::Expr(e))
            }
        }
    }

    fn parse_if(&mut self) -> PResult<IfExpr> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwIf, "if expression")?;
        self.eat(&TokenKind::LParen, "if condition")?;
        let cond = Box::new(self.parse_expr()?);
        self.eat(&TokenKind::RParen, "if condition")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check(&TokenKind::KwElse) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(IfExpr {
            cond,
            then_branch,
            else_branch,
            pos,
        })
    }

    fn parse_while(&mut self) -> PResult<WhileExpr> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwWhile, "while loop")?;
        self.eat(&TokenKind::LParen, "while condition")?;
        let cond = Box::new(self.parse_expr()?);
        self.eat(&TokenKind::RParen, "while condition")?;
        let body = self.parse_block()?;
        Ok(WhileExpr { cond, body, pos })
    }

    fn parse_for(&mut self) -> PResult<ForExpr> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwFor, "for loop")?;
        self.eat(&TokenKind::LParen, "for loop header")?;
        let init = if self.check(&TokenKind::Semi) {
            None
        } else if matches!(self.cur().kind, TokenKind::KwVar | TokenKind::KwConst) {
            Some(Box::new(Stmt::VarDecl(self.parse_var_decl()?)))
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expr()?)))
        };
        self.eat(&TokenKind::Semi, "for loop header")?;
        let cond = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.eat(&TokenKind::Semi, "for loop header")?;
        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if self.check(&TokenKind::Semi) {
            self.advance();
        }
        self.eat(&TokenKind::RParen, "for loop header")?;
        let body = self.parse_block()?;
        Ok(ForExpr {
            init,
            cond,
            step,
            body,
            pos,
        })
    }

    /// `MatchLine := NAME (` NAME `)`? { ExprList }` — `tag` names the
    /// union variant class the arm fires on; the optional parenthesized
    /// name captures the matched instance inside `body`.
    fn parse_match(&mut self) -> PResult<MatchExpr> {
        let pos = self.cur_pos();
        self.eat(&TokenKind::KwMatch, "match expression")?;
        self.eat(&TokenKind::LParen, "match scrutinee")?;
        let scrutinee = Box::new(self.parse_expr()?);
        self.eat(&TokenKind::RParen, "match scrutinee")?;
        self.eat(&TokenKind::LBrace, "match body")?;
        let mut lines = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let line_pos = self.cur_pos();
            let tag = self.eat_ident("match arm tag")?;
            let capture = if self.check(&TokenKind::LParen) {
                self.advance();
                let name = self.eat_ident("match arm capture name")?;
                self.eat(&TokenKind::RParen, "match arm capture name")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            lines.push(MatchLine {
                tag,
                capture,
                body,
                pos: line_pos,
            });
        }
        self.eat(&TokenKind::RBrace, "match body")?;
        Ok(MatchExpr {
            scrutinee,
            lines,
            pos,
        })
    }

    // ---- expressions, precedence climbing ------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> PResult<Expr> {
        let lhs = self.parse_logical_or()?;
        if self.check(&TokenKind::Assign) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_assign()?;
            return Ok(Expr::Binary(BinaryExpr {
                op: BinOp::Copy,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            }));
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_logical_and()?;
        while self.check(&TokenKind::PipePipe) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitor()?;
        while self.check(&TokenKind::AmpAmp) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitxor()?;
        while self.check(&TokenKind::Pipe) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_bitxor()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::BitOr,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.check(&TokenKind::Caret) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_bitand()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::BitXor,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_eq_neq()?;
        while self.check(&TokenKind::Amp) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_eq_neq()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::BitAnd,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_eq_neq(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_cmp()?;
        loop {
            let op = if self.check(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.check(&TokenKind::NotEq) {
                BinOp::NotEq
            } else {
                break;
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_add_sub()?;
        loop {
            let op = match &self.cur().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_add_sub()?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_add_sub(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_mul_div()?;
        loop {
            let op = match &self.cur().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_mul_div()?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_mul_div(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match &self.cur().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.check(&TokenKind::Bang) {
            let pos = self.cur_pos();
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?), pos));
        }
        if self.check(&TokenKind::Minus) {
            let pos = self.cur_pos();
            self.advance();
            return Ok(Expr::Neg(Box::new(self.parse_unary()?), pos));
        }
        self.parse_cast()
    }

    /// `(type) expr` — the only cast syntax the runtime's `typeconv`
    /// matrix supports, so the parser handles it here rather than in
    /// `parse_primary`'s parenthesized-expression case.
    fn parse_cast(&mut self) -> PResult<Expr> {
        if self.check(&TokenKind::LParen) && self.looks_like_cast() {
            let pos = self.cur_pos();
            self.advance();
            let ty = self.parse_type()?;
            self.eat(&TokenKind::RParen, "cast expression")?;
            let value = Box::new(self.parse_unary()?);
            return Ok(Expr::Cast(CastExpr {
                target_ty: ty,
                value,
                pos,
            }));
        }
        self.parse_postfix()
    }

    fn looks_like_cast(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(
                TokenKind::TyVoid
                    | TokenKind::TyBool
                    | TokenKind::TyInt32
                    | TokenKind::TyUint8
                    | TokenKind::TyChar
                    | TokenKind::TyFp32
                    | TokenKind::TyFp64
                    | TokenKind::TyStr
            )
        ) && matches!(self.tokens.get(self.pos + 2).map(|t| &t.kind), Some(TokenKind::RParen))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(&TokenKind::LBracket) {
                let pos = self.cur_pos();
                self.advance();
                let index = Box::new(self.parse_expr()?);
                self.eat(&TokenKind::RBracket, "index expression")?;
                expr = Expr::Index(IndexExpr {
                    target: Box::new(expr),
                    index,
                    pos,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_name_path(&mut self, first: String, pos: Position) -> PResult<Name> {
        let mut owners = Vec::new();
        let mut base = first;
        while self.check(&TokenKind::Dot) {
            self.advance();
            owners.push(base);
            base = self.eat_ident("name path segment")?;
        }
        let _ = pos;
        Ok(Name::path(owners, base))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        match self.cur().kind.clone() {
            TokenKind::Int(s) => {
                self.advance();
                let v = s.parse::<i32>().map_err(|_| self.error("integer literal"))?;
                Ok(Expr::Literal(LiteralValue::Int(v), pos))
            }
            TokenKind::Float(s) => {
                self.advance();
                let v = s.parse::<f64>().map_err(|_| self.error("float literal"))?;
                Ok(Expr::Literal(LiteralValue::Fp64(v), pos))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Char(c), pos))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Str(s), pos))
            }
            TokenKind::Ident(s) if s == "true" || s == "false" => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Bool(s == "true"), pos))
            }
            TokenKind::Ident(s) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.eat(&TokenKind::RParen, "call argument list")?;
                    return Ok(Expr::Call(FuncCall {
                        callee: Name::simple(s),
                        args,
                        pos,
                    }));
                }
                if self.check(&TokenKind::Dot) {
                    let name = self.parse_name_path(s, pos)?;
                    if self.check(&TokenKind::LParen) {
                        self.advance();
                        let mut args = Vec::new();
                        if !self.check(&TokenKind::RParen) {
                            loop {
                                args.push(self.parse_expr()?);
                                if self.check(&TokenKind::Comma) {
                                    self.advance();
                                } else {
                                    break;
                                }
                            }
                        }
                        self.eat(&TokenKind::RParen, "call argument list")?;
                        return Ok(Expr::Call(FuncCall {
                            callee: name,
                            args,
                            pos,
                        }));
                    }
                    return Ok(Expr::Name(name, pos));
                }
                Ok(Expr::Name(Name::simple(s), pos))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.eat(&TokenKind::RParen, "parenthesized expression")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.eat(&TokenKind::RBracket, "array literal")?;
                Ok(Expr::Array(items, pos))
            }
            TokenKind::KwIf => Ok(Expr::If(self.parse_if()?)),
            TokenKind::KwMatch => Ok(Expr::Match(self.parse_match()?)),
            _ => Err(self.error("expression")),
        }
    }
}

pub fn parse(tokens: Vec<Token>) -> PResult<Program> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Program {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_empty_function() {
        let prog = parse_src("function main():void{}");
        assert_eq!(prog.decls.len(), 1);
        match &prog.decls[0] {
            Decl::Func(f) => {
                assert_eq!(f.name, "main");
                assert!(f.body.stmts.is_empty());
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn parses_precedence_chain() {
        let prog = parse_src("function f():void{var x:int32 = 1 + 2 * 3;}");
        let Decl::Func(f) = &prog.decls[0] else { panic!() };
        let Stmt::VarDecl(v) = &f.body.stmts[0] else { panic!() };
        let Some(init) = &v.init else { panic!() };
        let Expr::Binary(top) = init.as_ref() else { panic!() };
        assert_eq!(top.op, BinOp::Add);
        let Expr::Binary(rhs) = top.rhs.as_ref() else { panic!() };
        assert_eq!(rhs.op, BinOp::Mul);
    }

    #[test]
    fn parses_move_and_deepcopy_forms() {
        let prog = parse_src("function f():void{var a:int32 = 1; var b:int32 = 2; move(a, b); deepcopy(a, b);}");
        let Decl::Func(f) = &prog.decls[0] else { panic!() };
        let Stmt::Expr(Expr::Binary(mv)) = &f.body.stmts[2] else { panic!() };
        assert_eq!(mv.op, BinOp::Move);
        let Stmt::Expr(Expr::Binary(dc)) = &f.body.stmts[3] else { panic!() };
        assert_eq!(dc.op, BinOp::DeepCopy);
    }

    #[test]
    fn parses_class_with_constructor() {
        let prog = parse_src(
            "class Point { var x: int32; var y: int32; function new(x: int32, y: int32):Point { } }",
        );
        let Decl::Class(c) = &prog.decls[0] else { panic!() };
        assert_eq!(c.fields.len(), 2);
        assert!(c.constructor.is_some());
    }

    #[test]
    fn parses_union_of_variant_classes() {
        let prog = parse_src(
            "union Shape { class Circle { var r: int32; } class Square { var side: int32; } }",
        );
        let Decl::Union(u) = &prog.decls[0] else { panic!() };
        assert_eq!(u.variants.len(), 2);
        assert_eq!(u.variants[0].name, "Circle");
        assert_eq!(u.variants[1].name, "Square");
    }

    #[test]
    fn parses_match_with_tag_and_capture() {
        let prog = parse_src(
            "function f():void{ match (x) { Circle(c) { } Square { } } }",
        );
        let Decl::Func(f) = &prog.decls[0] else { panic!() };
        let Stmt::Expr(Expr::Match(m)) = &f.body.stmts[0] else { panic!() };
        assert_eq!(m.lines[0].tag, "Circle");
        assert_eq!(m.lines[0].capture, Some("c".to_string()));
        assert_eq!(m.lines[1].tag, "Square");
        assert_eq!(m.lines[1].capture, None);
    }

    #[test]
    fn parses_dotted_name_path() {
        let prog = parse_src("function f():void{ var a:int32 = this.v; }");
        let Decl::Func(f) = &prog.decls[0] else { panic!() };
        let Stmt::VarDecl(v) = &f.body.stmts[0] else { panic!() };
        let Some(init) = &v.init else { panic!() };
        let Expr::Name(name, _) = init.as_ref() else { panic!() };
        assert_eq!(name.owners, vec!["this".to_string()]);
        assert_eq!(name.base, "v");
    }

    #[test]
    fn reports_parse_error_with_position() {
        let err = parse(tokenize("function f(:void{}").unwrap()).unwrap_err();
        assert_eq!(err.pos.row, 1);
    }
}
