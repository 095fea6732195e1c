//! Converts source text into a stream of [`Token`]s.
//!
//! Token-shaped substrings (identifiers, numbers, punctuation) are
//! recognized with `nom` combinators; the outer driver walks the consumed
//! text character-by-character to keep row/column/line bookkeeping exact,
//! the same way `examples/original_source/src/scanner.cpp`'s `next()`
//! advances its own row/col/line fields one character at a time.

use crate::error::LexicalError;
use crate::token::{Position, Token, TokenKind};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as nchar, digit0, digit1},
    combinator::{map, opt, recognize},
    sequence::pair,
    IResult,
};

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn keyword_or_ident(s: &str) -> TokenKind {
    match s {
        "var" => TokenKind::KwVar,
        "const" => TokenKind::KwConst,
        "function" => TokenKind::KwFunction,
        "class" => TokenKind::KwClass,
        "union" => TokenKind::KwUnion,
        "if" => TokenKind::KwIf,
        "else" => TokenKind::KwElse,
        "match" => TokenKind::KwMatch,
        "while" => TokenKind::KwWhile,
        "for" => TokenKind::KwFor,
        "break" => TokenKind::KwBreak,
        "continue" => TokenKind::KwContinue,
        "return" => TokenKind::KwReturn,
        "void" => TokenKind::TyVoid,
        "bool" => TokenKind::TyBool,
        "int32" => TokenKind::TyInt32,
        "uint8" => TokenKind::TyUint8,
        "char" => TokenKind::TyChar,
        "fp32" => TokenKind::TyFp32,
        "fp64" => TokenKind::TyFp64,
        "str" => TokenKind::TyStr,
        _ => TokenKind::Ident(s.to_string()),
    }
}

fn lex_ident_or_keyword(input: &str) -> IResult<&str, TokenKind> {
    map(take_while1(is_ident_char), keyword_or_ident)(input)
}

fn lex_number(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(digit1, opt(pair(nchar('.'), digit0)))),
        |s: &str| {
            if s.contains('.') {
                TokenKind::Float(s.to_string())
            } else {
                TokenKind::Int(s.to_string())
            }
        },
    )(input)
}

/// Multi-character operators must be tried before their single-character
/// prefixes (`==` before `=`, `&&` before `&`, ...).
fn lex_operator(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map(tag("=="), |_| TokenKind::EqEq),
        map(tag("!="), |_| TokenKind::NotEq),
        map(tag("<="), |_| TokenKind::Le),
        map(tag(">="), |_| TokenKind::Ge),
        map(tag("&&"), |_| TokenKind::AmpAmp),
        map(tag("||"), |_| TokenKind::PipePipe),
        map(nchar('('), |_| TokenKind::LParen),
        map(nchar(')'), |_| TokenKind::RParen),
        map(nchar('{'), |_| TokenKind::LBrace),
        map(nchar('}'), |_| TokenKind::RBrace),
        map(nchar('['), |_| TokenKind::LBracket),
        map(nchar(']'), |_| TokenKind::RBracket),
        map(nchar(','), |_| TokenKind::Comma),
        map(nchar(':'), |_| TokenKind::Colon),
        map(nchar(';'), |_| TokenKind::Semi),
        map(nchar('.'), |_| TokenKind::Dot),
        map(nchar('='), |_| TokenKind::Assign),
        map(nchar('<'), |_| TokenKind::Lt),
        map(nchar('>'), |_| TokenKind::Gt),
        map(nchar('+'), |_| TokenKind::Plus),
        map(nchar('-'), |_| TokenKind::Minus),
        map(nchar('*'), |_| TokenKind::Star),
        map(nchar('/'), |_| TokenKind::Slash),
        map(nchar('%'), |_| TokenKind::Percent),
        map(nchar('&'), |_| TokenKind::Amp),
        map(nchar('|'), |_| TokenKind::Pipe),
        map(nchar('^'), |_| TokenKind::Caret),
        map(nchar('!'), |_| TokenKind::Bang),
    ))(input)
}

fn lex_word(input: &str) -> IResult<&str, TokenKind> {
    alt((lex_number, lex_ident_or_keyword, lex_operator))(input)
}

fn is_ascii_ws(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

fn skip_ws(input: &str) -> IResult<&str, &str> {
    take_while(is_ascii_ws)(input)
}

fn unescape_one(c: char) -> Option<char> {
    Some(match c {
        'a' => '\x07',
        'b' => '\x08',
        't' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        '"' => '"',
        '\'' => '\'',
        '?' => '?',
        '\\' => '\\',
        _ => return None,
    })
}

/// Drives the lexer over the whole source, producing a token stream
/// terminated by `TokenKind::Eof`.
pub struct Lexer<'a> {
    rest: &'a str,
    row: usize,
    col: usize,
    line: String,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            rest: src,
            row: 1,
            col: 0,
            line: String::new(),
        }
    }

    fn pos(&self) -> Position {
        Position {
            row: self.row,
            col: self.col,
        }
    }

    /// Advances the row/col/line bookkeeping over `consumed`, mirroring
    /// `scanner::next()`'s per-character advance.
    fn advance(&mut self, consumed: &str) {
        for c in consumed.chars() {
            if c == '\n' {
                self.row += 1;
                self.col = 0;
                self.line.clear();
            } else {
                self.col += 1;
                self.line.push(c);
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            if let Ok((rest, ws)) = skip_ws(self.rest) {
                if !ws.is_empty() {
                    self.advance(ws);
                    self.rest = rest;
                    continue;
                }
            }
            if self.rest.starts_with('#') {
                let end = self.rest.find('\n').unwrap_or(self.rest.len());
                let (comment, rest) = self.rest.split_at(end);
                self.advance(comment);
                self.rest = rest;
                continue;
            }
            break;
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexicalError> {
        let start_pos = self.pos();
        let mut chars = self.rest.char_indices();
        chars.next(); // opening quote
        let mut value = String::new();
        let mut consumed_len = 1; // the opening quote
        loop {
            let (idx, c) = chars.next().ok_or(LexicalError::UnterminatedString { pos: start_pos })?;
            consumed_len = idx + c.len_utf8();
            match c {
                '"' => break,
                '\\' => {
                    let (idx2, esc) = chars
                        .next()
                        .ok_or(LexicalError::UnterminatedString { pos: start_pos })?;
                    consumed_len = idx2 + esc.len_utf8();
                    let unescaped = unescape_one(esc).ok_or(LexicalError::BadEscape {
                        ch: esc,
                        pos: start_pos,
                    })?;
                    value.push(unescaped);
                }
                other => value.push(other),
            }
        }
        let (consumed, rest) = self.rest.split_at(consumed_len);
        self.advance(consumed);
        let line = self.line.clone();
        self.rest = rest;
        Ok(Token::new(TokenKind::Str(value), start_pos, line))
    }

    fn lex_char(&mut self) -> Result<Token, LexicalError> {
        let start_pos = self.pos();
        let mut chars = self.rest.char_indices();
        chars.next(); // opening quote
        let (idx, first) = chars
            .next()
            .ok_or(LexicalError::UnterminatedChar { pos: start_pos })?;
        let (value, mut consumed_len) = if first == '\\' {
            let (idx2, esc) = chars
                .next()
                .ok_or(LexicalError::UnterminatedChar { pos: start_pos })?;
            let unescaped = unescape_one(esc).ok_or(LexicalError::BadEscape {
                ch: esc,
                pos: start_pos,
            })?;
            (unescaped, idx2 + esc.len_utf8())
        } else {
            (first, idx + first.len_utf8())
        };
        let (closing_idx, closing) = chars
            .next()
            .ok_or(LexicalError::UnterminatedChar { pos: start_pos })?;
        if closing != '\'' {
            return Err(LexicalError::BadCharLiteral { pos: start_pos });
        }
        consumed_len = closing_idx + closing.len_utf8();
        let (consumed, rest) = self.rest.split_at(consumed_len);
        self.advance(consumed);
        let line = self.line.clone();
        self.rest = rest;
        Ok(Token::new(TokenKind::Char(value), start_pos, line))
    }

    pub fn next_token(&mut self) -> Result<Token, LexicalError> {
        self.skip_trivia();
        let start_pos = self.pos();
        if self.rest.is_empty() {
            return Ok(Token::new(TokenKind::Eof, start_pos, self.line.clone()));
        }
        if self.rest.starts_with('"') {
            return self.lex_string();
        }
        if self.rest.starts_with('\'') {
            return self.lex_char();
        }
        match lex_word(self.rest) {
            Ok((rest, kind)) => {
                let consumed = &self.rest[..self.rest.len() - rest.len()];
                self.advance(consumed);
                let line = self.line.clone();
                self.rest = rest;
                Ok(Token::new(kind, start_pos, line))
            }
            Err(_) => {
                let bad = self.rest.chars().next().unwrap();
                Err(LexicalError::UnknownChar {
                    ch: bad,
                    pos: start_pos,
                })
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexicalError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, LexicalError> {
    Lexer::new(src).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_a_tiny_function() {
        let got = kinds("function main():int32{return 0;}");
        assert_eq!(
            got,
            vec![
                TokenKind::KwFunction,
                TokenKind::Ident("main".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::TyInt32,
                TokenKind::LBrace,
                TokenKind::KwReturn,
                TokenKind::Int("0".into()),
                TokenKind::Semi,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_multi_char_operators_before_single() {
        assert_eq!(
            kinds("== != <= >= && ||"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_escapes() {
        let got = kinds(r#""a\nb""#);
        assert_eq!(got, vec![TokenKind::Str("a\nb".into()), TokenKind::Eof]);
    }

    #[test]
    fn skips_comments() {
        let got = kinds("# a comment\nvar");
        assert_eq!(got, vec![TokenKind::KwVar, TokenKind::Eof]);
    }

    #[test]
    fn float_requires_single_dot() {
        let got = kinds("1.5");
        assert_eq!(got, vec![TokenKind::Float("1.5".into()), TokenKind::Eof]);
    }

    #[test]
    fn rejects_unknown_char() {
        assert!(tokenize("var x : int32 = 1 ~ 2;").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }
}
