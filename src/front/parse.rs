//! The parser

use std::fmt::Debug;

use derive_more::derive::Display;

use crate::common::intern;

use super::ast::*;
use super::lex::{LexError, Lexer, Token, TokenKind};

#[derive(Display)]
#[display("Parse error: {}", self.0)]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError(e.to_string())
    }
}

struct Parser<'input> {
    tokens: Vec<Token<'input>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token<'input>> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'input>, ParseError> {
        match self.bump() {
            Some(t) if t.kind == kind => Ok(t),
            Some(t) => Err(ParseError(format!("expected {what}, found {t}"))),
            None => Err(ParseError(format!("expected {what}, found end of input"))),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while self.peek_kind() != Some(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(ParseError("unterminated block".to_string()));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Print) => {
                self.bump();
                let e = self.parse_expr()?;
                Ok(Stmt::Print(e))
            }
            Some(TokenKind::Read) => {
                self.bump();
                let e = self.parse_expr()?;
                Ok(Stmt::Read(e))
            }
            Some(TokenKind::If) => {
                self.bump();
                let guard = self.parse_expr()?;
                let tt = self.parse_block()?;
                let ff = if self.peek_kind() == Some(TokenKind::LBrace) {
                    self.parse_block()?
                } else {
                    Vec::new()
                };
                Ok(Stmt::If { guard, tt, ff })
            }
            Some(TokenKind::Id) => {
                let name_tok = self.bump().unwrap();
                self.expect(TokenKind::Assign, "':='")?;
                let e = self.parse_expr()?;
                Ok(Stmt::Assign(intern(name_tok.text), e))
            }
            Some(_) => Err(ParseError(format!("unexpected token {}", self.peek().unwrap()))),
            None => Err(ParseError("unexpected end of input".to_string())),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_additive()?;
        if self.peek_kind() == Some(TokenKind::Lt) {
            self.bump();
            let rhs = self.parse_additive()?;
            return Ok(Expr::BOp { op: BOp::Lt, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BOp::Add,
                Some(TokenKind::Minus) => BOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_term()?;
            lhs = Expr::BOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Mul) => BOp::Mul,
                Some(TokenKind::Div) => BOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::BOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == Some(TokenKind::Minus) {
            self.bump();
            let e = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(e)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(t) if t.kind == TokenKind::Num => {
                let n: i64 = t
                    .text
                    .parse()
                    .map_err(|_| ParseError(format!("bad integer literal {}", t.text)))?;
                Ok(Expr::Const(n))
            }
            Some(t) if t.kind == TokenKind::Id => Ok(Expr::Var(intern(t.text))),
            Some(t) => Err(ParseError(format!("expected an expression, found {t}"))),
            None => Err(ParseError("expected an expression, found end of input".to_string())),
        }
    }
}

pub fn parse(input: &str) -> Result<Program, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(t) = lexer.next()? {
        tokens.push(t);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let stmts = parser.parse_program()?;
    Ok(Program { stmts })
}
