// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for expressions and statements
//!
//! ```text
//! or      := and ('or' and)*
//! and     := not ('and' not)*
//! not     := 'not' not | compare
//! compare := sum (cmp sum)?
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('**' unary)?
//! primary := number | bool | ident | ident '(' args ')' | '(' or ')'
//! ```

use super::lexer::{tokenize, Token};
use super::{AssignOp, BinaryOp, Expr, Statement, UnaryOp};
use crate::error::{ModelError, ModelResult};

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidEquation {
            source_text: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ModelResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.peek())))
        }
    }

    fn or_expr(&mut self) -> ModelResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> ModelResult<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> ModelResult<Expr> {
        if self.eat(&Token::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.compare()
    }

    fn compare(&mut self) -> ModelResult<Expr> {
        let lhs = self.sum()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.sum()?;
        Ok(Expr::binary(op, lhs, rhs))
    }

    fn sum(&mut self) -> ModelResult<Expr> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.product()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn product(&mut self) -> ModelResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> ModelResult<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::neg(operand));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> ModelResult<Expr> {
        let base = self.primary()?;
        if self.eat(&Token::Power) {
            let exponent = self.unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> ModelResult<Expr> {
        match self.advance() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.or_expr()?);
                            if self.eat(&Token::Comma) {
                                continue;
                            }
                            self.expect(&Token::RParen)?;
                            break;
                        }
                    }
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(self.error(format!("unexpected token {:?}", other))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn statement(&mut self) -> ModelResult<Statement> {
        let target = match self.advance() {
            Some(Token::Ident(name)) => name,
            other => return Err(self.error(format!("expected assignment target, found {:?}", other))),
        };
        let op = match self.advance() {
            Some(Token::Assign) => AssignOp::Set,
            Some(Token::PlusAssign) => AssignOp::Add,
            Some(Token::MinusAssign) => AssignOp::Sub,
            Some(Token::StarAssign) => AssignOp::Mul,
            Some(Token::SlashAssign) => AssignOp::Div,
            other => return Err(self.error(format!("expected assignment operator, found {:?}", other))),
        };
        let value = self.or_expr()?;
        Ok(Statement { target, op, value })
    }
}

/// Parse a single expression
pub fn parse_expr(source: &str) -> ModelResult<Expr> {
    let tokens = tokenize(source)?;
    if tokens.iter().any(|t| *t == Token::Separator) {
        return Err(ModelError::InvalidEquation {
            source_text: source.to_string(),
            reason: "expected a single expression".to_string(),
        });
    }
    let mut parser = Parser::new(source, tokens);
    let expr = parser.or_expr()?;
    if parser.peek().is_some() {
        return Err(parser.error(format!("unexpected trailing token {:?}", parser.peek())));
    }
    Ok(expr)
}

/// Parse a block of `target op value` statements separated by `;` or newlines
pub fn parse_statements(source: &str) -> ModelResult<Vec<Statement>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens);
    let mut statements = Vec::new();
    loop {
        while parser.eat(&Token::Separator) {}
        if parser.peek().is_none() {
            break;
        }
        statements.push(parser.statement()?);
        match parser.peek() {
            None | Some(Token::Separator) => {}
            Some(other) => {
                return Err(parser.error(format!("unexpected token {:?} after statement", other)))
            }
        }
    }
    Ok(statements)
}
