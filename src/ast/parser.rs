// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Recursive-descent parser over the token stream.
//!
//! Expressions use precedence climbing:
//! OR < XOR < AND < NOT < comparison < additive < multiplicative <
//! unary minus < property access.

use super::ast::{
    BinaryOp, CreateClause, Expression, Literal, MatchClause, NodePattern, OrderItem, PatternDirection,
    PatternPart, Query, RelPattern, ReturnClause, ReturnItem, UnaryOp,
};
use super::lexer::Token;
use thiserror::Error;

/// Malformed query text; no partial AST is returned.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("parsing error: {message}")]
pub struct ParsingError {
    pub message: String,
}

impl ParsingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn accept(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParsingError> {
        if self.accept(expected) {
            Ok(())
        } else {
            Err(ParsingError::new(format!(
                "expected {:?}, found {:?}",
                expected,
                self.peek()
            )))
        }
    }

    fn identifier(&mut self) -> Result<String, ParsingError> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            other => Err(ParsingError::new(format!(
                "expected identifier, found {:?}",
                other
            ))),
        }
    }

    pub(crate) fn expect_eof(&mut self) -> Result<(), ParsingError> {
        self.expect(&Token::Eof)
    }

    pub(crate) fn parse_query(&mut self) -> Result<Query, ParsingError> {
        let mut query = Query::default();

        while self.accept(&Token::Match) {
            query.matches.push(self.match_clause()?);
        }

        if self.accept(&Token::Create) {
            query.create = Some(CreateClause {
                patterns: self.pattern_list()?,
            });
        }

        if self.accept(&Token::Return) {
            query.return_clause = Some(self.return_clause()?);
        }

        if query.matches.is_empty() && query.create.is_none() && query.return_clause.is_none() {
            return Err(ParsingError::new(format!(
                "expected MATCH, CREATE or RETURN, found {:?}",
                self.peek()
            )));
        }
        Ok(query)
    }

    fn match_clause(&mut self) -> Result<MatchClause, ParsingError> {
        let patterns = self.pattern_list()?;
        let where_clause = if self.accept(&Token::Where) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(MatchClause {
            patterns,
            where_clause,
        })
    }

    fn pattern_list(&mut self) -> Result<Vec<PatternPart>, ParsingError> {
        let mut patterns = vec![self.pattern_part()?];
        while self.accept(&Token::Comma) {
            patterns.push(self.pattern_part()?);
        }
        Ok(patterns)
    }

    fn pattern_part(&mut self) -> Result<PatternPart, ParsingError> {
        let start = self.node_pattern()?;
        let mut hops = Vec::new();
        while matches!(self.peek(), Token::Dash | Token::ArrowLeft) {
            let rel = self.rel_pattern()?;
            let node = self.node_pattern()?;
            hops.push((rel, node));
        }
        Ok(PatternPart { start, hops })
    }

    fn node_pattern(&mut self) -> Result<NodePattern, ParsingError> {
        self.expect(&Token::LeftParen)?;
        let mut pattern = NodePattern::default();
        if let Token::Identifier(_) = self.peek() {
            pattern.variable = Some(self.identifier()?);
        }
        while self.accept(&Token::Colon) {
            pattern.labels.push(self.identifier()?);
        }
        if self.peek() == &Token::LeftBrace {
            pattern.properties = self.property_map()?;
        }
        self.expect(&Token::RightParen)?;
        Ok(pattern)
    }

    fn rel_pattern(&mut self) -> Result<RelPattern, ParsingError> {
        // `<-[r]-` | `-[r]->` | `-[r]-` | `<--` | `-->` | `--`
        if self.accept(&Token::ArrowLeft) {
            let (variable, types, properties) = self.rel_body()?;
            self.expect(&Token::Dash)?;
            return Ok(RelPattern {
                variable,
                types,
                properties,
                direction: PatternDirection::Incoming,
            });
        }
        self.expect(&Token::Dash)?;
        let (variable, types, properties) = self.rel_body()?;
        let direction = if self.accept(&Token::Arrow) {
            PatternDirection::Outgoing
        } else if self.accept(&Token::Dash) {
            PatternDirection::Undirected
        } else {
            return Err(ParsingError::new(format!(
                "expected -> or - after relationship pattern, found {:?}",
                self.peek()
            )));
        };
        Ok(RelPattern {
            variable,
            types,
            properties,
            direction,
        })
    }

    /// The optional `[var:TYPE|OTHER {props}]` body of a relationship
    /// pattern. A bare arrow has an empty body.
    #[allow(clippy::type_complexity)]
    fn rel_body(
        &mut self,
    ) -> Result<(Option<String>, Vec<String>, Vec<(String, Expression)>), ParsingError> {
        if !self.accept(&Token::LeftBracket) {
            return Ok((None, Vec::new(), Vec::new()));
        }
        let mut variable = None;
        let mut types = Vec::new();
        let mut properties = Vec::new();
        if let Token::Identifier(_) = self.peek() {
            variable = Some(self.identifier()?);
        }
        if self.accept(&Token::Colon) {
            types.push(self.identifier()?);
            while self.accept(&Token::Pipe) {
                // optional leading colon in the `|:T` alternative form
                self.accept(&Token::Colon);
                types.push(self.identifier()?);
            }
        }
        if self.peek() == &Token::LeftBrace {
            properties = self.property_map()?;
        }
        self.expect(&Token::RightBracket)?;
        Ok((variable, types, properties))
    }

    fn property_map(&mut self) -> Result<Vec<(String, Expression)>, ParsingError> {
        self.expect(&Token::LeftBrace)?;
        let mut entries = Vec::new();
        if self.peek() != &Token::RightBrace {
            loop {
                let key = self.identifier()?;
                self.expect(&Token::Colon)?;
                let value = self.expression()?;
                entries.push((key, value));
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RightBrace)?;
        Ok(entries)
    }

    fn return_clause(&mut self) -> Result<ReturnClause, ParsingError> {
        let distinct = self.accept(&Token::Distinct);
        let mut items = vec![self.return_item()?];
        while self.accept(&Token::Comma) {
            items.push(self.return_item()?);
        }

        let mut order_by = Vec::new();
        if self.accept(&Token::Order) {
            self.expect(&Token::By)?;
            loop {
                let expression = self.expression()?;
                let ascending = if self.accept(&Token::Desc) {
                    false
                } else {
                    self.accept(&Token::Asc);
                    true
                };
                order_by.push(OrderItem {
                    expression,
                    ascending,
                });
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }

        let skip = if self.accept(&Token::Skip) {
            Some(self.expression()?)
        } else {
            None
        };
        let limit = if self.accept(&Token::Limit) {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(ReturnClause {
            distinct,
            items,
            order_by,
            skip,
            limit,
        })
    }

    fn return_item(&mut self) -> Result<ReturnItem, ParsingError> {
        let expression = self.expression()?;
        let alias = if self.accept(&Token::As) {
            Some(self.identifier()?)
        } else {
            None
        };
        Ok(ReturnItem { expression, alias })
    }

    pub(crate) fn expression(&mut self) -> Result<Expression, ParsingError> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.xor_expression()?;
        while self.accept(&Token::Or) {
            let right = self.xor_expression()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn xor_expression(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.and_expression()?;
        while self.accept(&Token::Xor) {
            let right = self.and_expression()?;
            left = Expression::binary(left, BinaryOp::Xor, right);
        }
        Ok(left)
    }

    fn and_expression(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.not_expression()?;
        while self.accept(&Token::And) {
            let right = self.not_expression()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not_expression(&mut self) -> Result<Expression, ParsingError> {
        if self.accept(&Token::Not) {
            let operand = self.not_expression()?;
            Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
        } else {
            self.comparison()
        }
    }

    fn comparison_op(&mut self) -> Result<Option<BinaryOp>, ParsingError> {
        let op = match self.peek() {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::In => Some(BinaryOp::In),
            Token::Contains => Some(BinaryOp::Contains),
            Token::Starts => {
                self.advance();
                self.expect(&Token::With)?;
                return Ok(Some(BinaryOp::StartsWith));
            }
            Token::Ends => {
                self.advance();
                self.expect(&Token::With)?;
                return Ok(Some(BinaryOp::EndsWith));
            }
            _ => None,
        };
        if op.is_some() {
            self.advance();
        }
        Ok(op)
    }

    fn comparison(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.additive()?;
        while let Some(op) = self.comparison_op()? {
            let right = self.additive()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Dash => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expression, ParsingError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParsingError> {
        if self.accept(&Token::Dash) {
            let operand = self.unary()?;
            Ok(Expression::Unary {
                op: UnaryOp::Minus,
                operand: Box::new(operand),
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Expression, ParsingError> {
        let mut expr = self.primary()?;
        while self.peek() == &Token::Dot && matches!(self.peek_ahead(1), Token::Identifier(_)) {
            self.advance();
            let key = self.identifier()?;
            expr = Expression::property(expr, key);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expression, ParsingError> {
        match self.advance() {
            Token::Integer(i) => Ok(Expression::Literal(Literal::Integer(i))),
            Token::Float(f) => Ok(Expression::Literal(Literal::Float(f))),
            Token::StringLit(s) => Ok(Expression::Literal(Literal::String(s))),
            Token::True => Ok(Expression::Literal(Literal::Boolean(true))),
            Token::False => Ok(Expression::Literal(Literal::Boolean(false))),
            Token::Null => Ok(Expression::Literal(Literal::Null)),
            Token::Parameter(name) => Ok(Expression::Parameter(name)),
            Token::Identifier(name) => Ok(Expression::Variable(name)),
            Token::LeftParen => {
                let inner = self.expression()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RightBracket {
                    loop {
                        items.push(self.expression()?);
                        if !self.accept(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RightBracket)?;
                Ok(Expression::List(items))
            }
            Token::LeftBrace => {
                let mut entries = Vec::new();
                if self.peek() != &Token::RightBrace {
                    loop {
                        let key = self.identifier()?;
                        self.expect(&Token::Colon)?;
                        entries.push((key, self.expression()?));
                        if !self.accept(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RightBrace)?;
                Ok(Expression::Map(entries))
            }
            other => Err(ParsingError::new(format!(
                "unexpected token in expression: {:?}",
                other
            ))),
        }
    }
}
