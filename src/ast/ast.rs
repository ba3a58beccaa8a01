// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract syntax tree for the supported Cypher-family subset.

use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Top-level parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Query(Query),
}

/// A single read/create query:
/// `MATCH* [WHERE] [CREATE] [RETURN [DISTINCT] … [ORDER BY …] [SKIP n] [LIMIT n]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub matches: Vec<MatchClause>,
    pub create: Option<CreateClause>,
    pub return_clause: Option<ReturnClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchClause {
    pub patterns: Vec<PatternPart>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClause {
    pub patterns: Vec<PatternPart>,
}

/// One comma-separated path pattern: a start node plus zero or more
/// relationship/node hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPart {
    pub start: NodePattern,
    pub hops: Vec<(RelPattern, NodePattern)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub types: Vec<String>,
    pub properties: Vec<(String, Expression)>,
    pub direction: PatternDirection,
}

/// Arrow orientation as written in the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternDirection {
    Outgoing,
    Incoming,
    Undirected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnClause {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: Expression,
    pub ascending: bool,
}

/// Expression tree evaluated per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Literal),
    Parameter(String),
    Variable(String),
    Property {
        base: Box<Expression>,
        key: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    List(Vec<Expression>),
    Map(Vec<(String, Expression)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    StartsWith,
    EndsWith,
    Contains,
    In,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::StartsWith => "STARTS WITH",
            BinaryOp::EndsWith => "ENDS WITH",
            BinaryOp::Contains => "CONTAINS",
            BinaryOp::In => "IN",
        }
    }
}

impl Expression {
    pub fn literal(literal: Literal) -> Self {
        Expression::Literal(literal)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn property(base: Expression, key: impl Into<String>) -> Self {
        Expression::Property {
            base: Box::new(base),
            key: key.into(),
        }
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Collect the variable names this expression reads.
    pub fn variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expression::Variable(name) => {
                out.insert(name.clone());
            }
            Expression::Property { base, .. } => base.variables(out),
            Expression::Unary { operand, .. } => operand.variables(out),
            Expression::Binary { left, right, .. } => {
                left.variables(out);
                right.variables(out);
            }
            Expression::List(items) => {
                for item in items {
                    item.variables(out);
                }
            }
            Expression::Map(entries) => {
                for (_, value) in entries {
                    value.variables(out);
                }
            }
            Expression::Literal(_) | Expression::Parameter(_) => {}
        }
    }

    /// True when the expression reads neither variables nor parameters.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::Parameter(_) | Expression::Variable(_) => false,
            Expression::Property { .. } => false,
            Expression::Unary { operand, .. } => operand.is_constant(),
            Expression::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Expression::List(items) => items.iter().all(|i| i.is_constant()),
            Expression::Map(entries) => entries.iter().all(|(_, v)| v.is_constant()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Literal::Null) => write!(f, "null"),
            Expression::Literal(Literal::Boolean(b)) => write!(f, "{}", b),
            Expression::Literal(Literal::Integer(i)) => write!(f, "{}", i),
            Expression::Literal(Literal::Float(x)) => write!(f, "{}", x),
            Expression::Literal(Literal::String(s)) => write!(f, "'{}'", s),
            Expression::Parameter(name) => write!(f, "${}", name),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Property { base, key } => write!(f, "{}.{}", base, key),
            Expression::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "NOT {}", operand),
            Expression::Unary {
                op: UnaryOp::Minus,
                operand,
            } => write!(f, "-{}", operand),
            Expression::Binary { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expression::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
