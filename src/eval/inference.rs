// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Static result-type inference for expressions.
//!
//! Pure: inference never touches rows, only a column-name to type
//! environment. Anything it cannot pin down is `Any` so schema
//! propagation stays total.

use super::evaluator::Evaluator;
use crate::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::model::CypherType;
use std::collections::BTreeMap;

/// Column-name to type environment.
pub type SchemaTypes = BTreeMap<String, CypherType>;

impl Evaluator {
    /// Infer the static type of `expr` against a schema environment.
    pub fn type_of(&self, expr: &Expression, schema: &SchemaTypes) -> CypherType {
        match expr {
            Expression::Literal(Literal::Null) => CypherType::Null,
            Expression::Literal(Literal::Boolean(_)) => CypherType::Boolean,
            Expression::Literal(Literal::Integer(_)) => CypherType::Integer,
            Expression::Literal(Literal::Float(_)) => CypherType::Float,
            Expression::Literal(Literal::String(_)) => CypherType::String,
            Expression::Parameter(_) => CypherType::Any,
            Expression::Variable(name) => {
                schema.get(name).cloned().unwrap_or(CypherType::Any)
            }
            // Property types are not declared anywhere the engine can see.
            Expression::Property { .. } => CypherType::Any,
            Expression::Unary {
                op: UnaryOp::Not, ..
            } => CypherType::Boolean,
            Expression::Unary {
                op: UnaryOp::Minus,
                operand,
            } => match self.type_of(operand, schema) {
                t @ (CypherType::Integer | CypherType::Float) => t,
                CypherType::Null => CypherType::Null,
                _ => CypherType::Any,
            },
            Expression::Binary { left, op, right } => match op {
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
                | BinaryOp::StartsWith
                | BinaryOp::EndsWith
                | BinaryOp::Contains
                | BinaryOp::In => CypherType::Boolean,
                BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo => {
                    let lt = self.type_of(left, schema);
                    let rt = self.type_of(right, schema);
                    match (op, &lt, &rt) {
                        (BinaryOp::Add, CypherType::String, CypherType::String) => {
                            CypherType::String
                        }
                        (BinaryOp::Add, CypherType::List(_), CypherType::List(_)) => {
                            CypherType::List(Box::new(CypherType::Any))
                        }
                        (_, CypherType::Integer, CypherType::Integer) => CypherType::Integer,
                        (_, CypherType::Float, CypherType::Integer)
                        | (_, CypherType::Integer, CypherType::Float)
                        | (_, CypherType::Float, CypherType::Float) => CypherType::Float,
                        _ => CypherType::Any,
                    }
                }
            },
            Expression::List(items) => {
                let mut inner: Option<CypherType> = None;
                for item in items {
                    let t = self.type_of(item, schema);
                    inner = Some(match inner {
                        None => t,
                        Some(prev) => prev.unify(&t),
                    });
                }
                CypherType::List(Box::new(inner.unwrap_or(CypherType::Any)))
            }
            Expression::Map(_) => CypherType::Map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_of(pairs: &[(&str, CypherType)]) -> SchemaTypes {
        pairs
            .iter()
            .map(|(name, t)| (name.to_string(), t.clone()))
            .collect()
    }

    #[test]
    fn variables_take_their_schema_type() {
        let schema = schema_of(&[("n", CypherType::Node)]);
        let evaluator = Evaluator::new();
        assert_eq!(
            evaluator.type_of(&Expression::variable("n"), &schema),
            CypherType::Node
        );
        assert_eq!(
            evaluator.type_of(&Expression::variable("missing"), &schema),
            CypherType::Any
        );
    }

    #[test]
    fn arithmetic_types_fold() {
        let schema = SchemaTypes::new();
        let evaluator = Evaluator::new();
        let int_sum = Expression::binary(
            Expression::Literal(Literal::Integer(1)),
            BinaryOp::Add,
            Expression::Literal(Literal::Integer(2)),
        );
        assert_eq!(evaluator.type_of(&int_sum, &schema), CypherType::Integer);

        let mixed = Expression::binary(
            Expression::Literal(Literal::Integer(1)),
            BinaryOp::Multiply,
            Expression::Literal(Literal::Float(2.0)),
        );
        assert_eq!(evaluator.type_of(&mixed, &schema), CypherType::Float);
    }

    #[test]
    fn comparisons_are_boolean() {
        let schema = SchemaTypes::new();
        let expr = Expression::binary(
            Expression::variable("a"),
            BinaryOp::Lt,
            Expression::variable("b"),
        );
        assert_eq!(Evaluator::new().type_of(&expr, &schema), CypherType::Boolean);
    }

    #[test]
    fn list_literal_unifies_inner_type() {
        let schema = SchemaTypes::new();
        let list = Expression::List(vec![
            Expression::Literal(Literal::Integer(1)),
            Expression::Literal(Literal::Integer(2)),
        ]);
        assert_eq!(
            Evaluator::new().type_of(&list, &schema),
            CypherType::List(Box::new(CypherType::Integer))
        );
    }
}
