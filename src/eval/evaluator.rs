// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The expression evaluator.
//!
//! Evaluation is total except for arithmetic over incompatible types
//! and property access on non-entities. Boolean operators follow
//! three-valued logic; null propagates through arithmetic and
//! comparisons instead of raising.

use super::{EvalScope, EvaluationError};
use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::model::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Stateless; one instance is shared by every plan of a runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn eval(&self, expr: &Expression, scope: &EvalScope) -> Result<Value, EvaluationError> {
        match expr {
            Expression::Literal(literal) => Ok(literal.to_value()),
            Expression::Parameter(name) => scope
                .param(name)
                .cloned()
                .ok_or_else(|| EvaluationError::new(expr, format!("unknown parameter `{}`", name))),
            Expression::Variable(name) => scope
                .binding(name)
                .cloned()
                .ok_or_else(|| EvaluationError::new(expr, format!("unbound variable `{}`", name))),
            Expression::Property { base, key } => match self.eval(base, scope)? {
                Value::Node(node) => Ok(node.properties.get(key).cloned().unwrap_or(Value::Null)),
                Value::Relationship(rel) => {
                    Ok(rel.properties.get(key).cloned().unwrap_or(Value::Null))
                }
                Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(EvaluationError::new(
                    expr,
                    format!("property access on {}", other.cypher_type()),
                )),
            },
            Expression::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                self.unary(expr, *op, value)
            }
            Expression::Binary { left, op, right } => self.binary(expr, left, *op, right, scope),
            Expression::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                Ok(Value::List(values))
            }
            Expression::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn unary(
        &self,
        expr: &Expression,
        op: UnaryOp,
        value: Value,
    ) -> Result<Value, EvaluationError> {
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOp::Not, other) => Err(EvaluationError::new(
                expr,
                format!("NOT applied to {}", other.cypher_type()),
            )),
            (UnaryOp::Minus, Value::Integer(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| EvaluationError::new(expr, "integer overflow")),
            (UnaryOp::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOp::Minus, other) => Err(EvaluationError::new(
                expr,
                format!("negation of {}", other.cypher_type()),
            )),
        }
    }

    fn binary(
        &self,
        expr: &Expression,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        scope: &EvalScope,
    ) -> Result<Value, EvaluationError> {
        // AND/OR short-circuit on their deciding operand.
        if op == BinaryOp::And {
            let lhs = self.eval(left, scope)?;
            if lhs == Value::Boolean(false) {
                return Ok(Value::Boolean(false));
            }
            let rhs = self.eval(right, scope)?;
            return self.logic3(expr, op, lhs, rhs);
        }
        if op == BinaryOp::Or {
            let lhs = self.eval(left, scope)?;
            if lhs == Value::Boolean(true) {
                return Ok(Value::Boolean(true));
            }
            let rhs = self.eval(right, scope)?;
            return self.logic3(expr, op, lhs, rhs);
        }

        let lhs = self.eval(left, scope)?;
        let rhs = self.eval(right, scope)?;
        match op {
            BinaryOp::Add
            | BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo => self.arithmetic(expr, op, lhs, rhs),
            BinaryOp::Eq => Ok(bool3(equal3(&lhs, &rhs))),
            BinaryOp::Ne => Ok(bool3(equal3(&lhs, &rhs).map(|b| !b))),
            BinaryOp::Lt => Ok(bool3(ordered3(&lhs, &rhs).map(|o| o == Ordering::Less))),
            BinaryOp::Le => Ok(bool3(ordered3(&lhs, &rhs).map(|o| o != Ordering::Greater))),
            BinaryOp::Gt => Ok(bool3(ordered3(&lhs, &rhs).map(|o| o == Ordering::Greater))),
            BinaryOp::Ge => Ok(bool3(ordered3(&lhs, &rhs).map(|o| o != Ordering::Less))),
            BinaryOp::Xor => self.logic3(expr, op, lhs, rhs),
            BinaryOp::StartsWith => Ok(string_pred(&lhs, &rhs, |s, p| s.starts_with(p))),
            BinaryOp::EndsWith => Ok(string_pred(&lhs, &rhs, |s, p| s.ends_with(p))),
            BinaryOp::Contains => Ok(string_pred(&lhs, &rhs, |s, p| s.contains(p))),
            BinaryOp::In => self.contains_in(expr, lhs, rhs),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn logic3(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EvaluationError> {
        let as_bool3 = |value: &Value| -> Result<Option<bool>, EvaluationError> {
            match value {
                Value::Null => Ok(None),
                Value::Boolean(b) => Ok(Some(*b)),
                other => Err(EvaluationError::new(
                    expr,
                    format!("boolean operator applied to {}", other.cypher_type()),
                )),
            }
        };
        let a = as_bool3(&lhs)?;
        let b = as_bool3(&rhs)?;
        let result = match op {
            BinaryOp::And => match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            BinaryOp::Or => match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            BinaryOp::Xor => match (a, b) {
                (Some(x), Some(y)) => Some(x ^ y),
                _ => None,
            },
            _ => unreachable!("not a boolean operator"),
        };
        Ok(bool3(result))
    }

    fn arithmetic(
        &self,
        expr: &Expression,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EvaluationError> {
        if lhs.is_null() || rhs.is_null() {
            return Ok(Value::Null);
        }
        // String and list concatenation ride on `+`.
        if op == BinaryOp::Add {
            if let (Value::String(a), Value::String(b)) = (&lhs, &rhs) {
                return Ok(Value::String(format!("{}{}", a, b)));
            }
            if let (Value::List(a), Value::List(b)) = (&lhs, &rhs) {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                return Ok(Value::List(items));
            }
        }
        match (&lhs, &rhs) {
            (Value::Integer(a), Value::Integer(b)) => self.int_arithmetic(expr, op, *a, *b),
            (Value::Integer(a), Value::Float(b)) => Ok(float_arithmetic(op, *a as f64, *b)),
            (Value::Float(a), Value::Integer(b)) => Ok(float_arithmetic(op, *a, *b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(float_arithmetic(op, *a, *b)),
            _ => Err(EvaluationError::new(
                expr,
                format!(
                    "arithmetic over {} and {}",
                    lhs.cypher_type(),
                    rhs.cypher_type()
                ),
            )),
        }
    }

    fn int_arithmetic(
        &self,
        expr: &Expression,
        op: BinaryOp,
        a: i64,
        b: i64,
    ) -> Result<Value, EvaluationError> {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide => {
                if b == 0 {
                    return Err(EvaluationError::new(expr, "division by zero"));
                }
                a.checked_div(b)
            }
            BinaryOp::Modulo => {
                if b == 0 {
                    return Err(EvaluationError::new(expr, "division by zero"));
                }
                a.checked_rem(b)
            }
            _ => unreachable!("not arithmetic"),
        };
        result
            .map(Value::Integer)
            .ok_or_else(|| EvaluationError::new(expr, "integer overflow"))
    }

    fn contains_in(
        &self,
        expr: &Expression,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EvaluationError> {
        let items = match rhs {
            Value::Null => return Ok(Value::Null),
            Value::List(items) => items,
            other => {
                return Err(EvaluationError::new(
                    expr,
                    format!("IN requires a list, got {}", other.cypher_type()),
                ))
            }
        };
        let mut saw_null = lhs.is_null();
        for item in &items {
            match equal3(&lhs, item) {
                Some(true) => return Ok(Value::Boolean(true)),
                Some(false) => {}
                None => saw_null = true,
            }
        }
        Ok(if saw_null {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => f64::NAN,
    })
}

fn bool3(value: Option<bool>) -> Value {
    match value {
        Some(b) => Value::Boolean(b),
        None => Value::Null,
    }
}

/// Three-valued equality: null operands compare to null; numerics
/// compare across variants; values of different non-numeric types are
/// simply unequal.
fn equal3(a: &Value, b: &Value) -> Option<bool> {
    if a.is_null() || b.is_null() {
        return None;
    }
    match (a, b) {
        (Value::Integer(x), Value::Float(y)) => Some((*x as f64) == *y),
        (Value::Float(x), Value::Integer(y)) => Some(*x == (*y as f64)),
        _ => Some(a == b),
    }
}

/// Three-valued ordering: defined within a type family (numeric,
/// string, boolean, list); null or cross-family comparisons are null.
fn ordered3(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let x = a.as_float()?;
            let y = b.as_float()?;
            x.partial_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::List(_), Value::List(_)) => Some(a.total_cmp(b)),
        _ => None,
    }
}

fn string_pred(lhs: &Value, rhs: &Value, pred: impl Fn(&str, &str) -> bool) -> Value {
    match (lhs, rhs) {
        (Value::String(s), Value::String(p)) => Value::Boolean(pred(s, p)),
        // Cypher string predicates yield null on non-string operands.
        _ => Value::Null,
    }
}
