// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression evaluation against row bindings and parameter bags.

mod evaluator;
mod inference;

use crate::model::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub use evaluator::Evaluator;
pub use inference::SchemaTypes;

/// Runtime type error, division by zero, or property access on a
/// non-entity.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot evaluate `{expr}`: {reason}")]
pub struct EvaluationError {
    pub expr: String,
    pub reason: String,
}

impl EvaluationError {
    pub fn new(expr: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parameter bindings for one query invocation. References resolve
/// against the residual (parse-extracted) parameters first, then the
/// invocation parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamEnv {
    pub residual: BTreeMap<String, Value>,
    pub invoked: BTreeMap<String, Value>,
}

impl ParamEnv {
    pub fn new(residual: BTreeMap<String, Value>, invoked: BTreeMap<String, Value>) -> Self {
        Self { residual, invoked }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.residual.get(name).or_else(|| self.invoked.get(name))
    }
}

/// Variable bindings visible to one expression evaluation: the current
/// row's columns plus the parameter environment.
#[derive(Debug, Clone, Copy)]
pub struct EvalScope<'a> {
    columns: &'a [String],
    row: &'a [Value],
    params: &'a ParamEnv,
}

impl<'a> EvalScope<'a> {
    pub fn new(columns: &'a [String], row: &'a [Value], params: &'a ParamEnv) -> Self {
        Self {
            columns,
            row,
            params,
        }
    }

    /// A scope with parameters but no row bindings.
    pub fn params_only(params: &'a ParamEnv) -> Self {
        Self {
            columns: &[],
            row: &[],
            params,
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|column| column == name)
            .and_then(|index| self.row.get(index))
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.lookup(name)
    }
}
