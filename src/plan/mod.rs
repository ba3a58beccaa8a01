// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning: logical trees, physical trees, optimizer rewrites
//! and the shared plan/execution contexts.

pub mod logical;
pub mod optimizer;
pub mod physical;
pub mod pretty;

use crate::eval::{Evaluator, ParamEnv};
use crate::frame::DataFrameOps;
use crate::model::GraphModel;
use std::sync::Arc;
use thiserror::Error;

pub use logical::{plan_statement, LogicalNode, LogicalPlan, PlannerContext};
pub use optimizer::PhysicalOptimizer;
pub use physical::{plan_physical, PhysicalNode, PhysicalPlan};
pub use pretty::{pretty, TreeRender};

/// Unknown variable or type mismatch detected at plan time.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("semantic error: {message}")]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unknown_variable(name: &str) -> Self {
        Self::new(format!("unknown variable `{}`", name))
    }
}

/// An AST construct the planner cannot lower.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("plan error: {message}")]
pub struct PlanError {
    pub message: String,
}

impl PlanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything a physical node needs to materialize rows. Shared
/// read-only by every operator of one executing query.
pub struct ExecContext {
    pub model: Arc<dyn GraphModel>,
    pub evaluator: Evaluator,
    pub ops: DataFrameOps,
    pub params: Arc<ParamEnv>,
}

impl ExecContext {
    pub fn new(model: Arc<dyn GraphModel>, params: ParamEnv) -> Self {
        Self {
            model,
            evaluator: Evaluator::new(),
            ops: DataFrameOps::new(),
            params: Arc::new(params),
        }
    }
}
