// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine-wide error type.
//!
//! Static errors (parsing, semantic, schema, plan) surface synchronously
//! from `compile`/`run`; runtime errors (evaluation, schema at row time,
//! graph model) surface from the consuming iterator. Nothing is
//! silently swallowed; null-valued operations follow Cypher null
//! propagation instead of raising.

use crate::ast::ParsingError;
use crate::eval::EvaluationError;
use crate::frame::SchemaError;
use crate::model::GraphModelError;
use crate::plan::{PlanError, SemanticError};
use thiserror::Error;

/// Union of the per-stage error types.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    GraphModel(#[from] GraphModelError),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::Io(error.to_string())
    }
}
