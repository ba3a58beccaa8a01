// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Host-registered procedures with typed inputs and tabular output.

use crate::model::graph::GraphModelError;
use crate::model::value::{CypherType, Value};
use serde::{Deserialize, Serialize};

/// Declared shape of a procedure: namespaced name plus typed inputs and
/// outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureSignature {
    pub namespace: String,
    pub name: String,
    pub inputs: Vec<(String, CypherType)>,
    pub outputs: Vec<(String, CypherType)>,
}

impl ProcedureSignature {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, ty: CypherType) -> Self {
        self.inputs.push((name.into(), ty));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, ty: CypherType) -> Self {
        self.outputs.push((name.into(), ty));
        self
    }
}

/// A callable registered on the graph model. Each produced row must have
/// arity equal to the declared outputs.
pub trait Procedure: Send + Sync {
    fn signature(&self) -> &ProcedureSignature;

    fn call(&self, args: &[Value]) -> Result<Vec<Vec<Value>>, GraphModelError>;
}
