// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lazy, schema-bearing row streams.
//!
//! A [`DataFrame`] pairs an eagerly computed schema with a producer
//! closure that yields a fresh, single-pass row iterator on every
//! invocation. Operators compose by wrapping producers; nothing
//! materializes until a consumer drains an iterator (or asks for a
//! cached frame).

mod ops;

use crate::error::EngineError;
use crate::model::{CypherType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use ops::DataFrameOps;

/// Reference to a column not present in the current frame's schema.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("schema error: {message}")]
pub struct SchemaError {
    pub message: String,
}

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unknown_column(name: &str) -> Self {
        Self::new(format!("unknown column `{}`", name))
    }
}

/// One output row. Arity always equals the owning frame's schema arity.
pub type Row = Vec<Value>;

/// A fresh, single-pass iterator over rows. Runtime errors surface as
/// `Err` items; partially produced rows are not rolled back.
pub type RowStream = Box<dyn Iterator<Item = Result<Row, EngineError>>>;

/// Producer invoked once per `records()` call.
pub type RowProducer = Arc<dyn Fn() -> RowStream + Send + Sync>;

/// Ordered `(name, type)` pairs with unique names. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Arc<Vec<(String, CypherType)>>,
}

impl Schema {
    pub fn new(columns: Vec<(String, CypherType)>) -> Result<Self, SchemaError> {
        for (i, (name, _)) in columns.iter().enumerate() {
            if columns[..i].iter().any(|(other, _)| other == name) {
                return Err(SchemaError::new(format!("duplicate column `{}`", name)));
            }
        }
        Ok(Self {
            columns: Arc::new(columns),
        })
    }

    pub fn empty() -> Self {
        Self {
            columns: Arc::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[(String, CypherType)] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<&CypherType> {
        self.index_of(name).map(|i| &self.columns[i].1)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|(n, _)| n.clone()).collect()
    }

    /// The column-name to type environment used by static inference.
    pub fn type_map(&self) -> BTreeMap<String, CypherType> {
        self.columns
            .iter()
            .map(|(n, t)| (n.clone(), t.clone()))
            .collect()
    }
}

/// A lazy row stream with a declared schema.
#[derive(Clone)]
pub struct DataFrame {
    schema: Schema,
    producer: RowProducer,
}

impl fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFrame")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl DataFrame {
    pub fn new(schema: Schema, producer: RowProducer) -> Self {
        Self { schema, producer }
    }

    /// A frame over an already materialized row set. Its producer
    /// replays the buffer, so repeated `records()` calls are equal and
    /// touch no upstream source.
    pub fn from_rows(schema: Schema, rows: Vec<Row>) -> Self {
        let rows = Arc::new(rows);
        Self::new(
            schema,
            Arc::new(move || {
                let rows = Arc::clone(&rows);
                Box::new((0..rows.len()).map(move |i| Ok(rows[i].clone())))
            }),
        )
    }

    /// A frame with the given schema and no rows.
    pub fn empty(schema: Schema) -> Self {
        Self::from_rows(schema, Vec::new())
    }

    /// The frame of exactly one zero-width row, the identity for
    /// projection without input.
    pub fn unit() -> Self {
        Self::from_rows(Schema::empty(), vec![Vec::new()])
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A fresh single-pass iterator. Calling this twice on a non-cached
    /// frame re-invokes the producer; the returned iterators are
    /// independent.
    pub fn records(&self) -> RowStream {
        (self.producer)()
    }

    /// Drain into a vector, stopping at the first error.
    pub fn collect(&self) -> Result<Vec<Row>, EngineError> {
        self.records().collect()
    }

    /// Materialize once into a replaying frame.
    pub fn cached(&self) -> Result<DataFrame, EngineError> {
        Ok(DataFrame::from_rows(self.schema.clone(), self.collect()?))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Build a test frame of integer/string columns.
    pub fn frame(columns: &[(&str, CypherType)], rows: Vec<Vec<Value>>) -> DataFrame {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
        )
        .unwrap();
        DataFrame::from_rows(schema, rows)
    }
}
