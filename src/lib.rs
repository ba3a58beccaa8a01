// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! cypherlite - an embeddable execution engine for a Cypher-family
//! property-graph query language.
//!
//! A host supplies a graph model (an adapter that enumerates nodes,
//! relationships and paths), hands a query string plus a parameter bag
//! to a [`Runner`], and receives a lazily evaluated tabular result with
//! a declared schema.
//!
//! # Pipeline
//!
//! parse -> logical plan -> physical plan -> optimize -> execute
//! against a lazy row-stream algebra.
//!
//! # Usage
//!
//! ```
//! use cypherlite::{MemoryGraph, Runner, Value};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let graph = MemoryGraph::new();
//! let a = graph.add_node(&["Person"], [("name".to_string(), Value::from("ada"))]);
//! let b = graph.add_node(&["Person"], [("name".to_string(), Value::from("bob"))]);
//! graph.add_relationship(Some("KNOWS"), a, b, []);
//!
//! let runner = Runner::new(Arc::new(graph));
//! let result = runner
//!     .run("MATCH (p:Person)-[r:KNOWS]->(q) RETURN p.name AS name", BTreeMap::new())
//!     .unwrap();
//! let names: Vec<_> = result.records().collect::<Result<Vec<_>, _>>().unwrap();
//! assert_eq!(names.len(), 1);
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod frame;
pub mod model;
pub mod plan;
mod runner;

pub use config::{OptimizationLevel, RunnerConfig};
pub use error::EngineError;
pub use frame::{DataFrame, DataFrameOps, Row, RowStream, Schema};
pub use model::{
    CreatedElements, CypherType, Direction, EndpointRef, GraphModel, GraphModelError, IndexSpec,
    MemoryGraph, Node, NodeFilter, NodeId, NodeSpec, NodeStream, Path, PathTriple, Procedure,
    ProcedureSignature, RelId, RelSpec, Relationship, RelationshipFilter, TripleStream, Value,
};
pub use runner::{Compiled, QueryResult, Runner};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
