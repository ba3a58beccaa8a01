// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value model and the host graph contract.

mod graph;
mod memory;
mod procedure;
mod types;
mod value;

pub use graph::{
    CreatedElements, Direction, EndpointRef, GraphModel, GraphModelError, IndexSpec, NodeSpec,
    NodeStream, RelSpec, TripleStream,
};
pub use memory::MemoryGraph;
pub use procedure::{Procedure, ProcedureSignature};
pub use types::{Node, NodeFilter, NodeId, Path, PathTriple, RelId, Relationship, RelationshipFilter};
pub use value::{CypherType, Value};
