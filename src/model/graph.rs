// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The host-facing graph model contract.
//!
//! The engine never owns graph data. A host supplies an implementation
//! of [`GraphModel`] that enumerates nodes, relationships and oriented
//! path triples, creates elements, and registers advisory indexes.
//! Every sequence-returning method yields a lazy, single-pass iterator
//! that must not borrow the model: implementations either snapshot or
//! hand out owning cursors.

use crate::model::types::{Node, NodeFilter, NodeId, PathTriple, RelationshipFilter};
use crate::model::value::Value;
use crate::model::Procedure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Traversal direction for path enumeration and expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "outgoing"),
            Direction::Incoming => write!(f, "incoming"),
            Direction::Both => write!(f, "both"),
        }
    }
}

/// Error propagated unchanged from the host model; the engine never
/// retries.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("graph model error: {message}")]
pub struct GraphModelError {
    pub message: String,
}

impl GraphModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type NodeStream = Box<dyn Iterator<Item = Result<Node, GraphModelError>>>;
pub type TripleStream = Box<dyn Iterator<Item = Result<PathTriple, GraphModelError>>>;

/// A node to be created by [`GraphModel::create_elements`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

/// Which node a new relationship endpoint refers to: an existing node,
/// or one of the nodes created in the same `create_elements` call
/// (by index into its `nodes` argument).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EndpointRef {
    Existing(NodeId),
    Created(usize),
}

/// A relationship to be created by [`GraphModel::create_elements`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelSpec {
    pub rel_type: Option<String>,
    pub start: EndpointRef,
    pub end: EndpointRef,
    pub properties: BTreeMap<String, Value>,
}

/// The freshly assigned identities handed back through the `on_created`
/// callback, in the order of the corresponding specs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatedElements {
    pub nodes: Vec<Node>,
    pub relationships: Vec<crate::model::types::Relationship>,
}

/// An advisory index registration. The engine core never consults
/// indexes itself; an optimizer pass may.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub label: String,
    pub property_keys: Vec<String>,
}

/// The abstract graph a query runs against.
///
/// Only the canonical enumerations, expansion and mutation are required;
/// filtered views have default implementations derived from them. The
/// model must yield consistent iteration within a single logical
/// operation; cross-operation snapshot isolation is the host's call.
pub trait GraphModel: Send + Sync {
    /// All nodes, lazily.
    fn nodes(&self) -> NodeStream;

    /// All relationships as triples canonicalized to the OUTGOING
    /// direction.
    fn relationships(&self) -> TripleStream;

    /// Triples whose `start.id` equals `node` under the chosen
    /// direction: OUTGOING yields canonical triples, INCOMING yields
    /// reverted ones, BOTH yields both orientations.
    fn expand(&self, node: NodeId, direction: Direction) -> TripleStream;

    /// Transactional bulk create. `on_created` receives the freshly
    /// assigned identities for plan continuation; atomicity of the call
    /// is the host's responsibility.
    fn create_elements(
        &self,
        nodes: Vec<NodeSpec>,
        rels: Vec<RelSpec>,
        on_created: &mut dyn FnMut(&CreatedElements),
    ) -> Result<(), GraphModelError>;

    /// Register an advisory index.
    fn create_index(&self, label: &str, property_keys: &[String]) -> Result<(), GraphModelError>;

    /// Advisory indexes registered so far.
    fn indexes(&self) -> Vec<IndexSpec>;

    /// Look up a host-registered procedure.
    fn procedure(&self, namespace: &str, name: &str) -> Option<Arc<dyn Procedure>>;

    /// Filtered node view.
    fn nodes_filtered(&self, filter: &NodeFilter) -> NodeStream {
        let filter = filter.clone();
        Box::new(self.nodes().filter(move |item| match item {
            Ok(node) => filter.matches(node),
            Err(_) => true,
        }))
    }

    /// Oriented, filtered triple enumeration. Orientation is applied
    /// first, then all three filters; the returned stream is the
    /// intersection.
    fn paths(
        &self,
        start: &NodeFilter,
        rel: &RelationshipFilter,
        end: &NodeFilter,
        direction: Direction,
    ) -> TripleStream {
        let oriented: TripleStream = match direction {
            Direction::Outgoing => self.relationships(),
            Direction::Incoming => Box::new(
                self.relationships()
                    .map(|item| item.map(|triple| triple.revert())),
            ),
            Direction::Both => Box::new(self.relationships().flat_map(|item| match item {
                Ok(triple) => {
                    let reverted = triple.revert();
                    vec![Ok(triple), Ok(reverted)].into_iter()
                }
                Err(e) => vec![Err(e)].into_iter(),
            })),
        };
        let start = start.clone();
        let rel = rel.clone();
        let end = end.clone();
        Box::new(oriented.filter(move |item| match item {
            Ok(triple) => {
                start.matches(&triple.start) && rel.matches(&triple.rel) && end.matches(&triple.end)
            }
            Err(_) => true,
        }))
    }

    /// Expansion with relationship and far-end filters applied after
    /// orientation.
    fn expand_filtered(
        &self,
        node: NodeId,
        direction: Direction,
        rel: &RelationshipFilter,
        end: &NodeFilter,
    ) -> TripleStream {
        let rel = rel.clone();
        let end = end.clone();
        Box::new(self.expand(node, direction).filter(move |item| match item {
            Ok(triple) => rel.matches(&triple.rel) && end.matches(&triple.end),
            Err(_) => true,
        }))
    }
}
