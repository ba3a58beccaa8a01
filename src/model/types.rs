// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph element types: nodes, relationships, oriented path triples and
//! the structural filters the engine hands to a graph model.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable node identity within a single engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Stable relationship identity within a single engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A graph node: identity, label set and property map.
///
/// Labels and properties are immutable from the engine's perspective;
/// mutation happens through the graph model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            labels: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_labels(id: NodeId, labels: Vec<String>) -> Self {
        Self {
            id,
            labels,
            properties: BTreeMap::new(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A graph relationship: identity, optional type string, endpoints and
/// properties. `start`/`end` always describe the stored (canonical)
/// orientation; traversal direction lives on [`PathTriple`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub rel_type: Option<String>,
    pub start: NodeId,
    pub end: NodeId,
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn new(id: RelId, rel_type: Option<String>, start: NodeId, end: NodeId) -> Self {
        Self {
            id,
            rel_type,
            start,
            end,
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// One oriented traversal of a single edge.
///
/// `reversed` records whether the triple is oriented against the stored
/// relationship: traversal direction is an interpretation, never a
/// mutation of the underlying edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTriple {
    pub start: Node,
    pub rel: Relationship,
    pub end: Node,
    pub reversed: bool,
}

impl PathTriple {
    /// Build a triple in the stored (OUTGOING) orientation.
    pub fn outgoing(start: Node, rel: Relationship, end: Node) -> Self {
        Self {
            start,
            rel,
            end,
            reversed: false,
        }
    }

    /// Swap endpoints and flip the `reversed` flag. `revert` is an
    /// involution: `t.revert().revert() == t`.
    pub fn revert(&self) -> Self {
        Self {
            start: self.end.clone(),
            rel: self.rel.clone(),
            end: self.start.clone(),
            reversed: !self.reversed,
        }
    }
}

/// A sequence of oriented triples, the value bound to a path variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub triples: Vec<PathTriple>,
}

impl Path {
    pub fn new(triples: Vec<PathTriple>) -> Self {
        Self { triples }
    }

    /// Number of edges in the path.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

/// Structural node predicate: required labels plus property equality.
///
/// An empty label list matches any labels; property predicates always
/// apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl NodeFilter {
    /// A filter that matches every node.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: Vec<String>) -> Self {
        Self {
            labels,
            properties: BTreeMap::new(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.labels.is_empty() && self.properties.is_empty()
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.labels.iter().all(|label| node.has_label(label))
            && self
                .properties
                .iter()
                .all(|(key, value)| node.properties.get(key) == Some(value))
    }
}

/// Structural relationship predicate: acceptable type strings plus
/// property equality.
///
/// An empty type list matches any type; a relationship whose type is
/// absent fails any non-empty type filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipFilter {
    pub types: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl RelationshipFilter {
    /// A filter that matches every relationship.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_types(types: Vec<String>) -> Self {
        Self {
            types,
            properties: BTreeMap::new(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.types.is_empty() && self.properties.is_empty()
    }

    pub fn matches(&self, rel: &Relationship) -> bool {
        let type_ok = if self.types.is_empty() {
            true
        } else {
            match &rel.rel_type {
                Some(t) => self.types.iter().any(|accepted| accepted == t),
                None => false,
            }
        };
        type_ok
            && self
                .properties
                .iter()
                .all(|(key, value)| rel.properties.get(key) == Some(value))
    }
}
