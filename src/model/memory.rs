// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory reference graph model.
//!
//! Backs the test suite and embedders that need no persistence. Each
//! enumeration takes a snapshot under a read lock, so iteration within
//! one logical operation is consistent; there is no cross-operation
//! snapshot isolation.

use crate::model::graph::{
    CreatedElements, Direction, EndpointRef, GraphModel, GraphModelError, IndexSpec, NodeSpec,
    NodeStream, RelSpec, TripleStream,
};
use crate::model::procedure::Procedure;
use crate::model::types::{Node, NodeId, PathTriple, RelId, Relationship};
use crate::model::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<NodeId, Node>,
    rels: BTreeMap<RelId, Relationship>,
    outgoing: HashMap<NodeId, Vec<RelId>>,
    incoming: HashMap<NodeId, Vec<RelId>>,
    next_node_id: u64,
    next_rel_id: u64,
    indexes: Vec<IndexSpec>,
}

impl GraphData {
    fn triple(&self, rel: &Relationship) -> Result<PathTriple, GraphModelError> {
        let start = self
            .nodes
            .get(&rel.start)
            .ok_or_else(|| GraphModelError::new(format!("dangling start node {}", rel.start)))?;
        let end = self
            .nodes
            .get(&rel.end)
            .ok_or_else(|| GraphModelError::new(format!("dangling end node {}", rel.end)))?;
        Ok(PathTriple::outgoing(
            start.clone(),
            rel.clone(),
            end.clone(),
        ))
    }
}

/// Thread-safe in-memory graph.
#[derive(Default)]
pub struct MemoryGraph {
    data: RwLock<GraphData>,
    procedures: RwLock<HashMap<(String, String), Arc<dyn Procedure>>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node directly, returning its assigned id.
    pub fn add_node(
        &self,
        labels: &[&str],
        properties: impl IntoIterator<Item = (String, Value)>,
    ) -> NodeId {
        let mut data = self.data.write();
        data.next_node_id += 1;
        let id = NodeId(data.next_node_id);
        let node = Node {
            id,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: properties.into_iter().collect(),
        };
        data.nodes.insert(id, node);
        id
    }

    /// Insert a relationship directly, returning its assigned id.
    pub fn add_relationship(
        &self,
        rel_type: Option<&str>,
        start: NodeId,
        end: NodeId,
        properties: impl IntoIterator<Item = (String, Value)>,
    ) -> RelId {
        let mut data = self.data.write();
        data.next_rel_id += 1;
        let id = RelId(data.next_rel_id);
        let rel = Relationship {
            id,
            rel_type: rel_type.map(|t| t.to_string()),
            start,
            end,
            properties: properties.into_iter().collect(),
        };
        data.rels.insert(id, rel);
        data.outgoing.entry(start).or_default().push(id);
        data.incoming.entry(end).or_default().push(id);
        id
    }

    /// Register a procedure under its declared namespace and name.
    pub fn register_procedure(&self, procedure: Arc<dyn Procedure>) {
        let signature = procedure.signature();
        let key = (signature.namespace.clone(), signature.name.clone());
        self.procedures.write().insert(key, procedure);
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.data.read().rels.len()
    }
}

impl GraphModel for MemoryGraph {
    fn nodes(&self) -> NodeStream {
        let snapshot: Vec<Node> = self.data.read().nodes.values().cloned().collect();
        Box::new(snapshot.into_iter().map(Ok))
    }

    fn relationships(&self) -> TripleStream {
        let data = self.data.read();
        let snapshot: Vec<Result<PathTriple, GraphModelError>> =
            data.rels.values().map(|rel| data.triple(rel)).collect();
        Box::new(snapshot.into_iter())
    }

    fn expand(&self, node: NodeId, direction: Direction) -> TripleStream {
        let data = self.data.read();
        let mut triples: Vec<Result<PathTriple, GraphModelError>> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            for rel_id in data.outgoing.get(&node).into_iter().flatten() {
                if let Some(rel) = data.rels.get(rel_id) {
                    triples.push(data.triple(rel));
                }
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            for rel_id in data.incoming.get(&node).into_iter().flatten() {
                if let Some(rel) = data.rels.get(rel_id) {
                    triples.push(data.triple(rel).map(|t| t.revert()));
                }
            }
        }
        Box::new(triples.into_iter())
    }

    fn create_elements(
        &self,
        nodes: Vec<NodeSpec>,
        rels: Vec<RelSpec>,
        on_created: &mut dyn FnMut(&CreatedElements),
    ) -> Result<(), GraphModelError> {
        let mut data = self.data.write();
        let mut created = CreatedElements::default();

        for spec in nodes {
            data.next_node_id += 1;
            let id = NodeId(data.next_node_id);
            let node = Node {
                id,
                labels: spec.labels,
                properties: spec.properties,
            };
            data.nodes.insert(id, node.clone());
            created.nodes.push(node);
        }

        for spec in rels {
            let resolve = |endpoint: EndpointRef| -> Result<NodeId, GraphModelError> {
                match endpoint {
                    EndpointRef::Existing(id) => {
                        if data.nodes.contains_key(&id) {
                            Ok(id)
                        } else {
                            Err(GraphModelError::new(format!("unknown node {}", id)))
                        }
                    }
                    EndpointRef::Created(index) => created
                        .nodes
                        .get(index)
                        .map(|n| n.id)
                        .ok_or_else(|| {
                            GraphModelError::new(format!("created-node index {} out of range", index))
                        }),
                }
            };
            let start = resolve(spec.start)?;
            let end = resolve(spec.end)?;
            data.next_rel_id += 1;
            let id = RelId(data.next_rel_id);
            let rel = Relationship {
                id,
                rel_type: spec.rel_type,
                start,
                end,
                properties: spec.properties,
            };
            data.rels.insert(id, rel.clone());
            data.outgoing.entry(start).or_default().push(id);
            data.incoming.entry(end).or_default().push(id);
            created.relationships.push(rel);
        }

        drop(data);
        on_created(&created);
        Ok(())
    }

    fn create_index(&self, label: &str, property_keys: &[String]) -> Result<(), GraphModelError> {
        let spec = IndexSpec {
            label: label.to_string(),
            property_keys: property_keys.to_vec(),
        };
        let mut data = self.data.write();
        if !data.indexes.contains(&spec) {
            data.indexes.push(spec);
        }
        Ok(())
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        self.data.read().indexes.clone()
    }

    fn procedure(&self, namespace: &str, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{NodeFilter, RelationshipFilter};

    fn sample() -> MemoryGraph {
        let graph = MemoryGraph::new();
        let a = graph.add_node(&["Person"], [("name".to_string(), Value::from("a"))]);
        let b = graph.add_node(&["Person"], [("name".to_string(), Value::from("b"))]);
        graph.add_relationship(Some("KNOWS"), a, b, []);
        graph
    }

    #[test]
    fn relationships_are_canonical_outgoing() {
        let graph = sample();
        let triples: Vec<_> = graph
            .relationships()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(triples.len(), 1);
        assert!(!triples[0].reversed);
        assert_eq!(triples[0].start.id, triples[0].rel.start);
    }

    #[test]
    fn both_direction_doubles_the_stream() {
        let graph = sample();
        let both: Vec<_> = graph
            .paths(
                &NodeFilter::any(),
                &RelationshipFilter::any(),
                &NodeFilter::any(),
                Direction::Both,
            )
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(both.len(), 2 * graph.relationship_count());
        assert!(both.iter().any(|t| t.reversed));
        assert!(both.iter().any(|t| !t.reversed));
    }

    #[test]
    fn expand_incoming_points_at_the_given_node() {
        let graph = sample();
        let b = NodeId(2);
        let triples: Vec<_> = graph
            .expand(b, Direction::Incoming)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].start.id, b);
        assert!(triples[0].reversed);
    }

    #[test]
    fn create_elements_resolves_created_endpoints() {
        let graph = MemoryGraph::new();
        let mut seen = CreatedElements::default();
        graph
            .create_elements(
                vec![NodeSpec::default(), NodeSpec::default()],
                vec![RelSpec {
                    rel_type: Some("LINKS".into()),
                    start: EndpointRef::Created(0),
                    end: EndpointRef::Created(1),
                    properties: BTreeMap::new(),
                }],
                &mut |created| seen = created.clone(),
            )
            .unwrap();
        assert_eq!(seen.nodes.len(), 2);
        assert_eq!(seen.relationships.len(), 1);
        assert_eq!(seen.relationships[0].start, seen.nodes[0].id);
        assert_eq!(seen.relationships[0].end, seen.nodes[1].id);
    }
}
