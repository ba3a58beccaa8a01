//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use cypherlite::{MemoryGraph, NodeId, RelId, Runner, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Two people connected by one KNOWS relationship.
pub struct PairFixture {
    pub graph: Arc<MemoryGraph>,
    pub runner: Runner,
    pub a: NodeId,
    pub b: NodeId,
    pub r: RelId,
}

pub fn pair_fixture() -> PairFixture {
    let graph = Arc::new(MemoryGraph::new());
    let a = graph.add_node(&["Person"], [("name".to_string(), Value::from("a"))]);
    let b = graph.add_node(&["Person"], [("name".to_string(), Value::from("b"))]);
    let r = graph.add_relationship(Some("KNOWS"), a, b, []);
    let runner = Runner::new(Arc::clone(&graph) as Arc<dyn cypherlite::GraphModel>);
    PairFixture {
        graph,
        runner,
        a,
        b,
        r,
    }
}

/// A three-node chain: A -> B -> C.
pub struct ChainFixture {
    pub graph: Arc<MemoryGraph>,
    pub runner: Runner,
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub r1: RelId,
    pub r2: RelId,
}

pub fn chain_fixture() -> ChainFixture {
    let graph = Arc::new(MemoryGraph::new());
    let a = graph.add_node(&["Node"], [("name".to_string(), Value::from("a"))]);
    let b = graph.add_node(&["Node"], [("name".to_string(), Value::from("b"))]);
    let c = graph.add_node(&["Node"], [("name".to_string(), Value::from("c"))]);
    let r1 = graph.add_relationship(Some("LINK"), a, b, []);
    let r2 = graph.add_relationship(Some("LINK"), b, c, []);
    let runner = Runner::new(Arc::clone(&graph) as Arc<dyn cypherlite::GraphModel>);
    ChainFixture {
        graph,
        runner,
        a,
        b,
        c,
        r1,
        r2,
    }
}

pub fn no_params() -> BTreeMap<String, Value> {
    BTreeMap::new()
}

/// Collect all rows, panicking on stream errors.
pub fn all_rows(result: &cypherlite::QueryResult) -> Vec<Vec<Value>> {
    result
        .rows()
        .collect::<Result<Vec<_>, _>>()
        .expect("query rows")
}
