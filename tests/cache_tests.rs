//! Result caching: materialize once, replay forever, never consult the
//! graph model again.

mod testutils;

use cypherlite::{
    CreatedElements, Direction, GraphModel, GraphModelError, IndexSpec, MemoryGraph, NodeId,
    NodeSpec, NodeStream, Procedure, RelSpec, Runner, TripleStream, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use testutils::no_params;

/// Wraps a [`MemoryGraph`] and counts every enumeration the engine
/// issues.
struct CountingModel {
    inner: MemoryGraph,
    reads: AtomicUsize,
}

impl CountingModel {
    fn new(inner: MemoryGraph) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl GraphModel for CountingModel {
    fn nodes(&self) -> NodeStream {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.nodes()
    }

    fn relationships(&self) -> TripleStream {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.relationships()
    }

    fn expand(&self, node: NodeId, direction: Direction) -> TripleStream {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.expand(node, direction)
    }

    fn create_elements(
        &self,
        nodes: Vec<NodeSpec>,
        rels: Vec<RelSpec>,
        on_created: &mut dyn FnMut(&CreatedElements),
    ) -> Result<(), GraphModelError> {
        self.inner.create_elements(nodes, rels, on_created)
    }

    fn create_index(&self, label: &str, property_keys: &[String]) -> Result<(), GraphModelError> {
        self.inner.create_index(label, property_keys)
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        self.inner.indexes()
    }

    fn procedure(&self, namespace: &str, name: &str) -> Option<Arc<dyn Procedure>> {
        self.inner.procedure(namespace, name)
    }
}

fn counting_fixture() -> (Runner, Arc<CountingModel>) {
    let graph = MemoryGraph::new();
    graph.add_node(&["Person"], [("name".to_string(), Value::from("a"))]);
    graph.add_node(&["Person"], [("name".to_string(), Value::from("b"))]);
    let model = Arc::new(CountingModel::new(graph));
    let runner = Runner::new(Arc::clone(&model) as Arc<dyn GraphModel>);
    (runner, model)
}

#[test]
fn cache_stops_model_consultation() {
    let (runner, model) = counting_fixture();
    let mut result = runner
        .run("MATCH (n:Person) RETURN n.name AS name", no_params())
        .unwrap();

    // Compilation and execution are lazy: nothing read yet.
    assert_eq!(model.reads(), 0);

    result.cache().unwrap();
    let reads_after_cache = model.reads();
    assert!(reads_after_cache > 0);

    let first: Vec<_> = result.rows().collect::<Result<Vec<_>, _>>().unwrap();
    let second: Vec<_> = result.rows().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(model.reads(), reads_after_cache);
}

#[test]
fn cache_is_idempotent() {
    let (runner, model) = counting_fixture();
    let mut result = runner
        .run("MATCH (n:Person) RETURN n", no_params())
        .unwrap();
    result.cache().unwrap();
    let reads = model.reads();
    result.cache().unwrap();
    assert_eq!(model.reads(), reads);
}

#[test]
fn uncached_results_reconsult_the_model() {
    let (runner, model) = counting_fixture();
    let result = runner
        .run("MATCH (n:Person) RETURN n", no_params())
        .unwrap();
    let _ = result.rows().collect::<Result<Vec<_>, _>>().unwrap();
    let after_first = model.reads();
    let _ = result.rows().collect::<Result<Vec<_>, _>>().unwrap();
    assert!(model.reads() > after_first);
}
