//! Creation scenarios plus the procedure and advisory-index contracts.

mod testutils;

use cypherlite::{
    CypherType, GraphModel, GraphModelError, MemoryGraph, Procedure, ProcedureSignature, Runner,
    Value,
};
use std::sync::Arc;
use testutils::{all_rows, no_params, pair_fixture};

fn empty_runner() -> (Runner, Arc<MemoryGraph>) {
    let graph = Arc::new(MemoryGraph::new());
    let runner = Runner::new(Arc::clone(&graph) as Arc<dyn GraphModel>);
    (runner, graph)
}

#[test]
fn standalone_create_returns_created_elements() {
    let (runner, graph) = empty_runner();
    let result = runner
        .run(
            "CREATE (a:Person {name: 'x'})-[r:KNOWS]->(b:Person {name: 'y'}) RETURN a, r, b",
            no_params(),
        )
        .unwrap();

    let rows = all_rows(&result);
    assert_eq!(rows.len(), 1);
    match (&rows[0][0], &rows[0][1], &rows[0][2]) {
        (Value::Node(a), Value::Relationship(r), Value::Node(b)) => {
            assert_eq!(a.property("name"), Some(&Value::from("x")));
            assert_eq!(b.property("name"), Some(&Value::from("y")));
            assert_eq!(r.start, a.id);
            assert_eq!(r.end, b.id);
            assert_eq!(r.rel_type.as_deref(), Some("KNOWS"));
        }
        other => panic!("unexpected row shape: {:?}", other),
    }
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.relationship_count(), 1);
}

#[test]
fn create_without_return_still_creates() {
    let (runner, graph) = empty_runner();
    runner
        .run("CREATE (a:Person {name: 'solo'})", no_params())
        .unwrap();
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn match_create_uses_bound_endpoints_per_row() {
    let fx = pair_fixture();
    let result = fx
        .runner
        .run(
            "MATCH (p:Person) CREATE (p)-[r:TAGGED]->(t:Tag {name: 'new'}) RETURN p, r, t",
            no_params(),
        )
        .unwrap();
    let rows = all_rows(&result);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        match (&row[0], &row[1], &row[2]) {
            (Value::Node(p), Value::Relationship(r), Value::Node(t)) => {
                assert_eq!(r.start, p.id);
                assert_eq!(r.end, t.id);
                assert!(t.has_label("Tag"));
            }
            other => panic!("unexpected row shape: {:?}", other),
        }
    }
    // One tag per matched person.
    assert_eq!(fx.graph.node_count(), 4);
    assert_eq!(fx.graph.relationship_count(), 3);
}

#[test]
fn re_iterating_a_create_result_does_not_create_again() {
    let (runner, graph) = empty_runner();
    let result = runner
        .run("CREATE (a:Person {name: 'once'}) RETURN a", no_params())
        .unwrap();
    assert_eq!(graph.node_count(), 1);
    let _ = all_rows(&result);
    let _ = all_rows(&result);
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn create_with_incoming_arrow_reverses_endpoints() {
    let (runner, graph) = empty_runner();
    let result = runner
        .run("CREATE (a:L)<-[r:REL]-(b:L) RETURN r", no_params())
        .unwrap();
    let rows = all_rows(&result);
    match &rows[0][0] {
        Value::Relationship(rel) => {
            // b is the second created node and the relationship starts
            // there.
            assert_eq!(rel.start.0, 2);
            assert_eq!(rel.end.0, 1);
        }
        other => panic!("expected relationship, got {:?}", other),
    }
    assert_eq!(graph.relationship_count(), 1);
}

#[test]
fn create_properties_may_reference_matched_values() {
    let fx = pair_fixture();
    let result = fx
        .runner
        .run(
            "MATCH (p:Person) CREATE (c:Copy {name: p.name}) RETURN c",
            no_params(),
        )
        .unwrap();
    let rows = all_rows(&result);
    assert_eq!(rows.len(), 2);
    let mut names: Vec<Value> = rows
        .iter()
        .map(|row| match &row[0] {
            Value::Node(node) => node.property("name").cloned().unwrap(),
            other => panic!("expected node, got {:?}", other),
        })
        .collect();
    names.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
}

struct EchoProcedure {
    signature: ProcedureSignature,
}

impl EchoProcedure {
    fn new() -> Self {
        Self {
            signature: ProcedureSignature::new("db", "echo")
                .with_input("value", CypherType::Any)
                .with_output("value", CypherType::Any)
                .with_output("doubled", CypherType::Integer),
        }
    }
}

impl Procedure for EchoProcedure {
    fn signature(&self) -> &ProcedureSignature {
        &self.signature
    }

    fn call(&self, args: &[Value]) -> Result<Vec<Vec<Value>>, GraphModelError> {
        let value = args
            .first()
            .cloned()
            .ok_or_else(|| GraphModelError::new("missing argument"))?;
        let doubled = match &value {
            Value::Integer(i) => Value::Integer(i * 2),
            _ => Value::Null,
        };
        Ok(vec![vec![value, doubled]])
    }
}

#[test]
fn procedure_registry_contract() {
    let (_, graph) = empty_runner();
    graph.register_procedure(Arc::new(EchoProcedure::new()));

    assert!(graph.procedure("db", "missing").is_none());
    let procedure = graph.procedure("db", "echo").expect("registered");
    assert_eq!(procedure.signature().inputs.len(), 1);

    let rows = procedure.call(&[Value::Integer(21)]).unwrap();
    assert_eq!(rows.len(), 1);
    // Row arity equals the declared outputs arity.
    assert_eq!(rows[0].len(), procedure.signature().outputs.len());
    assert_eq!(rows[0][1], Value::Integer(42));
}

#[test]
fn advisory_indexes_are_registered_not_consulted() {
    let (_, graph) = empty_runner();
    graph
        .create_index("Person", &["name".to_string()])
        .unwrap();
    graph
        .create_index("Person", &["name".to_string()])
        .unwrap();
    let indexes = graph.indexes();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].label, "Person");
    assert_eq!(indexes[0].property_keys, vec!["name".to_string()]);
}
