//! Pattern-matching scenarios: multi-hop chains, relationship
//! uniqueness, undirected traversal counting and self loops.

mod testutils;

use cypherlite::{Direction, GraphModel, NodeFilter, RelationshipFilter, Value};
use testutils::{all_rows, chain_fixture, no_params};

#[test]
fn multi_hop_chain_never_reuses_a_relationship() {
    let fx = chain_fixture();
    let result = fx
        .runner
        .run(
            "MATCH (a)-[r]-(b)-[p]-(c) RETURN a, r, b, p, c",
            no_params(),
        )
        .unwrap();

    let rows = all_rows(&result);
    assert!(!rows.is_empty());
    for row in &rows {
        let (r, p) = match (&row[1], &row[3]) {
            (Value::Relationship(r), Value::Relationship(p)) => (r, p),
            other => panic!("unexpected row shape: {:?}", other),
        };
        assert_ne!(r.id, p.id, "a relationship bound to both r and p");
    }
    // A -> B -> C walked from either end: two orientations of the
    // unique two-hop walk.
    assert_eq!(rows.len(), 2);
}

#[test]
fn undirected_enumeration_doubles_the_relationship_count() {
    let fx = chain_fixture();
    let both = fx
        .graph
        .paths(
            &NodeFilter::any(),
            &RelationshipFilter::any(),
            &NodeFilter::any(),
            Direction::Both,
        )
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(both.len(), 2 * fx.graph.relationship_count());

    let result = fx
        .runner
        .run("MATCH (x)-[r]-(y) RETURN x, r, y", no_params())
        .unwrap();
    assert_eq!(all_rows(&result).len(), 2 * fx.graph.relationship_count());
}

#[test]
fn comma_separated_patterns_join_on_shared_variables() {
    let fx = chain_fixture();
    let result = fx
        .runner
        .run(
            "MATCH (a)-[r:LINK]->(b), (b)-[p:LINK]->(c) RETURN a, b, c",
            no_params(),
        )
        .unwrap();
    let rows = all_rows(&result);
    assert_eq!(rows.len(), 1);
    match (&rows[0][0], &rows[0][1], &rows[0][2]) {
        (Value::Node(a), Value::Node(b), Value::Node(c)) => {
            assert_eq!(a.id, fx.a);
            assert_eq!(b.id, fx.b);
            assert_eq!(c.id, fx.c);
        }
        other => panic!("unexpected row shape: {:?}", other),
    }
}

#[test]
fn disjoint_patterns_produce_a_cartesian_product() {
    let fx = chain_fixture();
    let result = fx
        .runner
        .run("MATCH (a:Node), (b:Node) RETURN a, b", no_params())
        .unwrap();
    assert_eq!(all_rows(&result).len(), 9);
}

#[test]
fn self_loop_pattern_matches_only_loops() {
    let fx = chain_fixture();
    // No loops in the chain graph.
    let result = fx
        .runner
        .run("MATCH (a)-[r]->(a) RETURN a, r", no_params())
        .unwrap();
    assert!(all_rows(&result).is_empty());

    // Add a loop and match it.
    let looped = fx.graph.add_node(&["Node"], [("name".to_string(), Value::from("loop"))]);
    fx.graph.add_relationship(Some("SELF"), looped, looped, []);
    let result = fx
        .runner
        .run("MATCH (a)-[r:SELF]->(a) RETURN a, r", no_params())
        .unwrap();
    let rows = all_rows(&result);
    assert_eq!(rows.len(), 1);
    assert_eq!(result.schema().names(), vec!["a".to_string(), "r".to_string()]);
    match &rows[0][0] {
        Value::Node(node) => assert_eq!(node.id, looped),
        other => panic!("expected node, got {:?}", other),
    }
}

#[test]
fn rel_type_filter_rejects_other_types() {
    let fx = chain_fixture();
    let result = fx
        .runner
        .run("MATCH (a)-[r:MISSING]->(b) RETURN r", no_params())
        .unwrap();
    assert!(all_rows(&result).is_empty());
}

#[test]
fn label_filter_restricts_scans() {
    let fx = chain_fixture();
    fx.graph.add_node(&["Other"], []);
    let result = fx
        .runner
        .run("MATCH (n:Node) RETURN n", no_params())
        .unwrap();
    assert_eq!(all_rows(&result).len(), 3);
    let result = fx
        .runner
        .run("MATCH (n:Other) RETURN n", no_params())
        .unwrap();
    assert_eq!(all_rows(&result).len(), 1);
}

#[test]
fn property_map_in_pattern_filters_nodes() {
    let fx = chain_fixture();
    let result = fx
        .runner
        .run("MATCH (n:Node {name: 'b'}) RETURN n", no_params())
        .unwrap();
    let rows = all_rows(&result);
    assert_eq!(rows.len(), 1);
    match &rows[0][0] {
        Value::Node(node) => assert_eq!(node.id, fx.b),
        other => panic!("expected node, got {:?}", other),
    }
}
