// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed values exchanged between the engine, the row streams and the
//! host graph model.
//!
//! Equality is structural. Ordering is total: primitives order
//! naturally, lists order lexicographically, and `Null` sorts greater
//! than any non-null value so it surfaces last under ascending sorts.

use crate::model::types::{Node, Path, Relationship};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Closed set of type tags a [`Value`] can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CypherType {
    Any,
    Boolean,
    Integer,
    Float,
    String,
    Node,
    Relationship,
    Path,
    List(Box<CypherType>),
    Map,
    Null,
}

impl fmt::Display for CypherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CypherType::Any => write!(f, "Any"),
            CypherType::Boolean => write!(f, "Boolean"),
            CypherType::Integer => write!(f, "Integer"),
            CypherType::Float => write!(f, "Float"),
            CypherType::String => write!(f, "String"),
            CypherType::Node => write!(f, "Node"),
            CypherType::Relationship => write!(f, "Relationship"),
            CypherType::Path => write!(f, "Path"),
            CypherType::List(inner) => write!(f, "List<{}>", inner),
            CypherType::Map => write!(f, "Map"),
            CypherType::Null => write!(f, "Null"),
        }
    }
}

impl CypherType {
    /// The most specific type covering both operands.
    pub fn unify(&self, other: &CypherType) -> CypherType {
        if self == other {
            self.clone()
        } else {
            CypherType::Any
        }
    }
}

/// Property and column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Node(Node),
    Relationship(Relationship),
    Path(Path),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type tag of this value.
    pub fn cypher_type(&self) -> CypherType {
        match self {
            Value::Null => CypherType::Null,
            Value::Boolean(_) => CypherType::Boolean,
            Value::Integer(_) => CypherType::Integer,
            Value::Float(_) => CypherType::Float,
            Value::String(_) => CypherType::String,
            Value::List(items) => {
                let mut inner: Option<CypherType> = None;
                for item in items {
                    let t = item.cypher_type();
                    inner = Some(match inner {
                        None => t,
                        Some(prev) => prev.unify(&t),
                    });
                }
                CypherType::List(Box::new(inner.unwrap_or(CypherType::Any)))
            }
            Value::Map(_) => CypherType::Map,
            Value::Node(_) => CypherType::Node,
            Value::Relationship(_) => CypherType::Relationship,
            Value::Path(_) => CypherType::Path,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::List(_) => 3,
            Value::Map(_) => 4,
            Value::Node(_) => 5,
            Value::Relationship(_) => 6,
            Value::Path(_) => 7,
            Value::Null => 8,
        }
    }

    /// Total ordering used by sorts. `Null` is greater than any non-null
    /// value; numerics compare across the integer/float variants; values
    /// of unrelated types order by a fixed type rank so the comparison
    /// stays total and stable.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.total_cmp(y) {
                        Ordering::Equal => continue,
                        non_eq => return non_eq,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.cmp(kb) {
                        Ordering::Equal => {}
                        non_eq => return non_eq,
                    }
                    match va.total_cmp(vb) {
                        Ordering::Equal => {}
                        non_eq => return non_eq,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Node(a), Value::Node(b)) => a.id.cmp(&b.id),
            (Value::Relationship(a), Value::Relationship(b)) => a.id.cmp(&b.id),
            (Value::Path(a), Value::Path(b)) => {
                let ids_a: Vec<_> = a.triples.iter().map(|t| t.rel.id).collect();
                let ids_b: Vec<_> = b.triples.iter().map(|t| t.rel.id).collect();
                ids_a.cmp(&ids_b)
            }
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }

    /// Convert a `serde_json::Value` parameter into an engine value.
    /// Whole numbers become `Integer`, everything else maps structurally.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

// Structural equality is intentional; NaN-carrying floats are accepted
// as hash keys the same way the row hasher below treats them.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                if f.is_nan() {
                    "NaN".hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::List(items) => {
                5u8.hash(state);
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Map(map) => {
                6u8.hash(state);
                map.len().hash(state);
                for (key, value) in map {
                    key.hash(state);
                    value.hash(state);
                }
            }
            Value::Node(node) => {
                7u8.hash(state);
                node.id.hash(state);
                node.labels.hash(state);
                for (key, value) in &node.properties {
                    key.hash(state);
                    value.hash(state);
                }
            }
            Value::Relationship(rel) => {
                8u8.hash(state);
                rel.id.hash(state);
                rel.start.hash(state);
                rel.end.hash(state);
                rel.rel_type.hash(state);
                for (key, value) in &rel.properties {
                    key.hash(state);
                    value.hash(state);
                }
            }
            Value::Path(path) => {
                9u8.hash(state);
                path.triples.len().hash(state);
                for triple in &path.triples {
                    triple.rel.id.hash(state);
                    triple.reversed.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Node(node) => {
                write!(f, "({}", node.id)?;
                for label in &node.labels {
                    write!(f, ":{}", label)?;
                }
                write!(f, ")")
            }
            Value::Relationship(rel) => match &rel.rel_type {
                Some(t) => write!(f, "[{}:{}]", rel.id, t),
                None => write!(f, "[{}]", rel.id),
            },
            Value::Path(path) => {
                write!(f, "<")?;
                for (i, triple) in path.triples.iter().enumerate() {
                    if i == 0 {
                        write!(f, "{}", Value::Node(triple.start.clone()))?;
                    }
                    let arrow = if triple.reversed { "<-" } else { "-" };
                    let tail = if triple.reversed { "-" } else { "->" };
                    write!(
                        f,
                        "{}{}{}{}",
                        arrow,
                        Value::Relationship(triple.rel.clone()),
                        tail,
                        Value::Node(triple.end.clone())
                    )?;
                }
                write!(f, ">")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Relationship> for Value {
    fn from(rel: Relationship) -> Self {
        Value::Relationship(rel)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_greater_than_everything() {
        assert_eq!(Value::Null.total_cmp(&Value::Integer(1)), Ordering::Greater);
        assert_eq!(
            Value::String("z".into()).total_cmp(&Value::Null),
            Ordering::Less
        );
        assert_eq!(Value::Null.total_cmp(&Value::Null), Ordering::Equal);
    }

    #[test]
    fn numerics_compare_across_variants() {
        assert_eq!(
            Value::Integer(2).total_cmp(&Value::Float(2.5)),
            Ordering::Less
        );
        assert_eq!(
            Value::Float(3.0).total_cmp(&Value::Integer(3)),
            Ordering::Equal
        );
    }

    #[test]
    fn lists_compare_lexicographically() {
        let a = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::List(vec![Value::Integer(1), Value::Integer(3)]);
        let c = Value::List(vec![Value::Integer(1)]);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(c.total_cmp(&a), Ordering::Less);
    }

    #[test]
    fn list_type_unifies_element_types() {
        let homogeneous = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(
            homogeneous.cypher_type(),
            CypherType::List(Box::new(CypherType::Integer))
        );

        let mixed = Value::List(vec![Value::Integer(1), Value::String("x".into())]);
        assert_eq!(
            mixed.cypher_type(),
            CypherType::List(Box::new(CypherType::Any))
        );
    }

    #[test]
    fn path_values_order_by_relationship_sequence() {
        use crate::model::types::{NodeId, Path, PathTriple, RelId, Relationship};

        let node = |id: u64| crate::model::types::Node::new(NodeId(id));
        let triple = |rel_id: u64| {
            PathTriple::outgoing(
                node(1),
                Relationship::new(RelId(rel_id), Some("LINK".into()), NodeId(1), NodeId(2)),
                node(2),
            )
        };
        let short = Value::Path(Path::new(vec![triple(1)]));
        let long = Value::Path(Path::new(vec![triple(1), triple(2)]));
        assert_eq!(short.total_cmp(&long), Ordering::Less);
        assert_eq!(short.cypher_type(), CypherType::Path);
        assert!(short.to_string().starts_with('<'));
    }

    #[test]
    fn json_round_trip_keeps_integers() {
        let json: serde_json::Value = serde_json::json!({"n": 3, "x": 1.5, "s": "hi"});
        let value = Value::from_json(&json);
        match value {
            Value::Map(map) => {
                assert_eq!(map.get("n"), Some(&Value::Integer(3)));
                assert_eq!(map.get("x"), Some(&Value::Float(1.5)));
                assert_eq!(map.get("s"), Some(&Value::String("hi".into())));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }
}
