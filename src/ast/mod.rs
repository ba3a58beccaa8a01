// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query text to AST: lexer, parser, constant parameterization and the
//! semantic state handed to the planner.

#[allow(clippy::module_inception)]
pub mod ast;
pub mod lexer;
pub mod parser;

use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use ast::{
    BinaryOp, CreateClause, Expression, Literal, MatchClause, NodePattern, OrderItem,
    PatternDirection, PatternPart, Query, RelPattern, ReturnClause, ReturnItem, Statement, UnaryOp,
};
pub use parser::ParsingError;

/// What kind of graph entity a pattern variable denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// Variable scoping information collected while parsing. Conflicting
/// redeclarations are recorded here and surface as semantic errors at
/// plan time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticState {
    pub variables: BTreeMap<String, EntityKind>,
    pub conflicts: BTreeSet<String>,
}

impl SemanticState {
    fn declare(&mut self, name: &str, kind: EntityKind) {
        match self.variables.get(name) {
            Some(existing) if *existing != kind => {
                self.conflicts.insert(name.to_string());
            }
            Some(_) => {}
            None => {
                self.variables.insert(name.to_string(), kind);
            }
        }
    }

    pub fn kind(&self, name: &str) -> Option<EntityKind> {
        self.variables.get(name).copied()
    }

    fn collect_part(&mut self, part: &PatternPart) {
        if let Some(name) = &part.start.variable {
            self.declare(name, EntityKind::Node);
        }
        for (rel, node) in &part.hops {
            if let Some(name) = &rel.variable {
                self.declare(name, EntityKind::Relationship);
            }
            if let Some(name) = &node.variable {
                self.declare(name, EntityKind::Node);
            }
        }
    }

    fn collect(query: &Query) -> Self {
        let mut state = SemanticState::default();
        for clause in &query.matches {
            for part in &clause.patterns {
                state.collect_part(part);
            }
        }
        if let Some(create) = &query.create {
            for part in &create.patterns {
                state.collect_part(part);
            }
        }
        state
    }
}

/// A parsed query: immutable AST, the constants extracted during
/// parameterization, and variable scoping state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub ast: Statement,
    pub residual_params: BTreeMap<String, Value>,
    pub semantics: SemanticState,
}

/// Lift literal constants out of WHERE predicates into auto-named
/// residual parameters so structurally equal queries evaluate the same
/// plan shape. Pattern property maps and SKIP/LIMIT counts stay inline:
/// the former feed scan filters, the latter feed plan rewrites.
fn parameterize(query: &mut Query) -> BTreeMap<String, Value> {
    let mut params = BTreeMap::new();
    let mut counter = 0usize;
    for clause in &mut query.matches {
        if let Some(predicate) = &mut clause.where_clause {
            lift_literals(predicate, &mut params, &mut counter);
        }
    }
    params
}

fn lift_literals(
    expr: &mut Expression,
    params: &mut BTreeMap<String, Value>,
    counter: &mut usize,
) {
    match expr {
        Expression::Literal(literal) => {
            let name = format!("@lit{}", *counter);
            *counter += 1;
            params.insert(name.clone(), literal.to_value());
            *expr = Expression::Parameter(name);
        }
        Expression::Property { base, .. } => lift_literals(base, params, counter),
        Expression::Unary { operand, .. } => lift_literals(operand, params, counter),
        Expression::Binary { left, right, .. } => {
            lift_literals(left, params, counter);
            lift_literals(right, params, counter);
        }
        Expression::List(items) => {
            for item in items {
                lift_literals(item, params, counter);
            }
        }
        Expression::Map(entries) => {
            for (_, value) in entries {
                lift_literals(value, params, counter);
            }
        }
        Expression::Parameter(_) | Expression::Variable(_) => {}
    }
}

/// Parse a query string into an immutable [`ParsedQuery`].
pub fn parse(query: &str) -> Result<ParsedQuery, ParsingError> {
    let tokens = lexer::tokenize(query).map_err(ParsingError::new)?;
    let mut parser = parser::Parser::new(tokens);
    let mut parsed = parser.parse_query()?;
    parser.expect_eof()?;

    let semantics = SemanticState::collect(&parsed);
    let residual_params = parameterize(&mut parsed);
    log::debug!(
        "parsed query: {} pattern variables, {} residual params",
        semantics.variables.len(),
        residual_params.len()
    );
    Ok(ParsedQuery {
        ast: Statement::Query(parsed),
        residual_params,
        semantics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_variable_kinds() {
        let parsed = parse("MATCH (a)-[r]->(b) RETURN a").unwrap();
        assert_eq!(parsed.semantics.kind("a"), Some(EntityKind::Node));
        assert_eq!(parsed.semantics.kind("r"), Some(EntityKind::Relationship));
        assert_eq!(parsed.semantics.kind("b"), Some(EntityKind::Node));
        assert!(parsed.semantics.conflicts.is_empty());
    }

    #[test]
    fn records_kind_conflicts() {
        let parsed = parse("MATCH (r)-[r]->(b) RETURN b").unwrap();
        assert!(parsed.semantics.conflicts.contains("r"));
    }

    #[test]
    fn extracts_where_constants() {
        let parsed = parse("MATCH (n) WHERE n.age > 21 RETURN n").unwrap();
        assert_eq!(
            parsed.residual_params.get("@lit0"),
            Some(&Value::Integer(21))
        );
        match &parsed.ast {
            Statement::Query(query) => {
                let predicate = query.matches[0].where_clause.as_ref().unwrap();
                assert_eq!(predicate.to_string(), "n.age > $@lit0");
            }
        }
    }

    #[test]
    fn malformed_input_yields_parsing_error() {
        assert!(parse("MATCH (n RETURN n").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn structurally_equal_queries_share_shape() {
        let a = parse("MATCH (n) WHERE n.age > 21 RETURN n").unwrap();
        let b = parse("MATCH (n) WHERE n.age > 99 RETURN n").unwrap();
        assert_eq!(a.ast, b.ast);
        assert_ne!(a.residual_params, b.residual_params);
    }
}
