// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical plan trees and the AST-to-logical planner.
//!
//! Lowering strategy for MATCH patterns:
//! - a bare node pattern becomes a node scan;
//! - a single-hop pattern becomes a scan of the start node plus an
//!   expansion;
//! - a chain of two or more hops becomes one oriented triple scan per
//!   hop, combined with joins on the shared node columns, so that the
//!   join's relationship-uniqueness rule binds distinct pattern
//!   relationships to distinct edges;
//! - comma-separated patterns and successive MATCH clauses join on
//!   whatever columns they share (cartesian when none).

use crate::ast::{
    BinaryOp, CreateClause, Expression, NodePattern, PatternDirection, PatternPart, Query,
    RelPattern, ReturnClause, SemanticState, Statement,
};
use crate::error::EngineError;
use crate::model::Direction;
use crate::plan::pretty::TreeRender;
use crate::plan::{PlanError, SemanticError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

/// Label/property constraints on a scanned or expanded node, with
/// property values still in expression form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilterExpr {
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

impl NodeFilterExpr {
    fn of(pattern: &NodePattern) -> Self {
        Self {
            labels: pattern.labels.clone(),
            properties: pattern.properties.clone(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.labels.is_empty() && self.properties.is_empty()
    }

    pub(crate) fn label_suffix(&self) -> String {
        let mut out = String::new();
        for label in &self.labels {
            let _ = write!(out, ":{}", label);
        }
        if !self.properties.is_empty() {
            let entries: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            let _ = write!(out, " {{{}}}", entries.join(", "));
        }
        out
    }
}

/// Type/property constraints on a scanned or expanded relationship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelFilterExpr {
    pub types: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

impl RelFilterExpr {
    fn of(pattern: &RelPattern) -> Self {
        Self {
            types: pattern.types.clone(),
            properties: pattern.properties.clone(),
        }
    }

    pub(crate) fn label_suffix(&self) -> String {
        let mut out = String::new();
        if !self.types.is_empty() {
            let _ = write!(out, ":{}", self.types.join("|"));
        }
        if !self.properties.is_empty() {
            let entries: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            let _ = write!(out, " {{{}}}", entries.join(", "));
        }
        out
    }
}

/// A node to create: `column` is set when the pattern bound a fresh
/// variable that later clauses may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeItem {
    pub column: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

/// Which node a created relationship endpoint resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreateEndpoint {
    /// A column bound by a preceding MATCH.
    Bound(String),
    /// Index into the create clause's node items.
    New(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRelItem {
    pub column: Option<String>,
    pub rel_type: Option<String>,
    pub start: CreateEndpoint,
    pub end: CreateEndpoint,
    pub properties: Vec<(String, Expression)>,
}

/// Logical plan node. Operator-independent but schema-bearing through
/// its column naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalNode {
    NodeScan {
        variable: String,
        filter: NodeFilterExpr,
    },
    TripleScan {
        start_variable: String,
        rel_variable: String,
        end_variable: String,
        start: NodeFilterExpr,
        rel: RelFilterExpr,
        end: NodeFilterExpr,
        direction: Direction,
    },
    Expand {
        input: Box<LogicalNode>,
        from_variable: String,
        rel_variable: String,
        to_variable: String,
        rel: RelFilterExpr,
        to: NodeFilterExpr,
        direction: Direction,
    },
    Filter {
        input: Box<LogicalNode>,
        predicate: Expression,
    },
    Project {
        input: Box<LogicalNode>,
        items: Vec<(String, Expression)>,
    },
    Return {
        input: Option<Box<LogicalNode>>,
        items: Vec<(String, Expression)>,
    },
    OrderBy {
        input: Box<LogicalNode>,
        keys: Option<Vec<(String, bool)>>,
    },
    Skip {
        input: Box<LogicalNode>,
        count: Expression,
    },
    Take {
        input: Box<LogicalNode>,
        count: Expression,
    },
    Join {
        left: Box<LogicalNode>,
        right: Box<LogicalNode>,
    },
    Distinct {
        input: Box<LogicalNode>,
    },
    Create {
        input: Option<Box<LogicalNode>>,
        nodes: Vec<CreateNodeItem>,
        rels: Vec<CreateRelItem>,
    },
}

/// Immutable logical tree produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    pub root: LogicalNode,
}

impl LogicalPlan {
    pub fn pretty(&self) -> String {
        crate::plan::pretty::pretty(&self.root)
    }
}

/// Explicit planner state threaded through plan construction: variable
/// scoping behind a shared handle plus the anonymous-column counter.
#[derive(Debug, Clone)]
pub struct PlannerContext {
    pub semantics: Arc<SemanticState>,
    next_anon: usize,
}

impl PlannerContext {
    pub fn new(semantics: Arc<SemanticState>) -> Self {
        Self {
            semantics,
            next_anon: 0,
        }
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("@{}{}", prefix, self.next_anon);
        self.next_anon += 1;
        name
    }
}

fn direction_of(direction: PatternDirection) -> Direction {
    match direction {
        PatternDirection::Outgoing => Direction::Outgoing,
        PatternDirection::Incoming => Direction::Incoming,
        PatternDirection::Undirected => Direction::Both,
    }
}

fn check_variables(expr: &Expression, bound: &BTreeSet<String>) -> Result<(), SemanticError> {
    let mut used = BTreeSet::new();
    expr.variables(&mut used);
    for name in used {
        if !bound.contains(&name) {
            return Err(SemanticError::unknown_variable(&name));
        }
    }
    Ok(())
}

fn join_with(left: Option<LogicalNode>, right: LogicalNode) -> LogicalNode {
    match left {
        None => right,
        Some(left) => LogicalNode::Join {
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

/// Lower a parsed statement into a logical plan.
pub fn plan_statement(
    statement: &Statement,
    ctx: &mut PlannerContext,
) -> Result<LogicalPlan, EngineError> {
    let Statement::Query(query) = statement;
    let root = plan_query(query, ctx)?;
    log::debug!("logical plan:\n{}", crate::plan::pretty::pretty(&root));
    Ok(LogicalPlan { root })
}

fn plan_query(query: &Query, ctx: &mut PlannerContext) -> Result<LogicalNode, EngineError> {
    if let Some(name) = ctx.semantics.conflicts.iter().next() {
        return Err(SemanticError::new(format!(
            "variable `{}` used as both node and relationship",
            name
        ))
        .into());
    }

    let mut bound: BTreeSet<String> = BTreeSet::new();
    let mut plan: Option<LogicalNode> = None;

    for clause in &query.matches {
        let mut clause_plan: Option<LogicalNode> = None;
        for part in &clause.patterns {
            let part_plan = plan_part(part, ctx, &mut bound)?;
            clause_plan = Some(join_with(clause_plan, part_plan));
        }
        if let Some(clause_plan) = clause_plan {
            plan = Some(join_with(plan, clause_plan));
        }
        if let Some(predicate) = &clause.where_clause {
            check_variables(predicate, &bound)?;
            let input = plan.take().ok_or_else(|| {
                PlanError::new("WHERE requires a preceding pattern")
            })?;
            plan = Some(LogicalNode::Filter {
                input: Box::new(input),
                predicate: predicate.clone(),
            });
        }
    }

    if let Some(create) = &query.create {
        let (nodes, rels, new_columns) = plan_create(create, ctx, &bound)?;
        bound.extend(new_columns);
        plan = Some(LogicalNode::Create {
            input: plan.map(Box::new),
            nodes,
            rels,
        });
    }

    let ret = match &query.return_clause {
        Some(ret) => ret,
        None => {
            return match (plan, query.create.is_some()) {
                (Some(plan), true) => Ok(plan),
                _ => Err(PlanError::new("query must end in RETURN or CREATE").into()),
            };
        }
    };
    plan_return(ret, plan, &bound)
}

fn plan_return(
    ret: &ReturnClause,
    input: Option<LogicalNode>,
    bound: &BTreeSet<String>,
) -> Result<LogicalNode, EngineError> {
    let mut items: Vec<(String, Expression)> = Vec::with_capacity(ret.items.len());
    for item in &ret.items {
        check_variables(&item.expression, bound)?;
        let name = item
            .alias
            .clone()
            .unwrap_or_else(|| item.expression.to_string());
        items.push((name, item.expression.clone()));
    }

    let mut node = LogicalNode::Return {
        input: input.map(Box::new),
        items: items.clone(),
    };
    if ret.distinct {
        node = LogicalNode::Distinct {
            input: Box::new(node),
        };
    }
    if !ret.order_by.is_empty() {
        let mut keys = Vec::with_capacity(ret.order_by.len());
        for order in &ret.order_by {
            let rendered = order.expression.to_string();
            // An ORDER BY key must name an output column, either by its
            // alias or by the same expression text as a returned item.
            let column = if items.iter().any(|(name, _)| *name == rendered) {
                rendered
            } else if let Some((name, _)) = items
                .iter()
                .find(|(_, expr)| expr.to_string() == rendered)
            {
                name.clone()
            } else {
                return Err(SemanticError::new(format!(
                    "ORDER BY key `{}` is not a returned column",
                    rendered
                ))
                .into());
            };
            keys.push((column, order.ascending));
        }
        node = LogicalNode::OrderBy {
            input: Box::new(node),
            keys: Some(keys),
        };
    }
    if let Some(skip) = &ret.skip {
        node = LogicalNode::Skip {
            input: Box::new(node),
            count: skip.clone(),
        };
    }
    if let Some(limit) = &ret.limit {
        node = LogicalNode::Take {
            input: Box::new(node),
            count: limit.clone(),
        };
    }
    Ok(node)
}

/// Name a pattern node, minting an anonymous column when unnamed.
fn node_name(pattern: &NodePattern, ctx: &mut PlannerContext) -> String {
    pattern
        .variable
        .clone()
        .unwrap_or_else(|| ctx.fresh("anon"))
}

fn rel_name(pattern: &RelPattern, ctx: &mut PlannerContext) -> String {
    pattern
        .variable
        .clone()
        .unwrap_or_else(|| ctx.fresh("rel"))
}

fn plan_part(
    part: &PatternPart,
    ctx: &mut PlannerContext,
    bound: &mut BTreeSet<String>,
) -> Result<LogicalNode, EngineError> {
    let start_name = node_name(&part.start, ctx);
    let start_filter = NodeFilterExpr::of(&part.start);

    if part.hops.is_empty() {
        bound.insert(start_name.clone());
        return Ok(LogicalNode::NodeScan {
            variable: start_name,
            filter: start_filter,
        });
    }

    if part.hops.len() == 1 {
        let (rel, end) = &part.hops[0];
        let rel_column = rel_name(rel, ctx);
        let end_column = node_name(end, ctx);
        return plan_single_hop(
            start_name,
            start_filter,
            rel_column,
            RelFilterExpr::of(rel),
            direction_of(rel.direction),
            end_column,
            NodeFilterExpr::of(end),
            ctx,
            bound,
        );
    }

    // Multi-hop chain: one triple scan per hop, joined on the shared
    // node columns. Relationship uniqueness falls out of the join.
    let mut plan: Option<LogicalNode> = None;
    let mut from_name = start_name;
    let mut from_filter = start_filter;
    for (rel, end) in &part.hops {
        let rel_column = rel_name(rel, ctx);
        let end_column = node_name(end, ctx);
        let (scan, next_name, next_filter) = plan_hop_scan(
            from_name,
            from_filter,
            rel_column,
            rel,
            end_column,
            end,
            ctx,
            bound,
        )?;
        plan = Some(join_with(plan, scan));
        from_name = next_name;
        from_filter = next_filter;
    }
    plan.ok_or_else(|| PlanError::new("empty pattern chain").into())
}

#[allow(clippy::too_many_arguments)]
fn plan_single_hop(
    start_name: String,
    start_filter: NodeFilterExpr,
    rel_column: String,
    rel_filter: RelFilterExpr,
    direction: Direction,
    end_column: String,
    end_filter: NodeFilterExpr,
    ctx: &mut PlannerContext,
    bound: &mut BTreeSet<String>,
) -> Result<LogicalNode, EngineError> {
    let base = LogicalNode::NodeScan {
        variable: start_name.clone(),
        filter: start_filter,
    };
    bound.insert(start_name.clone());
    bound.insert(rel_column.clone());

    // A self loop `(a)-[r]->(a)` expands into a fresh column, keeps
    // only matching endpoints, and projects the helper column away.
    let self_loop = end_column == start_name;
    let to_column = if self_loop {
        ctx.fresh("anon")
    } else {
        bound.insert(end_column.clone());
        end_column.clone()
    };

    let mut node = LogicalNode::Expand {
        input: Box::new(base),
        from_variable: start_name.clone(),
        rel_variable: rel_column.clone(),
        to_variable: to_column.clone(),
        rel: rel_filter,
        to: end_filter,
        direction,
    };
    if self_loop {
        node = LogicalNode::Filter {
            input: Box::new(node),
            predicate: Expression::binary(
                Expression::variable(start_name.clone()),
                BinaryOp::Eq,
                Expression::variable(to_column),
            ),
        };
        node = LogicalNode::Project {
            input: Box::new(node),
            items: vec![
                (start_name.clone(), Expression::variable(start_name)),
                (rel_column.clone(), Expression::variable(rel_column)),
            ],
        };
    }
    Ok(node)
}

#[allow(clippy::too_many_arguments)]
fn plan_hop_scan(
    from_name: String,
    from_filter: NodeFilterExpr,
    rel_column: String,
    rel: &RelPattern,
    end_column: String,
    end: &NodePattern,
    ctx: &mut PlannerContext,
    bound: &mut BTreeSet<String>,
) -> Result<(LogicalNode, String, NodeFilterExpr), EngineError> {
    bound.insert(from_name.clone());
    bound.insert(rel_column.clone());

    let self_loop = end_column == from_name;
    let to_column = if self_loop {
        ctx.fresh("anon")
    } else {
        bound.insert(end_column.clone());
        end_column.clone()
    };
    let end_filter = NodeFilterExpr::of(end);

    let mut scan = LogicalNode::TripleScan {
        start_variable: from_name.clone(),
        rel_variable: rel_column.clone(),
        end_variable: to_column.clone(),
        start: from_filter,
        rel: RelFilterExpr::of(rel),
        end: end_filter.clone(),
        direction: direction_of(rel.direction),
    };
    if self_loop {
        scan = LogicalNode::Filter {
            input: Box::new(scan),
            predicate: Expression::binary(
                Expression::variable(from_name.clone()),
                BinaryOp::Eq,
                Expression::variable(to_column),
            ),
        };
        scan = LogicalNode::Project {
            input: Box::new(scan),
            items: vec![
                (from_name.clone(), Expression::variable(from_name.clone())),
                (rel_column.clone(), Expression::variable(rel_column)),
            ],
        };
        return Ok((scan, from_name, end_filter));
    }
    Ok((scan, end_column, end_filter))
}

type CreateItems = (Vec<CreateNodeItem>, Vec<CreateRelItem>, Vec<String>);

fn create_endpoint(
    pattern: &NodePattern,
    bound: &BTreeSet<String>,
    nodes: &mut Vec<CreateNodeItem>,
    created: &mut BTreeMap<String, usize>,
    new_columns: &mut Vec<String>,
) -> Result<CreateEndpoint, EngineError> {
    match &pattern.variable {
        Some(name) if bound.contains(name) => {
            if !pattern.labels.is_empty() || !pattern.properties.is_empty() {
                return Err(SemanticError::new(format!(
                    "bound variable `{}` cannot take labels or properties in CREATE",
                    name
                ))
                .into());
            }
            Ok(CreateEndpoint::Bound(name.clone()))
        }
        Some(name) if created.contains_key(name) => Ok(CreateEndpoint::New(created[name])),
        variable => {
            let index = nodes.len();
            nodes.push(CreateNodeItem {
                column: variable.clone(),
                labels: pattern.labels.clone(),
                properties: pattern.properties.clone(),
            });
            if let Some(name) = variable {
                created.insert(name.clone(), index);
                new_columns.push(name.clone());
            }
            Ok(CreateEndpoint::New(index))
        }
    }
}

fn plan_create(
    clause: &CreateClause,
    _ctx: &mut PlannerContext,
    bound: &BTreeSet<String>,
) -> Result<CreateItems, EngineError> {
    let mut nodes = Vec::new();
    let mut rels = Vec::new();
    let mut new_columns = Vec::new();
    let mut created: BTreeMap<String, usize> = BTreeMap::new();

    for part in &clause.patterns {
        for (_, expr) in &part.start.properties {
            check_variables(expr, bound)?;
        }
        let mut prev = create_endpoint(&part.start, bound, &mut nodes, &mut created, &mut new_columns)?;
        for (rel, node) in &part.hops {
            for (_, expr) in &node.properties {
                check_variables(expr, bound)?;
            }
            for (_, expr) in &rel.properties {
                check_variables(expr, bound)?;
            }
            let next =
                create_endpoint(node, bound, &mut nodes, &mut created, &mut new_columns)?;
            let (start, end) = match rel.direction {
                PatternDirection::Outgoing => (prev.clone(), next.clone()),
                PatternDirection::Incoming => (next.clone(), prev.clone()),
                PatternDirection::Undirected => {
                    return Err(
                        PlanError::new("CREATE requires a directed relationship").into()
                    )
                }
            };
            if rel.types.len() > 1 {
                return Err(PlanError::new(
                    "CREATE accepts at most one relationship type",
                )
                .into());
            }
            if let Some(name) = &rel.variable {
                if bound.contains(name) || created.contains_key(name) {
                    return Err(SemanticError::new(format!(
                        "variable `{}` is already bound",
                        name
                    ))
                    .into());
                }
                new_columns.push(name.clone());
            }
            rels.push(CreateRelItem {
                column: rel.variable.clone(),
                rel_type: rel.types.first().cloned(),
                start,
                end,
                properties: rel.properties.clone(),
            });
            prev = next;
        }
    }
    Ok((nodes, rels, new_columns))
}

impl TreeRender for LogicalNode {
    fn label(&self) -> String {
        match self {
            LogicalNode::NodeScan { variable, filter } => {
                format!("NodeScan({}{})", variable, filter.label_suffix())
            }
            LogicalNode::TripleScan {
                start_variable,
                rel_variable,
                end_variable,
                start,
                rel,
                end,
                direction,
            } => format!(
                "TripleScan(({}{})-[{}{}]-({}{}), {})",
                start_variable,
                start.label_suffix(),
                rel_variable,
                rel.label_suffix(),
                end_variable,
                end.label_suffix(),
                direction
            ),
            LogicalNode::Expand {
                from_variable,
                rel_variable,
                to_variable,
                rel,
                to,
                direction,
                ..
            } => format!(
                "Expand(({})-[{}{}]-({}{}), {})",
                from_variable,
                rel_variable,
                rel.label_suffix(),
                to_variable,
                to.label_suffix(),
                direction
            ),
            LogicalNode::Filter { predicate, .. } => format!("Filter({})", predicate),
            LogicalNode::Project { items, .. } => format!(
                "Project({})",
                items
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            LogicalNode::Return { items, .. } => format!(
                "Return({})",
                items
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            LogicalNode::OrderBy { keys, .. } => match keys {
                None => "OrderBy(*)".to_string(),
                Some(keys) => format!(
                    "OrderBy({})",
                    keys.iter()
                        .map(|(name, asc)| {
                            format!("{} {}", name, if *asc { "asc" } else { "desc" })
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
            LogicalNode::Skip { count, .. } => format!("Skip({})", count),
            LogicalNode::Take { count, .. } => format!("Take({})", count),
            LogicalNode::Join { .. } => "Join".to_string(),
            LogicalNode::Distinct { .. } => "Distinct".to_string(),
            LogicalNode::Create { nodes, rels, .. } => {
                format!("Create({} nodes, {} relationships)", nodes.len(), rels.len())
            }
        }
    }

    fn children(&self) -> Vec<&dyn TreeRender> {
        match self {
            LogicalNode::NodeScan { .. } | LogicalNode::TripleScan { .. } => Vec::new(),
            LogicalNode::Expand { input, .. }
            | LogicalNode::Filter { input, .. }
            | LogicalNode::Project { input, .. }
            | LogicalNode::OrderBy { input, .. }
            | LogicalNode::Skip { input, .. }
            | LogicalNode::Take { input, .. }
            | LogicalNode::Distinct { input, .. } => vec![input.as_ref()],
            LogicalNode::Return { input, .. } | LogicalNode::Create { input, .. } => {
                input.iter().map(|n| n.as_ref() as &dyn TreeRender).collect()
            }
            LogicalNode::Join { left, right } => vec![left.as_ref(), right.as_ref()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    fn plan(text: &str) -> LogicalPlan {
        try_plan(text).unwrap()
    }

    fn try_plan(text: &str) -> Result<LogicalPlan, EngineError> {
        let parsed = ast::parse(text).unwrap();
        let mut ctx = PlannerContext::new(Arc::new(parsed.semantics.clone()));
        plan_statement(&parsed.ast, &mut ctx)
    }

    #[test]
    fn bare_node_pattern_becomes_scan() {
        let plan = plan("MATCH (n:Person) RETURN n");
        match &plan.root {
            LogicalNode::Return { input, items } => {
                assert_eq!(items[0].0, "n");
                assert!(matches!(
                    input.as_deref(),
                    Some(LogicalNode::NodeScan { variable, .. }) if variable == "n"
                ));
            }
            other => panic!("expected Return over NodeScan, got {:?}", other),
        }
    }

    #[test]
    fn single_hop_becomes_scan_plus_expand() {
        let plan = plan("MATCH (a)-[r:KNOWS]->(b) RETURN a, r, b");
        match &plan.root {
            LogicalNode::Return { input, .. } => match input.as_deref() {
                Some(LogicalNode::Expand {
                    from_variable,
                    rel_variable,
                    to_variable,
                    direction,
                    input,
                    ..
                }) => {
                    assert_eq!(from_variable, "a");
                    assert_eq!(rel_variable, "r");
                    assert_eq!(to_variable, "b");
                    assert_eq!(*direction, Direction::Outgoing);
                    assert!(matches!(input.as_ref(), LogicalNode::NodeScan { .. }));
                }
                other => panic!("expected Expand, got {:?}", other),
            },
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn multi_hop_chain_becomes_joined_triple_scans() {
        let plan = plan("MATCH (a)-[r]-(b)-[p]-(c) RETURN a, r, b, p, c");
        match &plan.root {
            LogicalNode::Return { input, .. } => match input.as_deref() {
                Some(LogicalNode::Join { left, right }) => {
                    assert!(matches!(left.as_ref(), LogicalNode::TripleScan { .. }));
                    match right.as_ref() {
                        LogicalNode::TripleScan {
                            start_variable,
                            direction,
                            ..
                        } => {
                            assert_eq!(start_variable, "b");
                            assert_eq!(*direction, Direction::Both);
                        }
                        other => panic!("expected TripleScan, got {:?}", other),
                    }
                }
                other => panic!("expected Join, got {:?}", other),
            },
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn where_clause_becomes_filter() {
        let plan = plan("MATCH (n) WHERE n.age > 21 RETURN n");
        match &plan.root {
            LogicalNode::Return { input, .. } => {
                assert!(matches!(input.as_deref(), Some(LogicalNode::Filter { .. })));
            }
            other => panic!("expected Return over Filter, got {:?}", other),
        }
    }

    #[test]
    fn return_modifiers_stack_in_order() {
        let plan = plan("MATCH (n) RETURN DISTINCT n ORDER BY n SKIP 1 LIMIT 2");
        // Take(Skip(OrderBy(Distinct(Return(...)))))
        match &plan.root {
            LogicalNode::Take { input, .. } => match input.as_ref() {
                LogicalNode::Skip { input, .. } => match input.as_ref() {
                    LogicalNode::OrderBy { input, keys } => {
                        assert_eq!(keys.as_deref(), Some(&[("n".to_string(), true)][..]));
                        assert!(matches!(input.as_ref(), LogicalNode::Distinct { .. }));
                    }
                    other => panic!("expected OrderBy, got {:?}", other),
                },
                other => panic!("expected Skip, got {:?}", other),
            },
            other => panic!("expected Take, got {:?}", other),
        }
    }

    #[test]
    fn order_by_alias_resolves_to_output_column() {
        let plan = plan("MATCH (n) RETURN n.name AS name ORDER BY n.name DESC");
        match &plan.root {
            LogicalNode::OrderBy { keys, .. } => {
                assert_eq!(keys.as_deref(), Some(&[("name".to_string(), false)][..]));
            }
            other => panic!("expected OrderBy, got {:?}", other),
        }
    }

    #[test]
    fn unknown_variable_in_where_is_semantic_error() {
        let err = try_plan("MATCH (n) WHERE m.age > 1 RETURN n").unwrap_err();
        assert!(matches!(err, EngineError::Semantic(_)));
    }

    #[test]
    fn unknown_variable_in_return_is_semantic_error() {
        let err = try_plan("MATCH (n) RETURN m").unwrap_err();
        assert!(matches!(err, EngineError::Semantic(_)));
    }

    #[test]
    fn match_without_return_is_plan_error() {
        let err = try_plan("MATCH (n)").unwrap_err();
        assert!(matches!(err, EngineError::Plan(_)));
    }

    #[test]
    fn create_after_match_binds_endpoints() {
        let plan = plan("MATCH (a), (b) CREATE (a)-[r:KNOWS]->(b) RETURN r");
        match &plan.root {
            LogicalNode::Return { input, .. } => match input.as_deref() {
                Some(LogicalNode::Create { nodes, rels, input }) => {
                    assert!(nodes.is_empty());
                    assert_eq!(rels.len(), 1);
                    assert_eq!(rels[0].start, CreateEndpoint::Bound("a".into()));
                    assert_eq!(rels[0].end, CreateEndpoint::Bound("b".into()));
                    assert!(input.is_some());
                }
                other => panic!("expected Create, got {:?}", other),
            },
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn undirected_create_is_plan_error() {
        let err = try_plan("CREATE (a)-[r:KNOWS]-(b)").unwrap_err();
        assert!(matches!(err, EngineError::Plan(_)));
    }

    #[test]
    fn standalone_create_plans_new_nodes() {
        let plan = plan("CREATE (a:Person {name: 'x'})-[r:KNOWS]->(b:Person)");
        match &plan.root {
            LogicalNode::Create { input, nodes, rels } => {
                assert!(input.is_none());
                assert_eq!(nodes.len(), 2);
                assert_eq!(rels.len(), 1);
                assert_eq!(rels[0].start, CreateEndpoint::New(0));
                assert_eq!(rels[0].end, CreateEndpoint::New(1));
            }
            other => panic!("expected Create, got {:?}", other),
        }
    }
}
