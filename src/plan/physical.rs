// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical plan trees: concrete operators that know how to produce a
//! [`DataFrame`].
//!
//! Scans bind to the graph model's enumerators, filters wrap the
//! evaluator, joins dispatch to the data-frame operator, and Create
//! calls the model's bulk-create entry point. Schemas are computable
//! without executing anything.

use crate::ast::Expression;
use crate::error::EngineError;
use crate::eval::{EvalScope, EvaluationError, Evaluator};
use crate::frame::{DataFrame, Row, Schema, SchemaError};
use crate::model::{
    CypherType, Direction, EndpointRef, NodeFilter, NodeSpec, RelSpec, RelationshipFilter, Value,
};
use crate::plan::logical::{
    CreateEndpoint, CreateNodeItem, CreateRelItem, LogicalNode, LogicalPlan, NodeFilterExpr,
    RelFilterExpr,
};
use crate::plan::pretty::TreeRender;
use crate::plan::{ExecContext, PlanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Physical execution node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalNode {
    NodeScanExec {
        variable: String,
        filter: NodeFilterExpr,
        /// Residual predicate attached by predicate pushdown.
        predicate: Option<Expression>,
    },
    TripleScanExec {
        start_variable: String,
        rel_variable: String,
        end_variable: String,
        start: NodeFilterExpr,
        rel: RelFilterExpr,
        end: NodeFilterExpr,
        direction: Direction,
        predicate: Option<Expression>,
    },
    ExpandExec {
        input: Box<PhysicalNode>,
        from_variable: String,
        rel_variable: String,
        to_variable: String,
        rel: RelFilterExpr,
        to: NodeFilterExpr,
        direction: Direction,
    },
    FilterExec {
        input: Box<PhysicalNode>,
        predicate: Expression,
    },
    ProjectExec {
        input: Option<Box<PhysicalNode>>,
        items: Vec<(String, Expression)>,
    },
    OrderByExec {
        input: Box<PhysicalNode>,
        keys: Option<Vec<(String, bool)>>,
    },
    SkipExec {
        input: Box<PhysicalNode>,
        count: Expression,
    },
    TakeExec {
        input: Box<PhysicalNode>,
        count: Expression,
    },
    JoinExec {
        left: Box<PhysicalNode>,
        right: Box<PhysicalNode>,
    },
    DistinctExec {
        input: Box<PhysicalNode>,
    },
    CreateExec {
        input: Option<Box<PhysicalNode>>,
        nodes: Vec<CreateNodeItem>,
        rels: Vec<CreateRelItem>,
    },
    /// A frame that is statically known to be empty, introduced by
    /// constant-filter folding.
    EmptyExec {
        columns: Vec<(String, CypherType)>,
    },
}

/// Immutable physical tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPlan {
    pub root: PhysicalNode,
}

impl PhysicalPlan {
    pub fn pretty(&self) -> String {
        crate::plan::pretty::pretty(&self.root)
    }

    pub fn execute(&self, ctx: &Arc<ExecContext>) -> Result<DataFrame, EngineError> {
        self.root.execute(ctx)
    }
}

/// Lower a logical plan into a physical one.
pub fn plan_physical(plan: &LogicalPlan) -> Result<PhysicalPlan, EngineError> {
    let root = lower(&plan.root)?;
    // Schema computation doubles as a plan-time consistency check.
    root.schema()?;
    Ok(PhysicalPlan { root })
}

fn lower(node: &LogicalNode) -> Result<PhysicalNode, EngineError> {
    Ok(match node {
        LogicalNode::NodeScan { variable, filter } => PhysicalNode::NodeScanExec {
            variable: variable.clone(),
            filter: filter.clone(),
            predicate: None,
        },
        LogicalNode::TripleScan {
            start_variable,
            rel_variable,
            end_variable,
            start,
            rel,
            end,
            direction,
        } => PhysicalNode::TripleScanExec {
            start_variable: start_variable.clone(),
            rel_variable: rel_variable.clone(),
            end_variable: end_variable.clone(),
            start: start.clone(),
            rel: rel.clone(),
            end: end.clone(),
            direction: *direction,
            predicate: None,
        },
        LogicalNode::Expand {
            input,
            from_variable,
            rel_variable,
            to_variable,
            rel,
            to,
            direction,
        } => PhysicalNode::ExpandExec {
            input: Box::new(lower(input)?),
            from_variable: from_variable.clone(),
            rel_variable: rel_variable.clone(),
            to_variable: to_variable.clone(),
            rel: rel.clone(),
            to: to.clone(),
            direction: *direction,
        },
        LogicalNode::Filter { input, predicate } => PhysicalNode::FilterExec {
            input: Box::new(lower(input)?),
            predicate: predicate.clone(),
        },
        LogicalNode::Project { input, items } => PhysicalNode::ProjectExec {
            input: Some(Box::new(lower(input)?)),
            items: items.clone(),
        },
        LogicalNode::Return { input, items } => PhysicalNode::ProjectExec {
            input: match input {
                Some(input) => Some(Box::new(lower(input)?)),
                None => None,
            },
            items: items.clone(),
        },
        LogicalNode::OrderBy { input, keys } => PhysicalNode::OrderByExec {
            input: Box::new(lower(input)?),
            keys: keys.clone(),
        },
        LogicalNode::Skip { input, count } => PhysicalNode::SkipExec {
            input: Box::new(lower(input)?),
            count: count.clone(),
        },
        LogicalNode::Take { input, count } => PhysicalNode::TakeExec {
            input: Box::new(lower(input)?),
            count: count.clone(),
        },
        LogicalNode::Join { left, right } => PhysicalNode::JoinExec {
            left: Box::new(lower(left)?),
            right: Box::new(lower(right)?),
        },
        LogicalNode::Distinct { input } => PhysicalNode::DistinctExec {
            input: Box::new(lower(input)?),
        },
        LogicalNode::Create { input, nodes, rels } => PhysicalNode::CreateExec {
            input: match input {
                Some(input) => Some(Box::new(lower(input)?)),
                None => None,
            },
            nodes: nodes.clone(),
            rels: rels.clone(),
        },
    })
}

pub(crate) fn join_schema(left: &Schema, right: &Schema) -> Result<Schema, SchemaError> {
    let mut columns = left.columns().to_vec();
    for (name, ty) in right.columns() {
        if !left.contains(name) {
            columns.push((name.clone(), ty.clone()));
        }
    }
    Schema::new(columns)
}

impl PhysicalNode {
    /// Output column names, cheap enough for optimizer rules.
    pub fn output_columns(&self) -> Vec<String> {
        match self.schema() {
            Ok(schema) => schema.names(),
            Err(_) => Vec::new(),
        }
    }

    /// The schema this node will produce, computable without touching
    /// the graph model.
    pub fn schema(&self) -> Result<Schema, EngineError> {
        let evaluator = Evaluator::new();
        match self {
            PhysicalNode::NodeScanExec { variable, .. } => {
                Ok(Schema::new(vec![(variable.clone(), CypherType::Node)])?)
            }
            PhysicalNode::TripleScanExec {
                start_variable,
                rel_variable,
                end_variable,
                ..
            } => Ok(Schema::new(vec![
                (start_variable.clone(), CypherType::Node),
                (rel_variable.clone(), CypherType::Relationship),
                (end_variable.clone(), CypherType::Node),
            ])?),
            PhysicalNode::ExpandExec {
                input,
                rel_variable,
                to_variable,
                ..
            } => {
                let mut columns = input.schema()?.columns().to_vec();
                columns.push((rel_variable.clone(), CypherType::Relationship));
                columns.push((to_variable.clone(), CypherType::Node));
                Ok(Schema::new(columns)?)
            }
            PhysicalNode::FilterExec { input, .. }
            | PhysicalNode::OrderByExec { input, .. }
            | PhysicalNode::SkipExec { input, .. }
            | PhysicalNode::TakeExec { input, .. }
            | PhysicalNode::DistinctExec { input } => input.schema(),
            PhysicalNode::ProjectExec { input, items } => {
                let type_env = match input {
                    Some(input) => input.schema()?.type_map(),
                    None => BTreeMap::new(),
                };
                Ok(Schema::new(
                    items
                        .iter()
                        .map(|(name, expr)| (name.clone(), evaluator.type_of(expr, &type_env)))
                        .collect(),
                )?)
            }
            PhysicalNode::JoinExec { left, right } => {
                Ok(join_schema(&left.schema()?, &right.schema()?)?)
            }
            PhysicalNode::CreateExec { input, nodes, rels } => {
                let mut columns = match input {
                    Some(input) => input.schema()?.columns().to_vec(),
                    None => Vec::new(),
                };
                for item in nodes {
                    if let Some(column) = &item.column {
                        columns.push((column.clone(), CypherType::Node));
                    }
                }
                for item in rels {
                    if let Some(column) = &item.column {
                        columns.push((column.clone(), CypherType::Relationship));
                    }
                }
                Ok(Schema::new(columns)?)
            }
            PhysicalNode::EmptyExec { columns } => Ok(Schema::new(columns.clone())?),
        }
    }

    /// Materialize this node as a lazy frame.
    pub fn execute(&self, ctx: &Arc<ExecContext>) -> Result<DataFrame, EngineError> {
        match self {
            PhysicalNode::NodeScanExec {
                filter, predicate, ..
            } => {
                let schema = self.schema()?;
                let node_filter = build_node_filter(filter, ctx)?;
                let model = Arc::clone(&ctx.model);
                let frame = DataFrame::new(
                    schema,
                    Arc::new(move || {
                        let filter = node_filter.clone();
                        Box::new(model.nodes_filtered(&filter).map(|item| {
                            item.map(|node| vec![Value::Node(node)])
                                .map_err(EngineError::from)
                        }))
                    }),
                );
                Ok(self.apply_predicate(frame, predicate.as_ref(), ctx))
            }
            PhysicalNode::TripleScanExec {
                start,
                rel,
                end,
                direction,
                predicate,
                ..
            } => {
                let schema = self.schema()?;
                let start_filter = build_node_filter(start, ctx)?;
                let rel_filter = build_rel_filter(rel, ctx)?;
                let end_filter = build_node_filter(end, ctx)?;
                let direction = *direction;
                let model = Arc::clone(&ctx.model);
                let frame = DataFrame::new(
                    schema,
                    Arc::new(move || {
                        let start = start_filter.clone();
                        let rel = rel_filter.clone();
                        let end = end_filter.clone();
                        Box::new(model.paths(&start, &rel, &end, direction).map(|item| {
                            item.map(|triple| {
                                vec![
                                    Value::Node(triple.start),
                                    Value::Relationship(triple.rel),
                                    Value::Node(triple.end),
                                ]
                            })
                            .map_err(EngineError::from)
                        }))
                    }),
                );
                Ok(self.apply_predicate(frame, predicate.as_ref(), ctx))
            }
            PhysicalNode::ExpandExec {
                input,
                from_variable,
                rel,
                to,
                direction,
                ..
            } => {
                let input_frame = input.execute(ctx)?;
                let schema = self.schema()?;
                let from_index = input_frame
                    .schema()
                    .index_of(from_variable)
                    .ok_or_else(|| SchemaError::unknown_column(from_variable))?;
                let rel_filter = build_rel_filter(rel, ctx)?;
                let end_filter = build_node_filter(to, ctx)?;
                let direction = *direction;
                let from_variable = from_variable.clone();
                let model = Arc::clone(&ctx.model);
                Ok(DataFrame::new(
                    schema,
                    Arc::new(move || {
                        let model = Arc::clone(&model);
                        let rel_filter = rel_filter.clone();
                        let end_filter = end_filter.clone();
                        let from_variable = from_variable.clone();
                        Box::new(input_frame.records().flat_map(move |item| {
                            let out: Vec<Result<Row, EngineError>> = match item {
                                Err(e) => vec![Err(e)],
                                Ok(row) => match &row[from_index] {
                                    Value::Node(node) => model
                                        .expand_filtered(
                                            node.id,
                                            direction,
                                            &rel_filter,
                                            &end_filter,
                                        )
                                        .map(|expanded| match expanded {
                                            Ok(triple) => {
                                                let mut out_row = row.clone();
                                                out_row.push(Value::Relationship(triple.rel));
                                                out_row.push(Value::Node(triple.end));
                                                Ok(out_row)
                                            }
                                            Err(e) => Err(e.into()),
                                        })
                                        .collect(),
                                    Value::Null => Vec::new(),
                                    other => vec![Err(EvaluationError::new(
                                        &from_variable,
                                        format!("expansion over {}", other.cypher_type()),
                                    )
                                    .into())],
                                },
                            };
                            out
                        }))
                    }),
                ))
            }
            PhysicalNode::FilterExec { input, predicate } => {
                let frame = input.execute(ctx)?;
                Ok(ctx.ops.filter(&frame, predicate, ctx.evaluator, &ctx.params))
            }
            PhysicalNode::ProjectExec { input, items } => {
                let frame = match input {
                    Some(input) => input.execute(ctx)?,
                    None => DataFrame::unit(),
                };
                Ok(ctx.ops.project(&frame, items, ctx.evaluator, &ctx.params)?)
            }
            PhysicalNode::OrderByExec { input, keys } => {
                let frame = input.execute(ctx)?;
                Ok(ctx.ops.order_by(&frame, keys.as_deref())?)
            }
            PhysicalNode::SkipExec { input, count } => {
                let frame = input.execute(ctx)?;
                let count = eval_count(count, ctx, "SKIP")?;
                Ok(ctx.ops.skip(&frame, count))
            }
            PhysicalNode::TakeExec { input, count } => {
                let frame = input.execute(ctx)?;
                let count = eval_count(count, ctx, "LIMIT")?;
                Ok(ctx.ops.take(&frame, count))
            }
            PhysicalNode::JoinExec { left, right } => {
                let left = left.execute(ctx)?;
                let right = right.execute(ctx)?;
                Ok(ctx.ops.join(&left, &right)?)
            }
            PhysicalNode::DistinctExec { input } => {
                let frame = input.execute(ctx)?;
                Ok(ctx.ops.distinct(&frame))
            }
            PhysicalNode::CreateExec { input, nodes, rels } => {
                self.execute_create(input.as_deref(), nodes, rels, ctx)
            }
            PhysicalNode::EmptyExec { .. } => Ok(DataFrame::empty(self.schema()?)),
        }
    }

    fn apply_predicate(
        &self,
        frame: DataFrame,
        predicate: Option<&Expression>,
        ctx: &Arc<ExecContext>,
    ) -> DataFrame {
        match predicate {
            Some(predicate) => ctx.ops.filter(&frame, predicate, ctx.evaluator, &ctx.params),
            None => frame,
        }
    }

    /// Creation is eager: the frame it returns replays a buffer, so
    /// re-iterating a result never creates elements twice.
    fn execute_create(
        &self,
        input: Option<&PhysicalNode>,
        node_items: &[CreateNodeItem],
        rel_items: &[CreateRelItem],
        ctx: &Arc<ExecContext>,
    ) -> Result<DataFrame, EngineError> {
        let input_frame = match input {
            Some(input) => input.execute(ctx)?,
            None => DataFrame::unit(),
        };
        let schema = self.schema()?;
        let input_names = input_frame.schema().names();

        let mut out_rows: Vec<Row> = Vec::new();
        for item in input_frame.records() {
            let row = item?;
            let scope = EvalScope::new(&input_names, &row, &ctx.params);

            let mut node_specs = Vec::with_capacity(node_items.len());
            for item in node_items {
                let mut properties = BTreeMap::new();
                for (key, expr) in &item.properties {
                    properties.insert(key.clone(), ctx.evaluator.eval(expr, &scope)?);
                }
                node_specs.push(NodeSpec {
                    labels: item.labels.clone(),
                    properties,
                });
            }

            let mut rel_specs = Vec::with_capacity(rel_items.len());
            for item in rel_items {
                let mut properties = BTreeMap::new();
                for (key, expr) in &item.properties {
                    properties.insert(key.clone(), ctx.evaluator.eval(expr, &scope)?);
                }
                let resolve = |endpoint: &CreateEndpoint| -> Result<EndpointRef, EngineError> {
                    match endpoint {
                        CreateEndpoint::New(index) => Ok(EndpointRef::Created(*index)),
                        CreateEndpoint::Bound(column) => {
                            let index = input_frame
                                .schema()
                                .index_of(column)
                                .ok_or_else(|| SchemaError::unknown_column(column))?;
                            match &row[index] {
                                Value::Node(node) => Ok(EndpointRef::Existing(node.id)),
                                other => Err(PlanError::new(format!(
                                    "CREATE endpoint `{}` is bound to {}, not a node",
                                    column,
                                    other.cypher_type()
                                ))
                                .into()),
                            }
                        }
                    }
                };
                rel_specs.push(RelSpec {
                    rel_type: item.rel_type.clone(),
                    start: resolve(&item.start)?,
                    end: resolve(&item.end)?,
                    properties,
                });
            }

            let mut out_row = row.clone();
            ctx.model
                .create_elements(node_specs, rel_specs, &mut |created| {
                    for (index, item) in node_items.iter().enumerate() {
                        if item.column.is_some() {
                            out_row.push(Value::Node(created.nodes[index].clone()));
                        }
                    }
                    for (index, item) in rel_items.iter().enumerate() {
                        if item.column.is_some() {
                            out_row
                                .push(Value::Relationship(created.relationships[index].clone()));
                        }
                    }
                })?;
            out_rows.push(out_row);
        }
        log::debug!("created elements for {} binding rows", out_rows.len());
        Ok(DataFrame::from_rows(schema, out_rows))
    }
}

fn eval_count(
    expr: &Expression,
    ctx: &Arc<ExecContext>,
    clause: &str,
) -> Result<usize, EngineError> {
    let scope = EvalScope::params_only(&ctx.params);
    match ctx.evaluator.eval(expr, &scope)? {
        Value::Integer(n) if n >= 0 => Ok(n as usize),
        other => Err(EvaluationError::new(
            expr,
            format!("{} requires a non-negative integer, got {}", clause, other),
        )
        .into()),
    }
}

fn build_node_filter(
    filter: &NodeFilterExpr,
    ctx: &Arc<ExecContext>,
) -> Result<NodeFilter, EngineError> {
    let scope = EvalScope::params_only(&ctx.params);
    let mut properties = BTreeMap::new();
    for (key, expr) in &filter.properties {
        properties.insert(key.clone(), ctx.evaluator.eval(expr, &scope)?);
    }
    Ok(NodeFilter {
        labels: filter.labels.clone(),
        properties,
    })
}

fn build_rel_filter(
    filter: &RelFilterExpr,
    ctx: &Arc<ExecContext>,
) -> Result<RelationshipFilter, EngineError> {
    let scope = EvalScope::params_only(&ctx.params);
    let mut properties = BTreeMap::new();
    for (key, expr) in &filter.properties {
        properties.insert(key.clone(), ctx.evaluator.eval(expr, &scope)?);
    }
    Ok(RelationshipFilter {
        types: filter.types.clone(),
        properties,
    })
}

impl TreeRender for PhysicalNode {
    fn label(&self) -> String {
        match self {
            PhysicalNode::NodeScanExec {
                variable,
                filter,
                predicate,
            } => {
                let mut label = format!("NodeScan({}{})", variable, filter.label_suffix());
                if let Some(predicate) = predicate {
                    label.push_str(&format!(" where {}", predicate));
                }
                label
            }
            PhysicalNode::TripleScanExec {
                start_variable,
                rel_variable,
                end_variable,
                start,
                rel,
                end,
                direction,
                predicate,
            } => {
                let mut label = format!(
                    "TripleScan(({}{})-[{}{}]-({}{}), {})",
                    start_variable,
                    start.label_suffix(),
                    rel_variable,
                    rel.label_suffix(),
                    end_variable,
                    end.label_suffix(),
                    direction
                );
                if let Some(predicate) = predicate {
                    label.push_str(&format!(" where {}", predicate));
                }
                label
            }
            PhysicalNode::ExpandExec {
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
            PhysicalNode::FilterExec { predicate, .. } => format!("Filter({})", predicate),
            PhysicalNode::ProjectExec { items, .. } => format!(
                "Project({})",
                items
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            PhysicalNode::OrderByExec { keys, .. } => match keys {
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
            PhysicalNode::SkipExec { count, .. } => format!("Skip({})", count),
            PhysicalNode::TakeExec { count, .. } => format!("Take({})", count),
            PhysicalNode::JoinExec { .. } => "HashJoin".to_string(),
            PhysicalNode::DistinctExec { .. } => "Distinct".to_string(),
            PhysicalNode::CreateExec { nodes, rels, .. } => {
                format!("Create({} nodes, {} relationships)", nodes.len(), rels.len())
            }
            PhysicalNode::EmptyExec { .. } => "Empty".to_string(),
        }
    }

    fn children(&self) -> Vec<&dyn TreeRender> {
        match self {
            PhysicalNode::NodeScanExec { .. }
            | PhysicalNode::TripleScanExec { .. }
            | PhysicalNode::EmptyExec { .. } => Vec::new(),
            PhysicalNode::ExpandExec { input, .. }
            | PhysicalNode::FilterExec { input, .. }
            | PhysicalNode::OrderByExec { input, .. }
            | PhysicalNode::SkipExec { input, .. }
            | PhysicalNode::TakeExec { input, .. }
            | PhysicalNode::DistinctExec { input } => vec![input.as_ref()],
            PhysicalNode::ProjectExec { input, .. } | PhysicalNode::CreateExec { input, .. } => {
                input.iter().map(|n| n.as_ref() as &dyn TreeRender).collect()
            }
            PhysicalNode::JoinExec { left, right } => vec![left.as_ref(), right.as_ref()],
        }
    }
}
