// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The data-frame operator set.
//!
//! Every operator builds a new frame whose schema is computed eagerly
//! and whose record producer is deferred. Only `distinct`, `order_by`,
//! the join build side and explicit caching buffer records; everything
//! else streams.

use super::{DataFrame, Row, RowStream, Schema, SchemaError};
use crate::ast::Expression;
use crate::error::EngineError;
use crate::eval::{EvalScope, Evaluator, ParamEnv};
use crate::model::{RelId, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Stateless operator value shared by all plans of one runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataFrameOps;

impl DataFrameOps {
    pub fn new() -> Self {
        Self
    }

    /// Column selection with optional aliasing. The result schema uses
    /// the alias when present and keeps the source column's type.
    pub fn select(
        &self,
        df: &DataFrame,
        columns: &[(String, Option<String>)],
    ) -> Result<DataFrame, SchemaError> {
        let mut indices = Vec::with_capacity(columns.len());
        let mut out_columns = Vec::with_capacity(columns.len());
        for (source, alias) in columns {
            let index = df
                .schema()
                .index_of(source)
                .ok_or_else(|| SchemaError::unknown_column(source))?;
            let (_, ty) = &df.schema().columns()[index];
            indices.push(index);
            out_columns.push((alias.clone().unwrap_or_else(|| source.clone()), ty.clone()));
        }
        let schema = Schema::new(out_columns)?;
        let input = df.clone();
        let indices = Arc::new(indices);
        Ok(DataFrame::new(
            schema,
            Arc::new(move || {
                let indices = Arc::clone(&indices);
                Box::new(input.records().map(move |item| {
                    item.map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                }))
            }),
        ))
    }

    /// Projection: each output column is an expression over the input
    /// row's bindings. Output types come from static inference.
    pub fn project(
        &self,
        df: &DataFrame,
        items: &[(String, Expression)],
        evaluator: Evaluator,
        params: &Arc<ParamEnv>,
    ) -> Result<DataFrame, SchemaError> {
        let type_env = df.schema().type_map();
        let schema = Schema::new(
            items
                .iter()
                .map(|(name, expr)| (name.clone(), evaluator.type_of(expr, &type_env)))
                .collect(),
        )?;
        let input = df.clone();
        let names = Arc::new(df.schema().names());
        let items: Arc<Vec<(String, Expression)>> = Arc::new(items.to_vec());
        let params = Arc::clone(params);
        Ok(DataFrame::new(
            schema,
            Arc::new(move || {
                let names = Arc::clone(&names);
                let items = Arc::clone(&items);
                let params = Arc::clone(&params);
                Box::new(input.records().map(move |item| {
                    let row = item?;
                    let scope = EvalScope::new(&names, &row, &params);
                    let mut out = Vec::with_capacity(items.len());
                    for (_, expr) in items.iter() {
                        out.push(evaluator.eval(expr, &scope)?);
                    }
                    Ok(out)
                }))
            }),
        ))
    }

    /// Keep rows for which the predicate evaluates to logical true.
    /// Null and false are indistinguishable downstream.
    pub fn filter(
        &self,
        df: &DataFrame,
        predicate: &Expression,
        evaluator: Evaluator,
        params: &Arc<ParamEnv>,
    ) -> DataFrame {
        let input = df.clone();
        let names = Arc::new(df.schema().names());
        let predicate = predicate.clone();
        let params = Arc::clone(params);
        DataFrame::new(
            df.schema().clone(),
            Arc::new(move || {
                let names = Arc::clone(&names);
                let predicate = predicate.clone();
                let params = Arc::clone(&params);
                Box::new(input.records().filter_map(move |item| match item {
                    Err(e) => Some(Err(e)),
                    Ok(row) => {
                        let scope = EvalScope::new(&names, &row, &params);
                        match evaluator.eval(&predicate, &scope) {
                            Ok(Value::Boolean(true)) => Some(Ok(row)),
                            Ok(_) => None,
                            Err(e) => Some(Err(e.into())),
                        }
                    }
                }))
            }),
        )
    }

    /// Drop the first `count` rows.
    pub fn skip(&self, df: &DataFrame, count: usize) -> DataFrame {
        let input = df.clone();
        DataFrame::new(
            df.schema().clone(),
            Arc::new(move || Box::new(input.records().skip(count))),
        )
    }

    /// Keep only the first `count` rows.
    pub fn take(&self, df: &DataFrame, count: usize) -> DataFrame {
        let input = df.clone();
        DataFrame::new(
            df.schema().clone(),
            Arc::new(move || Box::new(input.records().take(count))),
        )
    }

    /// Emit each distinct row once, preserving first-occurrence order.
    pub fn distinct(&self, df: &DataFrame) -> DataFrame {
        let input = df.clone();
        DataFrame::new(
            df.schema().clone(),
            Arc::new(move || {
                let mut seen: HashSet<Row> = HashSet::new();
                Box::new(input.records().filter(move |item| match item {
                    Ok(row) => seen.insert(row.clone()),
                    Err(_) => true,
                }))
            }),
        )
    }

    /// Stable sort over the named key columns. `None` sorts by all
    /// columns ascending. Null sorts greater than any non-null value
    /// under an ascending key (and first under a descending one).
    pub fn order_by(
        &self,
        df: &DataFrame,
        keys: Option<&[(String, bool)]>,
    ) -> Result<DataFrame, SchemaError> {
        let resolved: Vec<(usize, bool)> = match keys {
            None => (0..df.schema().len()).map(|i| (i, true)).collect(),
            Some(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (name, ascending) in items {
                    let index = df
                        .schema()
                        .index_of(name)
                        .ok_or_else(|| SchemaError::unknown_column(name))?;
                    resolved.push((index, *ascending));
                }
                resolved
            }
        };
        let input = df.clone();
        let resolved = Arc::new(resolved);
        Ok(DataFrame::new(
            df.schema().clone(),
            Arc::new(move || {
                let keys = Arc::clone(&resolved);
                match input.collect() {
                    Err(e) => Box::new(std::iter::once(Err(e))) as RowStream,
                    Ok(mut rows) => {
                        rows.sort_by(|a, b| {
                            for &(index, ascending) in keys.iter() {
                                let ord = a[index].total_cmp(&b[index]);
                                let ord = if ascending { ord } else { ord.reverse() };
                                if !ord.is_eq() {
                                    return ord;
                                }
                            }
                            std::cmp::Ordering::Equal
                        });
                        Box::new(rows.into_iter().map(Ok))
                    }
                }
            }),
        ))
    }

    /// Inner equi-join on the intersection of column names. The left
    /// side is materialized into a hash table and the right side is
    /// streamed and probed, so output order is the right side's order.
    /// Result schema is `left ++ (right - joinCols)`.
    ///
    /// Rows whose output would carry the same relationship identity in
    /// two positions are dropped: distinct pattern relationships must
    /// bind to distinct edges.
    pub fn join(&self, left: &DataFrame, right: &DataFrame) -> Result<DataFrame, SchemaError> {
        let mut join_cols: Vec<String> = Vec::new();
        let mut left_key_indices: Vec<usize> = Vec::new();
        let mut right_key_indices: Vec<usize> = Vec::new();
        for (i, (name, _)) in left.schema().columns().iter().enumerate() {
            if let Some(j) = right.schema().index_of(name) {
                join_cols.push(name.clone());
                left_key_indices.push(i);
                right_key_indices.push(j);
            }
        }
        let right_keep_indices: Vec<usize> = right
            .schema()
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| !join_cols.contains(name))
            .map(|(i, _)| i)
            .collect();

        let mut out_columns = left.schema().columns().to_vec();
        for &i in &right_keep_indices {
            out_columns.push(right.schema().columns()[i].clone());
        }
        let schema = Schema::new(out_columns)?;

        let left = left.clone();
        let right = right.clone();
        let left_key_indices = Arc::new(left_key_indices);
        let right_key_indices = Arc::new(right_key_indices);
        let right_keep_indices = Arc::new(right_keep_indices);

        Ok(DataFrame::new(
            schema,
            Arc::new(move || {
                let left_keys = Arc::clone(&left_key_indices);
                let right_keys = Arc::clone(&right_key_indices);
                let right_keep = Arc::clone(&right_keep_indices);

                let mut table: HashMap<Vec<Value>, Vec<Row>> = HashMap::new();
                for item in left.records() {
                    match item {
                        Err(e) => return Box::new(std::iter::once(Err(e))) as RowStream,
                        Ok(row) => {
                            let key: Vec<Value> =
                                left_keys.iter().map(|&i| row[i].clone()).collect();
                            table.entry(key).or_default().push(row);
                        }
                    }
                }

                Box::new(right.records().flat_map(move |item| {
                    let out: Vec<Result<Row, EngineError>> = match item {
                        Err(e) => vec![Err(e)],
                        Ok(row) => {
                            let key: Vec<Value> =
                                right_keys.iter().map(|&i| row[i].clone()).collect();
                            match table.get(&key) {
                                None => Vec::new(),
                                Some(matches) => matches
                                    .iter()
                                    .filter_map(|left_row| {
                                        let mut joined = left_row.clone();
                                        joined
                                            .extend(right_keep.iter().map(|&i| row[i].clone()));
                                        if has_duplicate_relationship(&joined) {
                                            None
                                        } else {
                                            Some(Ok(joined))
                                        }
                                    })
                                    .collect(),
                            }
                        }
                    };
                    out.into_iter()
                }))
            }),
        ))
    }

    /// Concatenate two frames with identical schemas.
    pub fn union_all(&self, a: &DataFrame, b: &DataFrame) -> Result<DataFrame, SchemaError> {
        if a.schema() != b.schema() {
            return Err(SchemaError::new("union over mismatched schemas"));
        }
        let a = a.clone();
        let b = b.clone();
        Ok(DataFrame::new(
            a.schema().clone(),
            Arc::new(move || Box::new(a.records().chain(b.records()))),
        ))
    }

    /// Materialize once; the returned frame replays its buffer.
    pub fn cache(&self, df: &DataFrame) -> Result<DataFrame, EngineError> {
        df.cached()
    }
}

fn has_duplicate_relationship(row: &[Value]) -> bool {
    let mut seen: HashSet<RelId> = HashSet::new();
    for value in row {
        if let Value::Relationship(rel) = value {
            if !seen.insert(rel.id) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::super::testutil::frame;
    use super::*;
    use crate::ast::{BinaryOp, Literal};
    use crate::model::{CypherType, NodeId, Relationship};

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    fn ops() -> DataFrameOps {
        DataFrameOps::new()
    }

    #[test]
    fn select_identity_preserves_rows() {
        let df = frame(
            &[("a", CypherType::Integer), ("b", CypherType::Integer)],
            vec![ints(&[1, 2]), ints(&[3, 4])],
        );
        let selected = ops()
            .select(&df, &[("a".into(), None), ("b".into(), None)])
            .unwrap();
        assert_eq!(selected.schema(), df.schema());
        assert_eq!(selected.collect().unwrap(), df.collect().unwrap());
    }

    #[test]
    fn select_alias_renames_and_keeps_type() {
        let df = frame(&[("a", CypherType::Integer)], vec![ints(&[1])]);
        let selected = ops()
            .select(&df, &[("a".into(), Some("renamed".into()))])
            .unwrap();
        assert_eq!(selected.schema().columns()[0].0, "renamed");
        assert_eq!(selected.schema().columns()[0].1, CypherType::Integer);
    }

    #[test]
    fn select_unknown_column_is_schema_error() {
        let df = frame(&[("a", CypherType::Integer)], vec![]);
        assert!(ops().select(&df, &[("missing".into(), None)]).is_err());
    }

    #[test]
    fn project_evaluates_with_row_bindings() {
        let df = frame(&[("a", CypherType::Integer)], vec![ints(&[2]), ints(&[5])]);
        let params = Arc::new(ParamEnv::empty());
        let doubled = Expression::binary(
            Expression::variable("a"),
            BinaryOp::Multiply,
            Expression::Literal(Literal::Integer(2)),
        );
        let projected = ops()
            .project(
                &df,
                &[("doubled".into(), doubled)],
                Evaluator::new(),
                &params,
            )
            .unwrap();
        assert_eq!(projected.schema().columns()[0].1, CypherType::Integer);
        assert_eq!(
            projected.collect().unwrap(),
            vec![ints(&[4]), ints(&[10])]
        );
    }

    #[test]
    fn filter_drops_null_and_false() {
        let df = frame(
            &[("a", CypherType::Integer)],
            vec![ints(&[1]), vec![Value::Null], ints(&[3])],
        );
        let params = Arc::new(ParamEnv::empty());
        let predicate = Expression::binary(
            Expression::variable("a"),
            BinaryOp::Gt,
            Expression::Literal(Literal::Integer(2)),
        );
        let filtered = ops().filter(&df, &predicate, Evaluator::new(), &params);
        // a = null compares to null; a = 1 compares false. Only a = 3 survives.
        assert_eq!(filtered.collect().unwrap(), vec![ints(&[3])]);
    }

    #[test]
    fn skip_take_slice_the_stream() {
        let df = frame(
            &[("a", CypherType::Integer)],
            (1..=5).map(|i| ints(&[i])).collect(),
        );
        let sliced = ops().take(&ops().skip(&df, 1), 2);
        assert_eq!(sliced.collect().unwrap(), vec![ints(&[2]), ints(&[3])]);

        assert!(ops().skip(&df, 99).collect().unwrap().is_empty());
        assert!(ops().take(&df, 0).collect().unwrap().is_empty());
        assert_eq!(ops().take(&df, 99).collect().unwrap().len(), 5);
    }

    #[test]
    fn distinct_preserves_first_occurrence_order() {
        let df = frame(
            &[("a", CypherType::Integer)],
            vec![ints(&[2]), ints(&[1]), ints(&[2]), ints(&[3]), ints(&[1])],
        );
        let distinct = ops().distinct(&df);
        assert_eq!(
            distinct.collect().unwrap(),
            vec![ints(&[2]), ints(&[1]), ints(&[3])]
        );
        // Re-iteration starts from a fresh seen-set.
        assert_eq!(distinct.collect().unwrap().len(), 3);
    }

    #[test]
    fn order_by_is_stable() {
        let df = frame(
            &[("name", CypherType::String), ("rank", CypherType::Integer)],
            vec![
                vec![Value::String("a".into()), Value::Integer(1)],
                vec![Value::String("b".into()), Value::Integer(1)],
                vec![Value::String("c".into()), Value::Integer(1)],
            ],
        );
        let sorted = ops()
            .order_by(&df, Some(&[("rank".into(), true)]))
            .unwrap();
        let names: Vec<Value> = sorted
            .collect()
            .unwrap()
            .into_iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(
            names,
            vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("c".into()),
            ]
        );
    }

    #[test]
    fn order_by_sorts_nulls_last_ascending() {
        let df = frame(
            &[("a", CypherType::Integer)],
            vec![vec![Value::Null], ints(&[2]), ints(&[1])],
        );
        let sorted = ops().order_by(&df, None).unwrap();
        assert_eq!(
            sorted.collect().unwrap(),
            vec![ints(&[1]), ints(&[2]), vec![Value::Null]]
        );
    }

    #[test]
    fn order_by_descending_reverses_keys() {
        let df = frame(
            &[("a", CypherType::Integer)],
            vec![ints(&[1]), ints(&[3]), ints(&[2])],
        );
        let sorted = ops()
            .order_by(&df, Some(&[("a".into(), false)]))
            .unwrap();
        assert_eq!(
            sorted.collect().unwrap(),
            vec![ints(&[3]), ints(&[2]), ints(&[1])]
        );
    }

    #[test]
    fn join_on_shared_columns() {
        let left = frame(
            &[("k", CypherType::Integer), ("l", CypherType::Integer)],
            vec![ints(&[1, 10]), ints(&[2, 20])],
        );
        let right = frame(
            &[("k", CypherType::Integer), ("r", CypherType::Integer)],
            vec![ints(&[2, 200]), ints(&[1, 100]), ints(&[3, 300])],
        );
        let joined = ops().join(&left, &right).unwrap();
        assert_eq!(
            joined.schema().names(),
            vec!["k".to_string(), "l".to_string(), "r".to_string()]
        );
        // Probe-side (right) order wins.
        assert_eq!(
            joined.collect().unwrap(),
            vec![ints(&[2, 20, 200]), ints(&[1, 10, 100])]
        );
    }

    #[test]
    fn join_drops_duplicate_relationship_rows() {
        let rel = |id: u64| {
            Value::Relationship(Relationship::new(
                crate::model::RelId(id),
                Some("KNOWS".into()),
                NodeId(1),
                NodeId(2),
            ))
        };
        let left = frame(
            &[("k", CypherType::Integer), ("r1", CypherType::Relationship)],
            vec![vec![Value::Integer(1), rel(10)]],
        );
        let right = frame(
            &[("k", CypherType::Integer), ("r2", CypherType::Relationship)],
            vec![
                vec![Value::Integer(1), rel(10)],
                vec![Value::Integer(1), rel(11)],
            ],
        );
        let joined = ops().join(&left, &right).unwrap();
        let rows = joined.collect().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], rel(11));
    }

    #[test]
    fn join_without_shared_columns_is_cartesian() {
        let left = frame(&[("a", CypherType::Integer)], vec![ints(&[1]), ints(&[2])]);
        let right = frame(&[("b", CypherType::Integer)], vec![ints(&[3]), ints(&[4])]);
        let joined = ops().join(&left, &right).unwrap();
        assert_eq!(joined.collect().unwrap().len(), 4);
    }

    #[test]
    fn union_all_concatenates_matching_schemas() {
        let a = frame(&[("a", CypherType::Integer)], vec![ints(&[1])]);
        let b = frame(&[("a", CypherType::Integer)], vec![ints(&[2])]);
        let union = ops().union_all(&a, &b).unwrap();
        assert_eq!(union.collect().unwrap(), vec![ints(&[1]), ints(&[2])]);

        let mismatched = frame(&[("b", CypherType::Integer)], vec![]);
        assert!(ops().union_all(&a, &mismatched).is_err());
    }

    #[test]
    fn cache_returns_a_replaying_frame() {
        let df = frame(&[("a", CypherType::Integer)], vec![ints(&[1]), ints(&[2])]);
        let cached = ops().cache(&df).unwrap();
        assert_eq!(cached.collect().unwrap(), cached.collect().unwrap());
        assert_eq!(cached.schema(), df.schema());
    }
}
