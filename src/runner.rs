// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The host-facing runner facade.
//!
//! One [`Runner`] per graph model. Each `run` call compiles (through a
//! bounded LRU parse cache) and produces an independent lazy
//! [`QueryResult`]. The evaluator and operator values are stateless and
//! shared; the parse cache is the only mutable state and sits behind a
//! mutex.

use crate::ast::{self, ParsedQuery, Statement};
use crate::config::RunnerConfig;
use crate::error::EngineError;
use crate::eval::{Evaluator, ParamEnv};
use crate::frame::{DataFrame, DataFrameOps, RowStream, Schema};
use crate::model::{GraphModel, Value};
use crate::plan::{
    plan_physical, plan_statement, ExecContext, LogicalPlan, PhysicalOptimizer, PhysicalPlan,
    PlannerContext,
};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

/// Everything `compile` produces: the immutable parse result plus both
/// plan trees, all introspectable.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub parsed: Arc<ParsedQuery>,
    pub logical: LogicalPlan,
    pub physical: PhysicalPlan,
}

/// Compiles and runs queries against one graph model.
pub struct Runner {
    model: Arc<dyn GraphModel>,
    config: RunnerConfig,
    evaluator: Evaluator,
    ops: DataFrameOps,
    parse_cache: Mutex<LruCache<String, Arc<ParsedQuery>>>,
}

impl Runner {
    pub fn new(model: Arc<dyn GraphModel>) -> Self {
        Self::with_config(model, RunnerConfig::default())
    }

    pub fn with_config(model: Arc<dyn GraphModel>, config: RunnerConfig) -> Self {
        let parse_cache = Mutex::new(LruCache::new(config.parse_cache_capacity));
        Self {
            model,
            config,
            evaluator: Evaluator::new(),
            ops: DataFrameOps::new(),
            parse_cache,
        }
    }

    /// Parse through the cache. Hits return the same immutable AST
    /// handle; misses are memoized by exact query text.
    pub fn parse(&self, query: &str) -> Result<Arc<ParsedQuery>, EngineError> {
        if let Some(hit) = self.parse_cache.lock().get(query) {
            log::debug!("parse cache hit");
            return Ok(Arc::clone(hit));
        }
        let parsed = Arc::new(ast::parse(query)?);
        self.parse_cache
            .lock()
            .put(query.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Parse, plan and optimize without executing.
    pub fn compile(&self, query: &str) -> Result<Compiled, EngineError> {
        let parsed = self.parse(query)?;
        let mut planner_ctx = PlannerContext::new(Arc::new(parsed.semantics.clone()));
        let logical = plan_statement(&parsed.ast, &mut planner_ctx)?;
        let physical = plan_physical(&logical)?;
        let optimizer = PhysicalOptimizer::new(
            self.config.optimization_level,
            self.config.max_optimizer_passes,
        );
        let physical = optimizer.optimize(physical);
        log::debug!("physical plan:\n{}", physical.pretty());
        Ok(Compiled {
            parsed,
            logical,
            physical,
        })
    }

    /// Compile and execute. The result is lazy: rows materialize as the
    /// consumer drains them.
    pub fn run(
        &self,
        query: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<QueryResult, EngineError> {
        let compiled = self.compile(query)?;
        let env = ParamEnv::new(compiled.parsed.residual_params.clone(), params);
        let ctx = Arc::new(ExecContext {
            model: Arc::clone(&self.model),
            evaluator: self.evaluator,
            ops: self.ops,
            params: Arc::new(env),
        });
        let frame = compiled.physical.execute(&ctx)?;
        Ok(QueryResult::new(compiled, frame))
    }

    /// Convenience for hosts holding parameters as JSON: accepts an
    /// object and converts each entry to an engine value.
    pub fn run_json(
        &self,
        query: &str,
        params: &serde_json::Value,
    ) -> Result<QueryResult, EngineError> {
        let params = match params {
            serde_json::Value::Null => BTreeMap::new(),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
            other => {
                return Err(EngineError::Evaluation(crate::eval::EvaluationError::new(
                    "$params",
                    format!("parameter bag must be an object, got {}", other),
                )))
            }
        };
        self.run(query, params)
    }
}

/// A lazily evaluated tabular result with a declared schema.
#[derive(Debug)]
pub struct QueryResult {
    compiled: Compiled,
    frame: DataFrame,
    cached: bool,
}

impl QueryResult {
    fn new(compiled: Compiled, frame: DataFrame) -> Self {
        Self {
            compiled,
            frame,
            cached: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.frame.schema()
    }

    /// Fresh positional row iterator.
    pub fn rows(&self) -> RowStream {
        self.frame.records()
    }

    /// Fresh single-pass iterator of name-to-value maps.
    pub fn records(
        &self,
    ) -> Box<dyn Iterator<Item = Result<BTreeMap<String, Value>, EngineError>>> {
        let names = self.frame.schema().names();
        Box::new(self.frame.records().map(move |item| {
            item.map(|row| names.iter().cloned().zip(row).collect())
        }))
    }

    /// The current (possibly cached) frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Materialize once. Afterwards every iterator replays the buffer
    /// and the graph model is no longer consulted. Idempotent.
    pub fn cache(&mut self) -> Result<&DataFrame, EngineError> {
        if !self.cached {
            self.frame = self.frame.cached()?;
            self.cached = true;
        }
        Ok(&self.frame)
    }

    pub fn ast(&self) -> &Statement {
        &self.compiled.parsed.ast
    }

    pub fn logical_plan(&self) -> &LogicalPlan {
        &self.compiled.logical
    }

    pub fn physical_plan(&self) -> &PhysicalPlan {
        &self.compiled.physical
    }

    /// Format up to `limit` rows as a UTF-8 bordered table on stdout.
    pub fn show(&self, limit: Option<usize>) -> Result<(), EngineError> {
        self.show_to(limit, &mut io::stdout())
    }

    /// Format up to `limit` rows as a UTF-8 bordered table into `sink`.
    pub fn show_to(&self, limit: Option<usize>, sink: &mut dyn Write) -> Result<(), EngineError> {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        let header: Vec<Cell> = self
            .frame
            .schema()
            .columns()
            .iter()
            .map(|(name, _)| Cell::new(name))
            .collect();
        table.set_header(header);
        let limit = limit.unwrap_or(usize::MAX);
        for item in self.frame.records().take(limit) {
            let row = item?;
            let cells: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            table.add_row(cells);
        }
        writeln!(sink, "{table}")?;
        Ok(())
    }
}
