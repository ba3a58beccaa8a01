// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runner configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// How aggressively the physical optimizer rewrites plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationLevel {
    /// Direct translation, no rewrites.
    None,
    /// Predicate pushdown, constant-filter folding, skip/take elision.
    Basic,
    /// Basic plus pushdown through expansions.
    Advanced,
}

/// Tunables for a [`crate::Runner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Bounded LRU capacity of the parse cache.
    pub parse_cache_capacity: NonZeroUsize,
    /// Fixpoint bound for the optimizer rule loop.
    pub max_optimizer_passes: usize,
    pub optimization_level: OptimizationLevel,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parse_cache_capacity: NonZeroUsize::new(256).expect("non-zero"),
            max_optimizer_passes: 16,
            optimization_level: OptimizationLevel::Basic,
        }
    }
}
