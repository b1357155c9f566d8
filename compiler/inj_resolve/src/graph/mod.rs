//! Injection graphs: the resolved values of one call site.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::{DependencyResult, ResultKey, Success, ValueResult};
use crate::scope::ScopeId;

/// Resolved top-level requests of a call site and how often each value is
/// referenced.
#[derive(Clone, Debug)]
pub struct InjectionGraph {
    /// Scope the call site resolved from.
    pub scope: ScopeId,
    /// One entry per satisfied request, in request order.
    pub results: Vec<DependencyResult>,
    usages: FxHashMap<ResultKey, usize>,
}

impl InjectionGraph {
    pub fn new(scope: ScopeId, results: Vec<DependencyResult>) -> Self {
        let usages = count_usages(&results);
        InjectionGraph {
            scope,
            results,
            usages,
        }
    }

    /// Number of edges pointing at `key`, cycle references included.
    pub fn usages(&self, key: &ResultKey) -> usize {
        self.usages.get(key).copied().unwrap_or(0)
    }

    /// Every value in the graph, each once, parents before children.
    pub fn values(&self) -> Vec<&ValueResult> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut stack: Vec<&ValueResult> = self
            .results
            .iter()
            .rev()
            .filter_map(|dependency| match &dependency.result {
                Success::Value(value) => Some(value.as_ref()),
                _ => None,
            })
            .collect();
        while let Some(value) = stack.pop() {
            if !seen.insert(&value.key) {
                continue;
            }
            out.push(value);
            for dependency in value.dependencies.iter().rev() {
                if let Success::Value(child) = &dependency.result {
                    stack.push(child);
                }
            }
        }
        out
    }
}

/// Count incoming edges per key.
///
/// Every edge counts, but the subtree below a key is walked only the first
/// time the key is reached; a shared value's own dependencies are evaluated
/// once however often it is used.
fn count_usages(results: &[DependencyResult]) -> FxHashMap<ResultKey, usize> {
    let mut usages = FxHashMap::default();
    let mut stack: Vec<&Success> = results.iter().rev().map(|d| &d.result).collect();
    while let Some(success) = stack.pop() {
        match success {
            Success::Value(value) => {
                let count = usages.entry(value.key.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    stack.extend(value.dependencies.iter().rev().map(|d| &d.result));
                }
            }
            Success::CircularDependency { key, .. } => {
                *usages.entry(key.clone()).or_insert(0) += 1;
            }
            Success::DefaultValue => {}
        }
    }
    usages
}
