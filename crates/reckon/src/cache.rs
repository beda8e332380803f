//! Bounded expression caches
//!
//! Two ordered maps share one keyspace: expression text → parsed AST, and
//! expression text → extracted dependency set. Eviction is FIFO of the
//! oldest ~10% and removes from both maps in lockstep.

use indexmap::{IndexMap, IndexSet};
use log::debug;
use reckon_formula::Expr;
use std::sync::Arc;

/// Cache statistics as reported by `Engine::cache_stats`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

pub(crate) struct ExpressionCache {
    enabled: bool,
    max_size: usize,
    asts: IndexMap<String, Arc<Expr>>,
    deps: IndexMap<String, IndexSet<String>>,
    hits: u64,
    misses: u64,
}

impl ExpressionCache {
    pub fn new(enabled: bool, max_size: usize) -> Self {
        Self {
            enabled,
            max_size: max_size.max(1),
            asts: IndexMap::new(),
            deps: IndexMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_ast(&mut self, expression: &str) -> Option<Arc<Expr>> {
        if !self.enabled {
            return None;
        }
        match self.asts.get(expression) {
            Some(ast) => {
                self.hits += 1;
                Some(Arc::clone(ast))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert_ast(&mut self, expression: &str, ast: Arc<Expr>) {
        if !self.enabled {
            return;
        }
        if self.asts.len() >= self.max_size {
            self.evict_oldest();
        }
        self.asts.insert(expression.to_string(), ast);
    }

    pub fn get_deps(&mut self, expression: &str) -> Option<IndexSet<String>> {
        if !self.enabled {
            return None;
        }
        match self.deps.get(expression) {
            Some(deps) => {
                self.hits += 1;
                Some(deps.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert_deps(&mut self, expression: &str, deps: IndexSet<String>) {
        if !self.enabled {
            return;
        }
        self.deps.insert(expression.to_string(), deps);
    }

    /// FIFO eviction of the oldest ~10%, dependency entries in lockstep
    fn evict_oldest(&mut self) {
        let count = (self.max_size / 10).max(1);
        for _ in 0..count {
            match self.asts.shift_remove_index(0) {
                Some((key, _)) => {
                    self.deps.shift_remove(&key);
                }
                None => break,
            }
        }
        debug!("expression cache evicted {} oldest entries", count);
    }

    pub fn clear(&mut self) {
        self.asts.clear();
        self.deps.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            size: self.asts.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_formula::parse_expression;

    fn ast(source: &str) -> Arc<Expr> {
        Arc::new(parse_expression(source).unwrap())
    }

    #[test]
    fn test_hit_miss_accounting() {
        let mut cache = ExpressionCache::new(true, 10);
        assert!(cache.get_ast("1 + 1").is_none());
        cache.insert_ast("1 + 1", ast("1 + 1"));
        assert!(cache.get_ast("1 + 1").is_some());

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fifo_eviction_drops_oldest_tenth() {
        let mut cache = ExpressionCache::new(true, 10);
        for i in 0..10 {
            let key = format!("{} + 0", i);
            cache.insert_ast(&key, ast(&key));
            cache.insert_deps(&key, IndexSet::new());
        }
        // the next insert evicts the single oldest entry (10 / 10 = 1)
        cache.insert_ast("99 + 0", ast("99 + 0"));
        assert!(cache.get_ast("0 + 0").is_none());
        assert!(cache.get_ast("1 + 0").is_some());
        assert!(cache.get_deps("0 + 0").is_none());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let mut cache = ExpressionCache::new(false, 10);
        cache.insert_ast("1", ast("1"));
        assert!(cache.get_ast("1").is_none());
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut cache = ExpressionCache::new(true, 10);
        cache.insert_ast("1", ast("1"));
        let _ = cache.get_ast("1");
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
