//! The engine facade
//!
//! Ties the language crates together: parse-with-cache, single evaluation
//! with a structured result envelope, dependency-ordered batch evaluation
//! with rounding and error policies, and execution-free validation.

use crate::batch::{BatchOptions, BatchResult, EvalResult, FormulaDefinition, ValidationReport};
use crate::cache::{CacheStats, ExpressionCache};
use crate::config::{EngineConfig, ErrorPolicy, RoundingPolicy};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use reckon_core::{decimal, EngineError, EngineResult, Value};
use reckon_formula::functions::{FunctionDef, FunctionRegistry};
use reckon_formula::{
    extract_dependencies, extract_function_names, DependencyGraph, EvaluationContext, Evaluator,
    EvaluatorOptions, Expr, Lexer, Parser,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;

// prefix characters that would collide with the grammar
const RESERVED_PREFIX_CHARS: &str = "()[]{},.?:+-*/%^=!<>&|\"' \t\r\n";

/// The formula engine
///
/// Owns the function registry and the expression caches. One engine per
/// thread; see the crate docs for the concurrency model.
///
/// # Example
/// ```rust
/// use reckon::prelude::*;
///
/// let mut engine = Engine::default();
/// let mut ctx = EvaluationContext::new();
/// ctx.set_variable("price", Value::from(100i64));
///
/// let result = engine.evaluate("$price * 1.2", &ctx);
/// assert!(result.success);
/// assert_eq!(result.value.to_display_string(), "120");
/// ```
pub struct Engine {
    config: EngineConfig,
    registry: FunctionRegistry,
    cache: ExpressionCache,
    options: EvaluatorOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default()).expect("default configuration is valid")
    }
}

impl Engine {
    /// Build an engine, validating the configuration
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::validate_config(&config)?;

        let mut registry = FunctionRegistry::new();
        for def in &config.functions {
            registry.register(def.clone());
        }

        let options = EvaluatorOptions {
            strict: config.strict_mode,
            decimal: config.decimal.clone(),
            security: config.security.clone(),
        };
        let cache = ExpressionCache::new(config.enable_cache, config.max_cache_size);

        Ok(Self {
            config,
            registry,
            cache,
            options,
        })
    }

    fn validate_config(config: &EngineConfig) -> EngineResult<()> {
        for (label, prefix) in [
            ("variable_prefix", config.variable_prefix),
            ("context_prefix", config.context_prefix),
        ] {
            if prefix.is_ascii_alphanumeric()
                || prefix == '_'
                || RESERVED_PREFIX_CHARS.contains(prefix)
            {
                return Err(EngineError::Configuration {
                    message: format!("{} '{}' collides with the expression grammar", label, prefix),
                });
            }
        }
        if config.variable_prefix == config.context_prefix {
            return Err(EngineError::Configuration {
                message: "variable_prefix and context_prefix must differ".into(),
            });
        }
        if config.max_cache_size == 0 {
            return Err(EngineError::Configuration {
                message: "max_cache_size must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === Parsing ===

    /// Parse an expression, consulting the AST cache first
    pub fn parse(&mut self, expression: &str) -> EngineResult<Arc<Expr>> {
        if expression.len() > self.config.security.max_expression_length {
            return Err(EngineError::MaxExpressionLength {
                length: expression.len(),
                limit: self.config.security.max_expression_length,
            });
        }
        if let Some(ast) = self.cache.get_ast(expression) {
            return Ok(ast);
        }
        let tokens = Lexer::with_prefixes(
            expression,
            self.config.variable_prefix,
            self.config.context_prefix,
        )
        .tokenize()?;
        let ast = Arc::new(Parser::new(tokens).parse()?);
        self.cache.insert_ast(expression, Arc::clone(&ast));
        Ok(ast)
    }

    /// The `$`-variable names an expression references, cached
    pub fn extract_dependencies(&mut self, expression: &str) -> EngineResult<IndexSet<String>> {
        if let Some(deps) = self.cache.get_deps(expression) {
            return Ok(deps);
        }
        let ast = self.parse(expression)?;
        let deps = extract_dependencies(&ast);
        self.cache.insert_deps(expression, deps.clone());
        Ok(deps)
    }

    // === Evaluation ===

    /// Evaluate one expression; errors are captured in the envelope, never
    /// propagated
    pub fn evaluate(&mut self, expression: &str, ctx: &EvaluationContext) -> EvalResult {
        let start = Instant::now();
        let ast = match self.parse(expression) {
            Ok(ast) => ast,
            Err(error) => return EvalResult::err(error, elapsed_ms(start), Vec::new()),
        };

        let mut evaluator = Evaluator::new(&self.registry, &self.options);
        let outcome = evaluator.evaluate(&ast, ctx);
        let accessed: Vec<String> = evaluator.accessed_variables().iter().cloned().collect();
        match outcome {
            Ok(value) => EvalResult::ok(value, elapsed_ms(start), accessed),
            Err(error) => EvalResult::err(error, elapsed_ms(start), accessed),
        }
    }

    // === Batch ===

    /// Build the dependency graph for a formula set. Edges point only at
    /// names that are themselves formula ids; everything else is context.
    pub fn build_dependency_graph(
        &mut self,
        formulas: &[FormulaDefinition],
    ) -> EngineResult<DependencyGraph> {
        let mut ids: IndexSet<&str> = IndexSet::new();
        for formula in formulas {
            if !ids.insert(formula.id.as_str()) {
                return Err(EngineError::DuplicateFormula {
                    id: formula.id.clone(),
                });
            }
        }

        let mut graph = DependencyGraph::new();
        for formula in formulas {
            graph.add_node(&formula.id);
            let deps: IndexSet<String> = match &formula.dependencies {
                Some(explicit) => explicit.iter().cloned().collect(),
                None => self.extract_dependencies(&formula.expression)?,
            };
            for dep in &deps {
                if ids.contains(dep.as_str()) {
                    graph.add_edge(&formula.id, dep);
                }
            }
        }
        Ok(graph)
    }

    /// The topological evaluation order for a formula set
    pub fn get_evaluation_order(
        &mut self,
        formulas: &[FormulaDefinition],
    ) -> EngineResult<Vec<String>> {
        self.build_dependency_graph(formulas)?.topological_sort()
    }

    /// Evaluate a formula set in dependency order.
    ///
    /// Each successful result has its effective rounding applied (formula
    /// override, then the engine default) before being injected into the
    /// working context, so dependents observe post-rounding values. Failures
    /// consult the formula's error policy; only `Throw` stops the batch.
    pub fn evaluate_all(
        &mut self,
        formulas: &[FormulaDefinition],
        ctx: &EvaluationContext,
        options: &BatchOptions,
    ) -> BatchResult {
        let start = Instant::now();
        let mut batch = BatchResult::empty();

        let graph = match self.build_dependency_graph(formulas) {
            Ok(graph) => graph,
            Err(error) => {
                batch.errors.push(error);
                batch.success = false;
                batch.total_elapsed_ms = elapsed_ms(start);
                return batch;
            }
        };
        let order = match graph.topological_sort() {
            Ok(order) => order,
            Err(error) => {
                batch.errors.push(error);
                batch.success = false;
                batch.total_elapsed_ms = elapsed_ms(start);
                return batch;
            }
        };
        debug!("evaluating {} formulas in order {:?}", order.len(), order);
        batch.evaluation_order = order.clone();

        let mut working = ctx.clone();
        if self.config.decimal.auto_convert_floats {
            let variables = std::mem::take(&mut working.variables);
            working.variables = variables
                .into_iter()
                .map(|(name, value)| (name, value.convert_floats()))
                .collect();
        }

        let by_id: IndexMap<&str, &FormulaDefinition> = formulas
            .iter()
            .map(|formula| (formula.id.as_str(), formula))
            .collect();

        for id in &order {
            let formula = match by_id.get(id.as_str()) {
                Some(formula) => *formula,
                None => continue,
            };

            let mut result = self.evaluate(&formula.expression, &working);
            if result.success {
                if !options.disable_intermediate_rounding {
                    result.value = self.apply_effective_rounding(formula, result.value);
                }
                working
                    .variables
                    .insert(id.clone(), result.value.clone());
                batch.results.insert(id.clone(), result);
                continue;
            }

            let error = result
                .error
                .clone()
                .unwrap_or(EngineError::Configuration {
                    message: "failed evaluation without an error".into(),
                });
            let policy = formula.on_error.unwrap_or(self.config.default_error_behavior);
            warn!("formula '{}' failed ({}), policy {:?}", id, error, policy);
            batch.success = false;
            batch.errors.push(error);

            match policy {
                ErrorPolicy::Throw => {
                    batch.results.insert(id.clone(), result);
                    break;
                }
                ErrorPolicy::Null => {
                    working.variables.insert(id.clone(), Value::Null);
                    batch.results.insert(id.clone(), result);
                }
                ErrorPolicy::Zero => {
                    let zero = Value::Decimal(Decimal::ZERO);
                    working.variables.insert(id.clone(), zero.clone());
                    result.value = zero;
                    batch.results.insert(id.clone(), result);
                }
                ErrorPolicy::Default => {
                    let fallback = formula.default_value.clone().unwrap_or(Value::Null);
                    working.variables.insert(id.clone(), fallback.clone());
                    result.value = fallback;
                    batch.results.insert(id.clone(), result);
                }
                ErrorPolicy::Skip => {
                    // the id stays absent from the working context
                    batch.results.insert(id.clone(), result);
                }
            }
        }

        batch.total_elapsed_ms = elapsed_ms(start);
        batch
    }

    /// Formula override first, then the engine default; `None` mode means
    /// no rounding
    fn apply_effective_rounding(&self, formula: &FormulaDefinition, value: Value) -> Value {
        let policy: RoundingPolicy = formula.rounding.unwrap_or(self.config.default_rounding);
        match (value, policy.mode.rounding_mode()) {
            (Value::Decimal(d), Some(mode)) => {
                Value::Decimal(decimal::round(d, policy.precision, mode))
            }
            (value, _) => value,
        }
    }

    // === Validation ===

    /// Parse and graph-check a formula set without executing anything
    pub fn validate(&mut self, formulas: &[FormulaDefinition]) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut ids: IndexSet<&str> = IndexSet::new();
        for formula in formulas {
            if !ids.insert(formula.id.as_str()) {
                errors.push(EngineError::DuplicateFormula {
                    id: formula.id.clone(),
                });
            }
        }

        let mut parsed: IndexMap<&str, Arc<Expr>> = IndexMap::new();
        for formula in formulas {
            match self.parse(&formula.expression) {
                Ok(ast) => {
                    for name in extract_function_names(&ast) {
                        // FILTER and MAP are engine-known, not registered
                        let known = matches!(name.as_str(), "FILTER" | "MAP")
                            || self.registry.contains(&name);
                        if !known {
                            warnings.push(format!(
                                "formula '{}' calls unknown function {}",
                                formula.id, name
                            ));
                        }
                    }
                    parsed.insert(formula.id.as_str(), ast);
                }
                Err(error) => errors.push(error),
            }
        }

        let mut graph = DependencyGraph::new();
        for formula in formulas {
            graph.add_node(&formula.id);
            let deps: IndexSet<String> = match &formula.dependencies {
                Some(explicit) => explicit.iter().cloned().collect(),
                None => match parsed.get(formula.id.as_str()) {
                    Some(ast) => extract_dependencies(ast),
                    None => IndexSet::new(),
                },
            };
            for dep in &deps {
                if ids.contains(dep.as_str()) {
                    graph.add_edge(&formula.id, dep);
                }
            }
        }

        let order = match graph.topological_sort() {
            Ok(order) => order,
            Err(error) => {
                errors.push(error);
                Vec::new()
            }
        };

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            graph,
            order,
        }
    }

    // === Registry and cache management ===

    /// Register a function; the name is upper-cased and overrides any
    /// built-in
    pub fn register_function(&mut self, def: FunctionDef) {
        self.registry.register(def);
    }

    pub fn register_functions(&mut self, defs: Vec<FunctionDef>) {
        for def in defs {
            self.registry.register(def);
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
