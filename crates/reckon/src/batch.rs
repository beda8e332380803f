//! Batch evaluation types
//!
//! A batch is a set of named formulas over one shared context. Formulas are
//! evaluated in dependency order and each result (after its effective
//! rounding) is injected into the working context before dependents run.

use crate::config::{ErrorPolicy, RoundingPolicy};
use indexmap::IndexMap;
use reckon_core::{EngineError, Value};
use reckon_formula::DependencyGraph;
use serde::Serialize;

/// A named formula in a batch
#[derive(Debug, Clone)]
pub struct FormulaDefinition {
    /// Unique id; the result is injected under this name
    pub id: String,
    /// Expression source text
    pub expression: String,
    /// Explicit dependency list; extracted from the expression when absent
    pub dependencies: Option<Vec<String>>,
    /// Error policy override for this formula
    pub on_error: Option<ErrorPolicy>,
    /// Injected by the `Default` error policy
    pub default_value: Option<Value>,
    /// Rounding override for this formula
    pub rounding: Option<RoundingPolicy>,
    /// Opaque caller data, carried through untouched
    pub metadata: Option<serde_json::Value>,
}

impl FormulaDefinition {
    pub fn new(id: &str, expression: &str) -> Self {
        Self {
            id: id.to_string(),
            expression: expression.to_string(),
            dependencies: None,
            on_error: None,
            default_value: None,
            rounding: None,
            metadata: None,
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = Some(deps.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = Some(policy);
        self
    }

    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = Some(rounding);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Result envelope for one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct EvalResult {
    pub value: Value,
    pub success: bool,
    pub error: Option<EngineError>,
    pub elapsed_ms: f64,
    /// Variables the evaluation touched, in first-access order
    pub accessed_variables: Vec<String>,
}

impl EvalResult {
    pub(crate) fn ok(value: Value, elapsed_ms: f64, accessed: Vec<String>) -> Self {
        Self {
            value,
            success: true,
            error: None,
            elapsed_ms,
            accessed_variables: accessed,
        }
    }

    pub(crate) fn err(error: EngineError, elapsed_ms: f64, accessed: Vec<String>) -> Self {
        Self {
            value: Value::Null,
            success: false,
            error: Some(error),
            elapsed_ms,
            accessed_variables: accessed,
        }
    }
}

/// Options for `evaluate_all`
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Skip the effective rounding step entirely; dependents then observe
    /// unrounded values
    pub disable_intermediate_rounding: bool,
}

/// Result of one `evaluate_all` run
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Per-formula envelopes, in evaluation order
    pub results: IndexMap<String, EvalResult>,
    pub evaluation_order: Vec<String>,
    pub errors: Vec<EngineError>,
    pub success: bool,
    pub total_elapsed_ms: f64,
}

impl BatchResult {
    pub(crate) fn empty() -> Self {
        Self {
            results: IndexMap::new(),
            evaluation_order: Vec::new(),
            errors: Vec::new(),
            success: true,
            total_elapsed_ms: 0.0,
        }
    }

    /// The computed value for an id, when it evaluated successfully
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.results.get(id).map(|r| &r.value)
    }
}

/// Result of `validate`: parse and graph checks without execution
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<EngineError>,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub graph: DependencyGraph,
    /// Evaluation order; empty when the graph has a cycle
    pub order: Vec<String>,
}
