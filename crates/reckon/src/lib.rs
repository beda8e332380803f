//! # reckon
//!
//! A decimal-exact, dependency-ordered formula evaluation engine for
//! configuration-driven formulas.
//!
//! Reckon parses expression strings over a shared variable environment,
//! extracts inter-formula dependencies, orders formulas topologically, and
//! evaluates them with arbitrary-precision decimal arithmetic so financial
//! computations stay exact.
//!
//! ## Features
//!
//! - Expression language with `$variables`, `@context` values, arrays,
//!   objects, ternaries, and a built-in function library
//! - Exact decimal arithmetic (`0.1 + 0.2 == 0.3`)
//! - Batch evaluation in dependency order with cycle detection
//! - Per-formula rounding and error policies; rounded results propagate
//! - Bounded AST cache with hit/miss statistics
//!
//! ## Example
//!
//! ```rust
//! use reckon::prelude::*;
//!
//! let mut engine = Engine::default();
//!
//! let formulas = vec![
//!     FormulaDefinition::new("gross", "$unitPrice * $quantity"),
//!     FormulaDefinition::new("tax", "$gross * 0.2"),
//!     FormulaDefinition::new("total", "$gross + $tax"),
//! ];
//!
//! let ctx = EvaluationContext::from_json(&serde_json::json!({
//!     "unitPrice": 100, "quantity": 5
//! }));
//!
//! let batch = engine.evaluate_all(&formulas, &ctx, &BatchOptions::default());
//! assert!(batch.success);
//! assert_eq!(batch.value("total").unwrap().to_display_string(), "600");
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod prelude;

pub use batch::{BatchOptions, BatchResult, EvalResult, FormulaDefinition, ValidationReport};
pub use cache::CacheStats;
pub use config::{EngineConfig, ErrorPolicy, RoundingPolicy, RoundingPolicyMode};
pub use engine::Engine;

// Re-export the language and core types
pub use reckon_core::{
    decimal, DecimalConfig, EngineError, EngineResult, ErrorCategory, RoundingMode,
    SecurityConfig, Value,
};
pub use reckon_formula::functions::{FunctionContext, FunctionDef, FunctionRegistry};
pub use reckon_formula::{
    extract_dependencies, parse_expression, BinaryOp, DependencyGraph, EvaluationContext,
    Evaluator, EvaluatorOptions, Expr, UnaryOp,
};
