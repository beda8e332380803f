//! Convenience re-exports
//!
//! ```rust
//! use reckon::prelude::*;
//! ```

pub use crate::batch::{BatchOptions, BatchResult, EvalResult, FormulaDefinition};
pub use crate::config::{EngineConfig, ErrorPolicy, RoundingPolicy, RoundingPolicyMode};
pub use crate::engine::Engine;
pub use reckon_core::{EngineError, RoundingMode, Value};
pub use reckon_formula::functions::{FunctionContext, FunctionDef};
pub use reckon_formula::EvaluationContext;
