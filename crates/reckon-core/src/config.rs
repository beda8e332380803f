//! Shared configuration types
//!
//! These knobs are consumed by both the evaluator and the engine facade, so
//! they live in the core crate.

use crate::decimal::RoundingMode;

/// Decimal arithmetic configuration
#[derive(Debug, Clone)]
pub struct DecimalConfig {
    /// Target significant digits for derived values. The backend computes at
    /// its full 28-digit precision, so this records the caller's intent.
    pub precision: u32,
    /// Default rounding mode for division and `DECIMAL`/`ROUND` when no
    /// explicit mode is given
    pub rounding_mode: RoundingMode,
    /// Scale applied by the `/` operator and `DIVIDE` default
    pub division_scale: u32,
    /// Upgrade primitive floats in the context to Decimal on batch entry
    pub auto_convert_floats: bool,
    /// Carried for API compatibility; the backend's own range governs
    pub max_exponent: i32,
    /// Carried for API compatibility; the backend's own range governs
    pub min_exponent: i32,
    /// Keep trailing zeros when rendering decimals as text
    pub preserve_trailing_zeros: bool,
}

impl Default for DecimalConfig {
    fn default() -> Self {
        Self {
            precision: 20,
            rounding_mode: RoundingMode::HalfUp,
            division_scale: 10,
            auto_convert_floats: true,
            max_exponent: 1000,
            min_exponent: -1000,
            preserve_trailing_zeros: false,
        }
    }
}

/// Resource limits enforced by the evaluator
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Longest expression text accepted by `parse`
    pub max_expression_length: usize,
    /// Deepest allowed AST recursion during evaluation
    pub max_recursion_depth: usize,
    /// Total iteration budget for SUM/FILTER/MAP across one evaluation
    pub max_iterations: usize,
    /// Wall-clock budget in milliseconds. Carried but not enforced; the
    /// evaluator is synchronous and bounded by the two counters above.
    pub max_execution_time: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_expression_length: 10_000,
            max_recursion_depth: 100,
            max_iterations: 10_000,
            max_execution_time: 5_000,
        }
    }
}
