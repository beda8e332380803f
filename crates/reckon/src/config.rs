//! Engine configuration
//!
//! Plain structs with `Default` implementations carrying the documented
//! defaults; callers override the fields they care about.

use reckon_core::{DecimalConfig, RoundingMode, SecurityConfig};
use reckon_formula::functions::FunctionDef;

/// Rounding applied to a formula result before it propagates to dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingPolicy {
    pub mode: RoundingPolicyMode,
    /// Digits after the decimal point to keep
    pub precision: u32,
}

impl RoundingPolicy {
    pub fn new(mode: RoundingPolicyMode, precision: u32) -> Self {
        Self { mode, precision }
    }

    pub fn half_up(precision: u32) -> Self {
        Self::new(RoundingPolicyMode::HalfUp, precision)
    }

    pub fn is_none(&self) -> bool {
        self.mode == RoundingPolicyMode::None
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            mode: RoundingPolicyMode::None,
            precision: 2,
        }
    }
}

/// Rounding mode selection for [`RoundingPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingPolicyMode {
    HalfUp,
    HalfDown,
    Floor,
    Ceil,
    /// Propagate results unrounded
    #[default]
    None,
}

impl RoundingPolicyMode {
    /// The decimal rounding mode, or `None` when rounding is off
    pub fn rounding_mode(&self) -> Option<RoundingMode> {
        match self {
            RoundingPolicyMode::HalfUp => Some(RoundingMode::HalfUp),
            RoundingPolicyMode::HalfDown => Some(RoundingMode::HalfDown),
            RoundingPolicyMode::Floor => Some(RoundingMode::Floor),
            RoundingPolicyMode::Ceil => Some(RoundingMode::Ceil),
            RoundingPolicyMode::None => None,
        }
    }
}

/// What a failing formula injects into the working context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// The error aborts the rest of the batch
    #[default]
    Throw,
    /// Inject `Null` and continue
    Null,
    /// Inject Decimal 0 and continue
    Zero,
    /// Inject the formula's `default_value` (or `Null`) and continue
    Default,
    /// Leave the id absent and continue
    Skip,
}

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache parsed ASTs and extracted dependencies
    pub enable_cache: bool,
    /// Bound on the AST cache; the oldest ~10% are evicted when full
    pub max_cache_size: usize,
    /// Error on undefined variables; lenient mode yields `Null`
    pub strict_mode: bool,
    /// Prefix character for formula variables
    pub variable_prefix: char,
    /// Prefix character for external context variables
    pub context_prefix: char,
    pub decimal: DecimalConfig,
    /// Rounding applied to every Decimal formula result unless the formula
    /// overrides it
    pub default_rounding: RoundingPolicy,
    pub security: SecurityConfig,
    /// Error policy for formulas that do not set their own
    pub default_error_behavior: ErrorPolicy,
    /// Custom functions registered at construction
    pub functions: Vec<FunctionDef>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            max_cache_size: 1000,
            strict_mode: true,
            variable_prefix: '$',
            context_prefix: '@',
            decimal: DecimalConfig::default(),
            default_rounding: RoundingPolicy::default(),
            security: SecurityConfig::default(),
            default_error_behavior: ErrorPolicy::Throw,
            functions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documentation() {
        let config = EngineConfig::default();
        assert!(config.enable_cache);
        assert_eq!(config.max_cache_size, 1000);
        assert!(config.strict_mode);
        assert_eq!(config.variable_prefix, '$');
        assert_eq!(config.context_prefix, '@');
        assert!(config.default_rounding.is_none());
        assert_eq!(config.default_error_behavior, ErrorPolicy::Throw);
    }

    #[test]
    fn test_policy_mode_mapping() {
        assert_eq!(
            RoundingPolicyMode::HalfUp.rounding_mode(),
            Some(RoundingMode::HalfUp)
        );
        assert_eq!(RoundingPolicyMode::None.rounding_mode(), None);
        assert!(!RoundingPolicy::half_up(2).is_none());
    }
}
