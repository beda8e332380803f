//! Built-in function library
//!
//! Functions are grouped by category module and registered by name in a
//! [`FunctionRegistry`]. Names are upper-case-normalized on registration and
//! lookup. `FILTER` and `MAP` (and the two-argument `SUM`) are not here -
//! they are engine-known builtins handled inside the evaluator because they
//! need unevaluated argument ASTs.

pub mod aggregate;
pub mod convert;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use ahash::AHashMap;
use reckon_core::{DecimalConfig, EngineError, EngineResult, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Per-call context handed to function implementations
pub struct FunctionContext<'a> {
    /// Decimal configuration (division scale, default rounding mode, ...)
    pub decimal: &'a DecimalConfig,
    /// The current SUM/FILTER/MAP element, when called inside an iteration
    pub current_item: Option<&'a Value>,
}

/// Function implementation signature
pub type FunctionImpl = fn(&[Value], &FunctionContext<'_>) -> EngineResult<Value>;

/// Function definition
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Function name; normalized to upper case on registration
    pub name: String,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn new(
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name: name.to_string(),
            min_args,
            max_args,
            implementation,
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// A registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_math_functions();
        registry.register_aggregate_functions();
        registry.register_text_functions();
        registry.register_logical_functions();
        registry.register_convert_functions();
        registry.register_lookup_functions();
        registry
    }

    /// A registry with no functions at all
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_uppercase())
    }

    /// Register a function; overrides any existing definition with the name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::new("ABS", 1, Some(1), math::fn_abs));
        self.register(FunctionDef::new("ROUND", 1, Some(3), math::fn_round));
        self.register(FunctionDef::new("FLOOR", 1, Some(2), math::fn_floor));
        self.register(FunctionDef::new("CEIL", 1, Some(2), math::fn_ceil));
        self.register(FunctionDef::new("TRUNCATE", 1, Some(2), math::fn_truncate));
        self.register(FunctionDef::new("MIN", 1, None, math::fn_min));
        self.register(FunctionDef::new("MAX", 1, None, math::fn_max));
        self.register(FunctionDef::new("POW", 2, Some(2), math::fn_pow));
        self.register(FunctionDef::new("SQRT", 1, Some(1), math::fn_sqrt));
        self.register(FunctionDef::new("LOG", 1, Some(1), math::fn_log));
        self.register(FunctionDef::new("LOG10", 1, Some(1), math::fn_log10));
        self.register(FunctionDef::new("EXP", 1, Some(1), math::fn_exp));
        self.register(FunctionDef::new("SIGN", 1, Some(1), math::fn_sign));
        self.register(FunctionDef::new("DECIMAL", 1, Some(2), math::fn_decimal));
        self.register(FunctionDef::new("SCALE", 1, Some(1), math::fn_scale));
        self.register(FunctionDef::new("PRECISION", 1, Some(1), math::fn_precision));
        self.register(FunctionDef::new("DIVIDE", 2, Some(4), math::fn_divide));
        self.register(FunctionDef::new("MOD", 2, Some(2), math::fn_mod));
    }

    fn register_aggregate_functions(&mut self) {
        // the two-argument SUM form is engine-known; max_args covers it so
        // arity errors report the full range
        self.register(FunctionDef::new("SUM", 1, Some(2), aggregate::fn_sum));
        self.register(FunctionDef::new("AVG", 1, Some(1), aggregate::fn_avg));
        self.register(FunctionDef::new("COUNT", 1, Some(1), aggregate::fn_count));
        self.register(FunctionDef::new("PRODUCT", 1, Some(1), aggregate::fn_product));
        self.register(FunctionDef::new("FIRST", 1, Some(1), aggregate::fn_first));
        self.register(FunctionDef::new("LAST", 1, Some(1), aggregate::fn_last));
        self.register(FunctionDef::new("REVERSE", 1, Some(1), aggregate::fn_reverse));
        self.register(FunctionDef::new("SLICE", 2, Some(3), aggregate::fn_slice));
        self.register(FunctionDef::new("INCLUDES", 2, Some(2), aggregate::fn_includes));
        self.register(FunctionDef::new("INDEXOF", 2, Some(2), aggregate::fn_indexof));
        self.register(FunctionDef::new("FLATTEN", 1, Some(2), aggregate::fn_flatten));
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef::new("LEN", 1, Some(1), text::fn_len));
        self.register(FunctionDef::new("UPPER", 1, Some(1), text::fn_upper));
        self.register(FunctionDef::new("LOWER", 1, Some(1), text::fn_lower));
        self.register(FunctionDef::new("TRIM", 1, Some(1), text::fn_trim));
        self.register(FunctionDef::new("CONCAT", 1, None, text::fn_concat));
        self.register(FunctionDef::new("SUBSTR", 2, Some(3), text::fn_substr));
        self.register(FunctionDef::new("REPLACE", 3, Some(3), text::fn_replace));
        self.register(FunctionDef::new("CONTAINS", 2, Some(2), text::fn_contains));
        self.register(FunctionDef::new("STARTSWITH", 2, Some(2), text::fn_startswith));
        self.register(FunctionDef::new("ENDSWITH", 2, Some(2), text::fn_endswith));
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef::new("IF", 3, Some(3), logical::fn_if));
        self.register(FunctionDef::new("COALESCE", 1, None, logical::fn_coalesce));
        self.register(FunctionDef::new("ISNULL", 1, Some(1), logical::fn_isnull));
        self.register(FunctionDef::new("ISEMPTY", 1, Some(1), logical::fn_isempty));
        self.register(FunctionDef::new("DEFAULT", 2, Some(2), logical::fn_default));
        self.register(FunctionDef::new("AND", 1, None, logical::fn_and));
        self.register(FunctionDef::new("OR", 1, None, logical::fn_or));
        self.register(FunctionDef::new("NOT", 1, Some(1), logical::fn_not));
    }

    fn register_convert_functions(&mut self) {
        self.register(FunctionDef::new("NUMBER", 1, Some(1), convert::fn_number));
        self.register(FunctionDef::new("STRING", 1, Some(1), convert::fn_string));
        self.register(FunctionDef::new("BOOLEAN", 1, Some(1), convert::fn_boolean));
        self.register(FunctionDef::new("TYPEOF", 1, Some(1), convert::fn_typeof));
    }

    fn register_lookup_functions(&mut self) {
        self.register(FunctionDef::new("LOOKUP", 3, Some(3), lookup::fn_lookup));
        self.register(FunctionDef::new("RANGE", 5, Some(5), lookup::fn_range));
    }
}

// === Shared argument helpers ===

pub(crate) fn mismatch(expected: &str, actual: &Value, function: &str, idx: usize) -> EngineError {
    EngineError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_of().to_string(),
        location: format!("{} argument {}", function, idx + 1),
    }
}

pub(crate) fn decimal_arg(args: &[Value], idx: usize, function: &str) -> EngineResult<Decimal> {
    let value = &args[idx];
    value
        .as_decimal()
        .ok_or_else(|| mismatch("number", value, function, idx))
}

pub(crate) fn int_arg(args: &[Value], idx: usize, function: &str) -> EngineResult<i64> {
    let value = &args[idx];
    value
        .as_decimal()
        .and_then(|d| d.to_i64())
        .ok_or_else(|| mismatch("integer", value, function, idx))
}

pub(crate) fn opt_int_arg(args: &[Value], idx: usize, function: &str) -> EngineResult<Option<i64>> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => int_arg(args, idx, function).map(Some),
    }
}

pub(crate) fn string_arg<'v>(
    args: &'v [Value],
    idx: usize,
    function: &str,
) -> EngineResult<&'v str> {
    let value = &args[idx];
    value
        .as_str()
        .ok_or_else(|| mismatch("string", value, function, idx))
}

pub(crate) fn array_arg<'v>(
    args: &'v [Value],
    idx: usize,
    function: &str,
) -> EngineResult<&'v [Value]> {
    let value = &args[idx];
    value
        .as_array()
        .ok_or_else(|| mismatch("array", value, function, idx))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("abs").is_some());
        assert!(registry.get("ABS").is_some());
        assert!(registry.get("Abs").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_register_overrides_builtin() {
        fn always_one(_: &[Value], _: &FunctionContext<'_>) -> EngineResult<Value> {
            Ok(Value::from(1i64))
        }
        let mut registry = FunctionRegistry::new();
        registry.register(FunctionDef::new("abs", 0, None, always_one));
        let def = registry.get("ABS").unwrap();
        assert_eq!(def.min_args, 0);
    }

    #[test]
    fn test_all_spec_functions_are_registered() {
        let registry = FunctionRegistry::new();
        for name in [
            "ABS", "ROUND", "FLOOR", "CEIL", "TRUNCATE", "MIN", "MAX", "POW", "SQRT", "LOG",
            "LOG10", "EXP", "SIGN", "DECIMAL", "SCALE", "PRECISION", "DIVIDE", "MOD", "SUM",
            "AVG", "COUNT", "PRODUCT", "FIRST", "LAST", "REVERSE", "SLICE", "INCLUDES",
            "INDEXOF", "FLATTEN", "LEN", "UPPER", "LOWER", "TRIM", "CONCAT", "SUBSTR",
            "REPLACE", "CONTAINS", "STARTSWITH", "ENDSWITH", "IF", "COALESCE", "ISNULL",
            "ISEMPTY", "DEFAULT", "AND", "OR", "NOT", "NUMBER", "STRING", "BOOLEAN", "TYPEOF",
            "LOOKUP", "RANGE",
        ] {
            assert!(registry.contains(name), "{} missing", name);
        }
    }
}
