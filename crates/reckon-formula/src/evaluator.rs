//! Expression evaluator
//!
//! A tree-walking, single-threaded evaluator. All numeric computation is
//! carried out on Decimal; binary floats only pass through when the caller
//! explicitly supplied them and conversion is off.
//!
//! The iterating builtins (two-argument `SUM`, `FILTER`, `MAP`) are
//! recognized here, ahead of the registry dispatch, because they need the
//! unevaluated argument ASTs to bind `it` per element. Everything else goes
//! through the function registry with eagerly evaluated arguments.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::functions::{FunctionContext, FunctionRegistry};
use indexmap::{IndexMap, IndexSet};
use reckon_core::{decimal, DecimalConfig, EngineError, EngineResult, SecurityConfig, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// The variable environment an expression evaluates against
///
/// `$name` resolves against `variables` (falling back to `collections`,
/// wrapped as an array); `@name` resolves against `extra`. The evaluator
/// never mutates a context.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub variables: IndexMap<String, Value>,
    pub extra: IndexMap<String, Value>,
    pub collections: IndexMap<String, Vec<Value>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `variables` from a JSON object; numbers enter as Decimal
    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut ctx = Self::new();
        if let Value::Object(map) = Value::from_json(json) {
            ctx.variables = map;
        }
        ctx
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn set_extra(&mut self, name: &str, value: Value) {
        self.extra.insert(name.to_string(), value);
    }

    pub fn set_collection(&mut self, name: &str, items: Vec<Value>) {
        self.collections.insert(name.to_string(), items);
    }
}

/// Evaluator knobs, shared by single and batch evaluation
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Missing variables are errors when set; lenient mode yields `Null`
    pub strict: bool,
    pub decimal: DecimalConfig,
    pub security: SecurityConfig,
}

impl EvaluatorOptions {
    pub fn new() -> Self {
        Self {
            strict: true,
            decimal: DecimalConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of the context plus the `it` overlay for iteration.
/// Nested iterations stack fresh overlays, so elements never leak across
/// frames.
struct Scope<'a> {
    ctx: &'a EvaluationContext,
    it: Option<&'a Value>,
}

/// The tree-walking evaluator; one instance per top-level evaluation
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    options: &'a EvaluatorOptions,
    recursion_depth: usize,
    iteration_count: usize,
    accessed_variables: IndexSet<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a FunctionRegistry, options: &'a EvaluatorOptions) -> Self {
        Self {
            registry,
            options,
            recursion_depth: 0,
            iteration_count: 0,
            accessed_variables: IndexSet::new(),
        }
    }

    /// Evaluate an expression against a context
    pub fn evaluate(&mut self, expr: &Expr, ctx: &EvaluationContext) -> EngineResult<Value> {
        let scope = Scope { ctx, it: None };
        self.eval(expr, &scope)
    }

    /// Every variable name the last evaluation touched, in first-access
    /// order; `@`-variables are recorded with their prefix
    pub fn accessed_variables(&self) -> &IndexSet<String> {
        &self.accessed_variables
    }

    // === Dispatch ===

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> EngineResult<Value> {
        if self.recursion_depth >= self.options.security.max_recursion_depth {
            return Err(EngineError::MaxRecursion {
                limit: self.options.security.max_recursion_depth,
            });
        }
        self.recursion_depth += 1;
        let result = self.eval_node(expr, scope);
        self.recursion_depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr, scope: &Scope) -> EngineResult<Value> {
        match expr {
            Expr::DecimalLit(text) => decimal::parse(text).map(Value::Decimal),
            Expr::FloatLit(value) => Ok(Value::Float(*value)),
            Expr::StringLit(value) => Ok(Value::String(value.clone())),
            Expr::BoolLit(value) => Ok(Value::Bool(*value)),
            Expr::NullLit => Ok(Value::Null),

            Expr::ArrayLit(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element, scope)?);
                }
                Ok(Value::Array(items))
            }

            Expr::ObjectLit(properties) => {
                let mut map = IndexMap::with_capacity(properties.len());
                for (key, value) in properties {
                    map.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::Object(map))
            }

            Expr::Variable { name } => self.resolve_variable(name, scope),
            Expr::ContextVariable { name } => self.resolve_context_variable(name, scope),

            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                self.apply_unary(*op, value)
            }

            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let lhs = self.eval(left, scope)?;
                    if !lhs.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let rhs = self.eval(right, scope)?;
                    Ok(Value::Bool(rhs.is_truthy()))
                }
                BinaryOp::Or => {
                    let lhs = self.eval(left, scope)?;
                    if lhs.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let rhs = self.eval(right, scope)?;
                    Ok(Value::Bool(rhs.is_truthy()))
                }
                _ => {
                    let lhs = self.eval(left, scope)?;
                    let rhs = self.eval(right, scope)?;
                    self.apply_binary(*op, lhs, rhs)
                }
            },

            Expr::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                let cond = self.eval(condition, scope)?;
                if cond.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }

            Expr::Member { object, property } => {
                let base = self.eval(object, scope)?;
                self.access_property(base, property)
            }

            Expr::Index { object, index } => {
                let base = self.eval(object, scope)?;
                let idx = self.eval(index, scope)?;
                self.access_index(base, idx)
            }

            Expr::Call { name, args } => self.call_function(name, args, scope),
        }
    }

    // === Variables ===

    fn resolve_variable(&mut self, name: &str, scope: &Scope) -> EngineResult<Value> {
        self.accessed_variables.insert(name.to_string());

        if name == "it" {
            if let Some(item) = scope.it {
                return Ok(auto_decimal(item.clone()));
            }
        }

        if let Some(value) = scope.ctx.variables.get(name) {
            return Ok(auto_decimal(value.clone()));
        }
        if let Some(items) = scope.ctx.collections.get(name) {
            return Ok(Value::Array(items.clone()));
        }

        if self.options.strict {
            Err(EngineError::UndefinedVariable {
                name: name.to_string(),
            })
        } else {
            Ok(Value::Null)
        }
    }

    fn resolve_context_variable(&mut self, name: &str, scope: &Scope) -> EngineResult<Value> {
        self.accessed_variables.insert(format!("@{}", name));

        match scope.ctx.extra.get(name) {
            // as-is: no auto-Decimal conversion for context values
            Some(value) => Ok(value.clone()),
            None if self.options.strict => Err(EngineError::UndefinedVariable {
                name: format!("@{}", name),
            }),
            None => Ok(Value::Null),
        }
    }

    // === Operators ===

    fn apply_unary(&self, op: UnaryOp, value: Value) -> EngineResult<Value> {
        match op {
            UnaryOp::Negate => match value {
                Value::Decimal(d) => Ok(Value::Decimal(-d)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(EngineError::InvalidOperation {
                    operator: "-".into(),
                    operand_types: vec![other.type_of().to_string()],
                }),
            },
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn apply_binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> EngineResult<Value> {
        match op {
            BinaryOp::Add => {
                // string concatenation when either side is a string
                if lhs.as_str().is_some() || rhs.as_str().is_some() {
                    return Ok(Value::String(format!(
                        "{}{}",
                        lhs.to_display_string(),
                        rhs.to_display_string()
                    )));
                }
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                decimal::add(a, b).map(Value::Decimal)
            }
            BinaryOp::Subtract => {
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                decimal::sub(a, b).map(Value::Decimal)
            }
            BinaryOp::Multiply => {
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                decimal::mul(a, b).map(Value::Decimal)
            }
            BinaryOp::Divide => {
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                if b.is_zero() {
                    return Err(EngineError::DivisionByZero);
                }
                decimal::div(
                    a,
                    b,
                    self.options.decimal.division_scale,
                    self.options.decimal.rounding_mode,
                )
                .map(Value::Decimal)
            }
            BinaryOp::Modulo => {
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                if b.is_zero() {
                    return Err(EngineError::DivisionByZero);
                }
                decimal::rem(a, b).map(Value::Decimal)
            }
            BinaryOp::Power => {
                let (a, b) = self.numeric_operands(op, &lhs, &rhs)?;
                decimal::pow(a, b).map(Value::Decimal)
            }

            BinaryOp::Eq => Ok(Value::Bool(lhs.loose_eq(&rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!lhs.loose_eq(&rhs))),

            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordering = lhs.compare(&rhs).ok_or_else(|| EngineError::InvalidOperation {
                    operator: op.symbol().to_string(),
                    operand_types: vec![
                        lhs.type_of().to_string(),
                        rhs.type_of().to_string(),
                    ],
                })?;
                let result = match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }

            BinaryOp::And | BinaryOp::Or => {
                unreachable!("logical operators short-circuit in eval_node")
            }
        }
    }

    fn numeric_operands(
        &self,
        op: BinaryOp,
        lhs: &Value,
        rhs: &Value,
    ) -> EngineResult<(Decimal, Decimal)> {
        match (lhs.as_decimal(), rhs.as_decimal()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(EngineError::InvalidOperation {
                operator: op.symbol().to_string(),
                operand_types: vec![lhs.type_of().to_string(), rhs.type_of().to_string()],
            }),
        }
    }

    // === Member and index access ===

    fn access_property(&self, base: Value, property: &str) -> EngineResult<Value> {
        match base {
            Value::Null => {
                if self.options.strict {
                    Err(EngineError::PropertyAccess {
                        property: property.to_string(),
                        object_type: "null".into(),
                    })
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Object(map) => Ok(map
                .get(property)
                .cloned()
                .map(auto_decimal)
                .unwrap_or(Value::Null)),
            other => Err(EngineError::PropertyAccess {
                property: property.to_string(),
                object_type: other.type_of().to_string(),
            }),
        }
    }

    fn access_index(&self, base: Value, index: Value) -> EngineResult<Value> {
        match base {
            Value::Null => {
                if self.options.strict {
                    Err(EngineError::IndexAccess {
                        index: index.to_display_string(),
                        object_type: "null".into(),
                    })
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Array(items) => {
                let idx = index
                    .as_decimal()
                    .and_then(|d| d.to_i64())
                    .ok_or_else(|| EngineError::IndexAccess {
                        index: index.to_display_string(),
                        object_type: "array".into(),
                    })?;
                if idx < 0 || idx as usize >= items.len() {
                    return Ok(Value::Null);
                }
                Ok(auto_decimal(items[idx as usize].clone()))
            }
            Value::Object(map) => {
                let key = index.to_display_string();
                Ok(map
                    .get(&key)
                    .cloned()
                    .map(auto_decimal)
                    .unwrap_or(Value::Null))
            }
            other => Err(EngineError::IndexAccess {
                index: index.to_display_string(),
                object_type: other.type_of().to_string(),
            }),
        }
    }

    // === Function calls ===

    fn call_function(&mut self, name: &str, args: &[Expr], scope: &Scope) -> EngineResult<Value> {
        // Iterating builtins need the unevaluated argument ASTs
        match name {
            "SUM" if args.len() == 2 => return self.eval_sum_over(args, scope),
            "FILTER" => {
                self.check_arity("FILTER", args.len(), 2, Some(2))?;
                return self.eval_filter(args, scope);
            }
            "MAP" => {
                self.check_arity("MAP", args.len(), 2, Some(2))?;
                return self.eval_map(args, scope);
            }
            _ => {}
        }

        let def = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::UndefinedFunction {
                name: name.to_string(),
            })?;
        self.check_arity(name, args.len(), def.min_args, def.max_args)?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, scope)?);
        }

        let fctx = FunctionContext {
            decimal: &self.options.decimal,
            current_item: scope.it,
        };
        (def.implementation)(&values, &fctx)
    }

    fn check_arity(
        &self,
        function: &str,
        actual: usize,
        min: usize,
        max: Option<usize>,
    ) -> EngineResult<()> {
        if actual < min || max.map_or(false, |max| actual > max) {
            return Err(EngineError::ArgumentCount {
                function: function.to_string(),
                min,
                max,
                actual,
            });
        }
        Ok(())
    }

    /// `SUM(arr, expr)`: sum of `expr` evaluated with `it` bound per element
    fn eval_sum_over(&mut self, args: &[Expr], scope: &Scope) -> EngineResult<Value> {
        let items = self.iterable(&args[0], "SUM", scope)?;
        let mut sum = Decimal::ZERO;
        for item in &items {
            self.bump_iteration()?;
            let child = Scope {
                ctx: scope.ctx,
                it: Some(item),
            };
            let mapped = self.eval(&args[1], &child)?;
            if let Some(d) = mapped.as_decimal() {
                sum = decimal::add(sum, d)?;
            }
        }
        Ok(Value::Decimal(sum))
    }

    /// `FILTER(arr, cond)`: elements for which `cond` is truthy
    fn eval_filter(&mut self, args: &[Expr], scope: &Scope) -> EngineResult<Value> {
        let items = self.iterable(&args[0], "FILTER", scope)?;
        let mut kept = Vec::new();
        for item in &items {
            self.bump_iteration()?;
            let child = Scope {
                ctx: scope.ctx,
                it: Some(item),
            };
            if self.eval(&args[1], &child)?.is_truthy() {
                kept.push(item.clone());
            }
        }
        Ok(Value::Array(kept))
    }

    /// `MAP(arr, expr)`: `expr` evaluated with `it` bound per element
    fn eval_map(&mut self, args: &[Expr], scope: &Scope) -> EngineResult<Value> {
        let items = self.iterable(&args[0], "MAP", scope)?;
        let mut mapped = Vec::with_capacity(items.len());
        for item in &items {
            self.bump_iteration()?;
            let child = Scope {
                ctx: scope.ctx,
                it: Some(item),
            };
            mapped.push(self.eval(&args[1], &child)?);
        }
        Ok(Value::Array(mapped))
    }

    fn iterable(&mut self, expr: &Expr, function: &str, scope: &Scope) -> EngineResult<Vec<Value>> {
        match self.eval(expr, scope)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(EngineError::TypeMismatch {
                expected: "array".into(),
                actual: other.type_of().to_string(),
                location: format!("{} argument 1", function),
            }),
        }
    }

    fn bump_iteration(&mut self) -> EngineResult<()> {
        self.iteration_count += 1;
        if self.iteration_count > self.options.security.max_iterations {
            return Err(EngineError::MaxIterations {
                limit: self.options.security.max_iterations,
            });
        }
        Ok(())
    }
}

/// Upgrade a primitive float to Decimal on variable/property reads
fn auto_decimal(value: Value) -> Value {
    match value {
        Value::Float(f) => match decimal::from_f64(f) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Float(f),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval_with(source: &str, ctx: &EvaluationContext, strict: bool) -> EngineResult<Value> {
        let ast = parse_expression(source).unwrap();
        let registry = FunctionRegistry::new();
        let mut options = EvaluatorOptions::new();
        options.strict = strict;
        let mut evaluator = Evaluator::new(&registry, &options);
        evaluator.evaluate(&ast, ctx)
    }

    fn eval(source: &str) -> EngineResult<Value> {
        eval_with(source, &EvaluationContext::new(), true)
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(decimal::parse(s).unwrap())
    }

    #[test]
    fn test_decimal_exactness() {
        assert_eq!(eval("0.1 + 0.2").unwrap(), dec("0.3"));
        assert_eq!(eval("1000.10 - 1000.00").unwrap(), dec("0.10"));
        assert_eq!(eval("19.99 * 3").unwrap(), dec("59.97"));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), dec("14"));
        assert_eq!(eval("10 % 3").unwrap(), dec("1"));
        assert_eq!(eval("2 ^ 10").unwrap(), dec("1024"));
        assert_eq!(eval("-5 + 2").unwrap(), dec("-3"));
        assert_eq!(eval("10 / 4").unwrap(), dec("2.5"));
    }

    #[test]
    fn test_division_uses_configured_scale() {
        // default division scale is 10, HALF_UP
        assert_eq!(eval("1 / 3").unwrap(), dec("0.3333333333"));
        assert_eq!(eval("2 / 3").unwrap(), dec("0.6666666667"));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0"), Err(EngineError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(EngineError::DivisionByZero));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval("\"total: \" + 19.99").unwrap(),
            Value::String("total: 19.99".into())
        );
        assert_eq!(
            eval("1.50 + \" EUR\"").unwrap(),
            Value::String("1.5 EUR".into())
        );
    }

    #[test]
    fn test_invalid_operation() {
        assert!(matches!(
            eval("true + 1"),
            Err(EngineError::InvalidOperation { .. })
        ));
        assert!(matches!(
            eval("\"a\" < 1"),
            Err(EngineError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("2 <= 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("0.1 + 0.2 == 0.3").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"abc\" < \"abd\"").unwrap(), Value::Bool(true));
        assert_eq!(eval("null == null").unwrap(), Value::Bool(true));
        assert_eq!(eval("[1] == [1]").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_logical_operators_return_bool() {
        assert_eq!(eval("1 && 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("0 || \"\"").unwrap(), Value::Bool(false));
        assert_eq!(eval("!0").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_short_circuit_skips_missing_variable() {
        // strict mode, $undef absent: the right side must not be evaluated
        assert_eq!(eval("false && $undef").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || $undef").unwrap(), Value::Bool(true));
        assert!(matches!(
            eval("true && $undef"),
            Err(EngineError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_conditional_short_circuits() {
        assert_eq!(eval("true ? 1 : $undef").unwrap(), dec("1"));
        assert_eq!(eval("false ? $undef : 2").unwrap(), dec("2"));
    }

    #[test]
    fn test_variable_resolution() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("price", dec("19.99"));
        ctx.set_variable("qty", Value::Float(3.0));
        assert_eq!(eval_with("$price * $qty", &ctx, true).unwrap(), dec("59.97"));
    }

    #[test]
    fn test_strict_vs_lenient_missing_variable() {
        let ctx = EvaluationContext::new();
        assert!(matches!(
            eval_with("$missing", &ctx, true),
            Err(EngineError::UndefinedVariable { .. })
        ));
        assert_eq!(eval_with("$missing", &ctx, false).unwrap(), Value::Null);
    }

    #[test]
    fn test_context_variables_pass_through() {
        let mut ctx = EvaluationContext::new();
        ctx.set_extra("factor", Value::Float(2.5));
        // @ values are returned as-is, no decimal upgrade
        assert_eq!(
            eval_with("@factor", &ctx, true).unwrap(),
            Value::Float(2.5)
        );
        assert!(matches!(
            eval_with("@missing", &ctx, true),
            Err(EngineError::UndefinedVariable { .. })
        ));
        assert_eq!(eval_with("@missing", &ctx, false).unwrap(), Value::Null);
    }

    #[test]
    fn test_collections_resolve_as_arrays() {
        let mut ctx = EvaluationContext::new();
        ctx.set_collection("rates", vec![dec("1"), dec("2")]);
        assert_eq!(
            eval_with("COUNT($rates)", &ctx, true).unwrap(),
            dec("2")
        );
    }

    #[test]
    fn test_member_access() {
        let ctx = EvaluationContext::from_json(&serde_json::json!({
            "customer": { "address": { "city": "NY" }, "age": 42 }
        }));
        assert_eq!(
            eval_with("$customer.address.city", &ctx, true).unwrap(),
            Value::String("NY".into())
        );
        assert_eq!(eval_with("$customer.age", &ctx, true).unwrap(), dec("42"));
        // absent key is null
        assert_eq!(
            eval_with("$customer.missing", &ctx, true).unwrap(),
            Value::Null
        );
        // non-object base is an error
        assert!(matches!(
            eval_with("$customer.age.x", &ctx, true),
            Err(EngineError::PropertyAccess { .. })
        ));
    }

    #[test]
    fn test_member_access_on_null() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("maybe", Value::Null);
        assert!(matches!(
            eval_with("$maybe.x", &ctx, true),
            Err(EngineError::PropertyAccess { .. })
        ));
        assert_eq!(eval_with("$maybe.x", &ctx, false).unwrap(), Value::Null);
    }

    #[test]
    fn test_index_access() {
        let ctx = EvaluationContext::from_json(&serde_json::json!({
            "items": [10, 20, 30],
            "table": { "a": 1 }
        }));
        assert_eq!(eval_with("$items[1]", &ctx, true).unwrap(), dec("20"));
        // out of range is null, not an error
        assert_eq!(eval_with("$items[9]", &ctx, true).unwrap(), Value::Null);
        assert_eq!(eval_with("$items[0 - 1]", &ctx, true).unwrap(), Value::Null);
        // object indexing stringifies the key
        assert_eq!(eval_with("$table[\"a\"]", &ctx, true).unwrap(), dec("1"));
        // non-indexable base
        assert!(matches!(
            eval_with("$table.a[0]", &ctx, true),
            Err(EngineError::IndexAccess { .. })
        ));
    }

    #[test]
    fn test_array_and_object_literals() {
        assert_eq!(
            eval("[1, 2][0]").unwrap(),
            dec("1")
        );
        assert_eq!(
            eval("{a: 1, b: 2}.b").unwrap(),
            dec("2")
        );
    }

    #[test]
    fn test_function_call_dispatch() {
        assert_eq!(eval("ABS(0 - 5)").unwrap(), dec("5"));
        assert!(matches!(
            eval("NO_SUCH_FN(1)"),
            Err(EngineError::UndefinedFunction { .. })
        ));
        assert!(matches!(
            eval("ABS(1, 2)"),
            Err(EngineError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_sum_with_iteration_binding() {
        let ctx = EvaluationContext::from_json(&serde_json::json!({
            "items": [{ "price": 10, "qty": 2 }, { "price": 5, "qty": 3 }]
        }));
        assert_eq!(
            eval_with("SUM($items, $it.price * $it.qty)", &ctx, true).unwrap(),
            dec("35")
        );
    }

    #[test]
    fn test_filter_and_map() {
        let ctx = EvaluationContext::from_json(&serde_json::json!({
            "xs": [1, 2, 3, 4]
        }));
        assert_eq!(
            eval_with("SUM(FILTER($xs, $it > 2))", &ctx, true).unwrap(),
            dec("7")
        );
        assert_eq!(
            eval_with("MAP($xs, $it * 10)", &ctx, true).unwrap(),
            Value::Array(vec![dec("10"), dec("20"), dec("30"), dec("40")])
        );
    }

    #[test]
    fn test_nested_iteration_does_not_leak() {
        let ctx = EvaluationContext::from_json(&serde_json::json!({
            "groups": [{ "items": [1, 2] }, { "items": [3] }]
        }));
        assert_eq!(
            eval_with("SUM($groups, SUM($it.items, $it))", &ctx, true).unwrap(),
            dec("6")
        );
    }

    #[test]
    fn test_max_iterations_guard() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable(
            "xs",
            Value::Array((0..100i64).map(Value::from).collect::<Vec<_>>()),
        );
        let ast = parse_expression("SUM($xs, $it)").unwrap();
        let registry = FunctionRegistry::new();
        let mut options = EvaluatorOptions::new();
        options.security.max_iterations = 10;
        let mut evaluator = Evaluator::new(&registry, &options);
        assert_eq!(
            evaluator.evaluate(&ast, &ctx),
            Err(EngineError::MaxIterations { limit: 10 })
        );
    }

    #[test]
    fn test_max_recursion_guard() {
        // left-associated additions nest the AST one level per term
        let source = "1 + ".repeat(40) + "1";
        let deep = parse_expression(&source).unwrap();
        let registry = FunctionRegistry::new();
        let mut options = EvaluatorOptions::new();
        options.security.max_recursion_depth = 16;
        let mut evaluator = Evaluator::new(&registry, &options);
        assert_eq!(
            evaluator.evaluate(&deep, &ctx_empty()),
            Err(EngineError::MaxRecursion { limit: 16 })
        );
    }

    fn ctx_empty() -> EvaluationContext {
        EvaluationContext::new()
    }

    #[test]
    fn test_accessed_variables_are_recorded() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("a", dec("1"));
        ctx.set_extra("b", dec("2"));
        let ast = parse_expression("$a + @b").unwrap();
        let registry = FunctionRegistry::new();
        let options = EvaluatorOptions::new();
        let mut evaluator = Evaluator::new(&registry, &options);
        evaluator.evaluate(&ast, &ctx).unwrap();
        let accessed: Vec<&String> = evaluator.accessed_variables().iter().collect();
        assert_eq!(accessed, vec!["a", "@b"]);
    }

    #[test]
    fn test_lenient_miss_still_recorded() {
        let ast = parse_expression("$ghost").unwrap();
        let registry = FunctionRegistry::new();
        let mut options = EvaluatorOptions::new();
        options.strict = false;
        let mut evaluator = Evaluator::new(&registry, &options);
        assert_eq!(evaluator.evaluate(&ast, &ctx_empty()).unwrap(), Value::Null);
        assert!(evaluator.accessed_variables().contains("ghost"));
    }

    #[test]
    fn test_ternary_chain() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("score", dec("85"));
        assert_eq!(
            eval_with(
                "$score >= 90 ? \"A\" : ($score >= 80 ? \"B\" : \"C\")",
                &ctx,
                true
            )
            .unwrap(),
            Value::String("B".into())
        );
        // unparenthesized form chains the same way
        assert_eq!(
            eval_with(
                "$score >= 90 ? \"A\" : $score >= 80 ? \"B\" : \"C\"",
                &ctx,
                true
            )
            .unwrap(),
            Value::String("B".into())
        );
    }
}
