//! Type conversion and inspection functions

use super::FunctionContext;
use reckon_core::{decimal, EngineError, EngineResult, Value};
use rust_decimal::Decimal;

/// NUMBER(x) - parse/coerce to Decimal
pub fn fn_number(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = match &args[0] {
        Value::Decimal(d) => *d,
        Value::Float(f) => decimal::from_f64(*f)?,
        Value::String(s) => decimal::parse(s)?,
        Value::Bool(true) => Decimal::ONE,
        Value::Bool(false) | Value::Null => Decimal::ZERO,
        other => {
            return Err(EngineError::InvalidDecimal {
                text: other.to_display_string(),
            })
        }
    };
    Ok(Value::Decimal(d))
}

/// STRING(x) - canonical text; decimals honor preserve_trailing_zeros
pub fn fn_string(args: &[Value], ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let text = match &args[0] {
        Value::Decimal(d) => {
            decimal::to_canonical_string(*d, ctx.decimal.preserve_trailing_zeros)
        }
        other => other.to_display_string(),
    };
    Ok(Value::String(text))
}

/// BOOLEAN(x) - truthiness
pub fn fn_boolean(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(args[0].is_truthy()))
}

/// TYPEOF(x)
pub fn fn_typeof(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::String(args[0].type_of().to_string()))
}
