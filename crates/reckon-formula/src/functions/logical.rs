//! Logical functions
//!
//! `IF` evaluates all three arguments eagerly, unlike the `?:` operator.
//! The word forms AND/OR/NOT lex as operators, so these registrations are
//! reached through overrides and programmatic lookup.

use super::FunctionContext;
use reckon_core::{EngineResult, Value};

/// IF(cond, then, else)
pub fn fn_if(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    if args[0].is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args[2].clone())
    }
}

/// COALESCE(...) - first non-null argument
pub fn fn_coalesce(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    for arg in args {
        if !arg.is_null() {
            return Ok(arg.clone());
        }
    }
    Ok(Value::Null)
}

/// ISNULL(v)
pub fn fn_isnull(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(args[0].is_null()))
}

/// ISEMPTY(v) - null, empty string, empty array, or empty object
pub fn fn_isempty(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(args[0].is_empty_value()))
}

/// DEFAULT(v, d) - d when v is null
pub fn fn_default(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    if args[0].is_null() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

/// AND(...) - true when every argument is truthy
pub fn fn_and(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(args.iter().all(Value::is_truthy)))
}

/// OR(...) - true when any argument is truthy
pub fn fn_or(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

/// NOT(v)
pub fn fn_not(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    Ok(Value::Bool(!args[0].is_truthy()))
}
