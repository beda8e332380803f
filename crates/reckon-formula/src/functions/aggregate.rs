//! Aggregation and array functions
//!
//! Aggregations skip non-numeric elements rather than erroring, so lenient
//! pipelines with nulls stay total. `COUNT` counts every element.

use super::{array_arg, int_arg, opt_int_arg, FunctionContext};
use reckon_core::{decimal, EngineError, EngineResult, Value};
use rust_decimal::Decimal;

/// SUM(arr) - the two-argument iterating form is handled by the evaluator
pub fn fn_sum(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    if args[0].is_null() {
        return Ok(Value::Decimal(Decimal::ZERO));
    }
    let items = array_arg(args, 0, "SUM")?;
    let mut sum = Decimal::ZERO;
    for d in items.iter().filter_map(Value::as_decimal) {
        sum = decimal::add(sum, d)?;
    }
    Ok(Value::Decimal(sum))
}

/// AVG(arr) - mean of the numeric elements
pub fn fn_avg(args: &[Value], ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "AVG")?;
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for d in items.iter().filter_map(Value::as_decimal) {
        sum = decimal::add(sum, d)?;
        count += 1;
    }
    if count == 0 {
        return Err(EngineError::DivisionByZero);
    }
    decimal::div(
        sum,
        Decimal::from(count),
        ctx.decimal.division_scale,
        ctx.decimal.rounding_mode,
    )
    .map(Value::Decimal)
}

/// COUNT(arr) - number of elements
pub fn fn_count(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    if args[0].is_null() {
        return Ok(Value::Decimal(Decimal::ZERO));
    }
    let items = array_arg(args, 0, "COUNT")?;
    Ok(Value::Decimal(Decimal::from(items.len() as u64)))
}

/// PRODUCT(arr) - product of the numeric elements; empty is 1
pub fn fn_product(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "PRODUCT")?;
    let mut product = Decimal::ONE;
    for d in items.iter().filter_map(Value::as_decimal) {
        product = decimal::mul(product, d)?;
    }
    Ok(Value::Decimal(product))
}

/// FIRST(arr)
pub fn fn_first(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "FIRST")?;
    Ok(items.first().cloned().unwrap_or(Value::Null))
}

/// LAST(arr)
pub fn fn_last(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "LAST")?;
    Ok(items.last().cloned().unwrap_or(Value::Null))
}

/// REVERSE(arr)
pub fn fn_reverse(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "REVERSE")?;
    let mut reversed = items.to_vec();
    reversed.reverse();
    Ok(Value::Array(reversed))
}

/// SLICE(arr, start, end?) - negative indices count from the end
pub fn fn_slice(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "SLICE")?;
    let len = items.len() as i64;
    let clamp = |i: i64| -> usize {
        if i < 0 {
            (len + i).max(0) as usize
        } else {
            i.min(len) as usize
        }
    };
    let start = clamp(int_arg(args, 1, "SLICE")?);
    let end = clamp(opt_int_arg(args, 2, "SLICE")?.unwrap_or(len));
    if start >= end {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(Value::Array(items[start..end].to_vec()))
}

/// INCLUDES(arr, v)
pub fn fn_includes(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "INCLUDES")?;
    Ok(Value::Bool(items.iter().any(|item| item.loose_eq(&args[1]))))
}

/// INDEXOF(arr, v) - first position, or -1 if missing
pub fn fn_indexof(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "INDEXOF")?;
    let index = items
        .iter()
        .position(|item| item.loose_eq(&args[1]))
        .map(|i| Decimal::from(i as u64))
        .unwrap_or(Decimal::NEGATIVE_ONE);
    Ok(Value::Decimal(index))
}

/// FLATTEN(arr, depth = 1)
pub fn fn_flatten(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let items = array_arg(args, 0, "FLATTEN")?;
    let depth = opt_int_arg(args, 1, "FLATTEN")?.unwrap_or(1).max(0);
    let mut flat = Vec::new();
    flatten_into(items, depth, &mut flat);
    Ok(Value::Array(flat))
}

fn flatten_into(items: &[Value], depth: i64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten_into(inner, depth - 1, out),
            other => out.push(other.clone()),
        }
    }
}
