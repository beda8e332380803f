//! String functions
//!
//! Positions and lengths are in characters, not bytes, so multi-byte input
//! behaves sanely.

use super::{int_arg, mismatch, opt_int_arg, string_arg, FunctionContext};
use reckon_core::{EngineResult, Value};
use rust_decimal::Decimal;

/// LEN(s) - character count of a string, or element count of an array
pub fn fn_len(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => return Err(mismatch("string or array", other, "LEN", 0)),
    };
    Ok(Value::Decimal(Decimal::from(len as u64)))
}

/// UPPER(s)
pub fn fn_upper(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "UPPER")?;
    Ok(Value::String(s.to_uppercase()))
}

/// LOWER(s)
pub fn fn_lower(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "LOWER")?;
    Ok(Value::String(s.to_lowercase()))
}

/// TRIM(s)
pub fn fn_trim(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "TRIM")?;
    Ok(Value::String(s.trim().to_string()))
}

/// CONCAT(...) - stringify and join every argument
pub fn fn_concat(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.to_display_string());
    }
    Ok(Value::String(out))
}

/// SUBSTR(s, start, len?) - negative start counts from the end
pub fn fn_substr(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "SUBSTR")?;
    let chars: Vec<char> = s.chars().collect();
    let total = chars.len() as i64;

    let start = int_arg(args, 1, "SUBSTR")?;
    let start = if start < 0 {
        (total + start).max(0)
    } else {
        start.min(total)
    } as usize;

    let len = match opt_int_arg(args, 2, "SUBSTR")? {
        Some(len) => len.max(0) as usize,
        None => chars.len(),
    };

    Ok(Value::String(chars.iter().skip(start).take(len).collect()))
}

/// REPLACE(s, find, rep) - replaces all occurrences
pub fn fn_replace(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "REPLACE")?;
    let find = string_arg(args, 1, "REPLACE")?;
    let rep = string_arg(args, 2, "REPLACE")?;
    if find.is_empty() {
        return Ok(Value::String(s.to_string()));
    }
    Ok(Value::String(s.replace(find, rep)))
}

/// CONTAINS(s, needle)
pub fn fn_contains(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "CONTAINS")?;
    let needle = string_arg(args, 1, "CONTAINS")?;
    Ok(Value::Bool(s.contains(needle)))
}

/// STARTSWITH(s, prefix)
pub fn fn_startswith(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "STARTSWITH")?;
    let prefix = string_arg(args, 1, "STARTSWITH")?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

/// ENDSWITH(s, suffix)
pub fn fn_endswith(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let s = string_arg(args, 0, "ENDSWITH")?;
    let suffix = string_arg(args, 1, "ENDSWITH")?;
    Ok(Value::Bool(s.ends_with(suffix)))
}
