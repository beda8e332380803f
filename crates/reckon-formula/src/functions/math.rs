//! Math functions
//!
//! Everything computes on Decimal. Binary floats are coerced on the way in
//! and never come back out.

use super::{decimal_arg, mismatch, opt_int_arg, FunctionContext};
use reckon_core::{decimal, EngineError, EngineResult, RoundingMode, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Round `d` at `p` digits; negative `p` rounds left of the decimal point
fn round_at(d: Decimal, p: i64, mode: RoundingMode) -> EngineResult<Decimal> {
    if p >= 0 {
        return Ok(decimal::round(d, p.min(decimal::MAX_SCALE as i64) as u32, mode));
    }
    let shift = (-p).min(decimal::MAX_SCALE as i64) as u32;
    let factor = Decimal::from_i128_with_scale(10_i128.pow(shift), 0);
    let scaled = decimal::div(d, factor, 0, mode)?;
    decimal::mul(scaled, factor)
}

/// Optional rounding-mode argument; falls back to the configured default
fn mode_arg(
    args: &[Value],
    idx: usize,
    function: &str,
    ctx: &FunctionContext<'_>,
) -> EngineResult<RoundingMode> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(ctx.decimal.rounding_mode),
        Some(value) => value
            .as_str()
            .and_then(RoundingMode::from_name)
            .ok_or_else(|| mismatch("rounding mode", value, function, idx)),
    }
}

/// ABS(x)
pub fn fn_abs(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "ABS")?;
    Ok(Value::Decimal(d.abs()))
}

/// ROUND(x, p = 0, mode?)
pub fn fn_round(args: &[Value], ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "ROUND")?;
    let p = opt_int_arg(args, 1, "ROUND")?.unwrap_or(0);
    let mode = mode_arg(args, 2, "ROUND", ctx)?;
    round_at(d, p, mode).map(Value::Decimal)
}

/// FLOOR(x, p = 0)
pub fn fn_floor(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "FLOOR")?;
    let p = opt_int_arg(args, 1, "FLOOR")?.unwrap_or(0);
    round_at(d, p, RoundingMode::Floor).map(Value::Decimal)
}

/// CEIL(x, p = 0)
pub fn fn_ceil(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "CEIL")?;
    let p = opt_int_arg(args, 1, "CEIL")?.unwrap_or(0);
    round_at(d, p, RoundingMode::Ceil).map(Value::Decimal)
}

/// TRUNCATE(x, p = 0)
pub fn fn_truncate(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "TRUNCATE")?;
    let p = opt_int_arg(args, 1, "TRUNCATE")?.unwrap_or(0);
    round_at(d, p, RoundingMode::Down).map(Value::Decimal)
}

fn reduce_extremum(args: &[Value], function: &str, keep_left: fn(&Decimal, &Decimal) -> bool) -> EngineResult<Value> {
    let mut best: Option<Decimal> = None;
    let mut consider = |d: Decimal| {
        best = Some(match best {
            None => d,
            Some(current) => {
                if keep_left(&d, &current) {
                    d
                } else {
                    current
                }
            }
        });
    };

    if args.len() == 1 {
        match &args[0] {
            // single array argument reduces over its numeric elements
            Value::Array(items) => {
                for d in items.iter().filter_map(Value::as_decimal) {
                    consider(d);
                }
            }
            other => consider(
                other
                    .as_decimal()
                    .ok_or_else(|| mismatch("number or array", other, function, 0))?,
            ),
        }
    } else {
        for d in args.iter().filter_map(Value::as_decimal) {
            consider(d);
        }
    }

    Ok(Value::Decimal(best.unwrap_or(Decimal::ZERO)))
}

/// MIN(a, ...) - variadic, or a single array to reduce over
pub fn fn_min(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    reduce_extremum(args, "MIN", |candidate, current| candidate < current)
}

/// MAX(a, ...) - variadic, or a single array to reduce over
pub fn fn_max(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    reduce_extremum(args, "MAX", |candidate, current| candidate > current)
}

/// POW(x, y)
pub fn fn_pow(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let base = decimal_arg(args, 0, "POW")?;
    let exponent = decimal_arg(args, 1, "POW")?;
    decimal::pow(base, exponent).map(Value::Decimal)
}

/// SQRT(x)
pub fn fn_sqrt(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "SQRT")?;
    decimal::sqrt(d).map(Value::Decimal)
}

/// LOG(x) - natural logarithm
pub fn fn_log(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "LOG")?;
    decimal::ln(d).map(Value::Decimal)
}

/// LOG10(x)
pub fn fn_log10(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "LOG10")?;
    decimal::log10(d).map(Value::Decimal)
}

/// EXP(x) - e^x
pub fn fn_exp(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "EXP")?;
    decimal::exp(d).map(Value::Decimal)
}

/// SIGN(x) - -1, 0, or 1
pub fn fn_sign(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "SIGN")?;
    let sign = match d.cmp(&Decimal::ZERO) {
        Ordering::Less => Decimal::NEGATIVE_ONE,
        Ordering::Equal => Decimal::ZERO,
        Ordering::Greater => Decimal::ONE,
    };
    Ok(Value::Decimal(sign))
}

/// DECIMAL(x, scale?) - convert to Decimal, optionally rescaling
pub fn fn_decimal(args: &[Value], ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = match &args[0] {
        Value::String(s) => decimal::parse(s)?,
        other => other
            .as_decimal()
            .ok_or_else(|| mismatch("number or numeric string", other, "DECIMAL", 0))?,
    };
    match opt_int_arg(args, 1, "DECIMAL")? {
        Some(scale) => round_at(d, scale, ctx.decimal.rounding_mode).map(Value::Decimal),
        None => Ok(Value::Decimal(d)),
    }
}

/// SCALE(x) - digits after the decimal point
pub fn fn_scale(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "SCALE")?;
    Ok(Value::Decimal(Decimal::from(d.scale())))
}

/// PRECISION(x) - total significant digits
pub fn fn_precision(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let d = decimal_arg(args, 0, "PRECISION")?;
    Ok(Value::Decimal(Decimal::from(decimal::precision(d))))
}

/// DIVIDE(a, b, scale?, mode?)
pub fn fn_divide(args: &[Value], ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let a = decimal_arg(args, 0, "DIVIDE")?;
    let b = decimal_arg(args, 1, "DIVIDE")?;
    if b.is_zero() {
        return Err(EngineError::DivisionByZero);
    }
    let scale = opt_int_arg(args, 2, "DIVIDE")?
        .unwrap_or(ctx.decimal.division_scale as i64)
        .clamp(0, decimal::MAX_SCALE as i64) as u32;
    let mode = mode_arg(args, 3, "DIVIDE", ctx)?;
    decimal::div(a, b, scale, mode).map(Value::Decimal)
}

/// MOD(a, b) - same semantics as the `%` operator
pub fn fn_mod(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let a = decimal_arg(args, 0, "MOD")?;
    let b = decimal_arg(args, 1, "MOD")?;
    if b.is_zero() {
        return Err(EngineError::DivisionByZero);
    }
    decimal::rem(a, b).map(Value::Decimal)
}
