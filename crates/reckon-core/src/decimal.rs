//! Arbitrary-precision decimal adapter
//!
//! Wraps `rust_decimal::Decimal` (96-bit integer mantissa with a decimal
//! scale tag, `maths` feature for transcendentals) behind the small set of
//! operations the engine needs. All fallible operations return
//! [`EngineResult`] - nothing here panics.
//!
//! The backend has no HALF_ODD strategy, so that mode is implemented here
//! with true round-half-to-odd semantics.

use crate::error::{EngineError, EngineResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use std::cmp::Ordering;

/// Maximum scale the backend can represent
pub const MAX_SCALE: u32 = 28;

/// Rounding algorithm applied when a value is reduced to a given scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Toward positive infinity
    Ceil,
    /// Toward negative infinity
    Floor,
    /// Toward zero
    Down,
    /// Away from zero
    Up,
    /// Half away from zero
    HalfUp,
    /// Half toward zero
    HalfDown,
    /// Half to the even neighbor
    HalfEven,
    /// Half to the odd neighbor
    HalfOdd,
}

impl RoundingMode {
    /// Parse a mode name, case-insensitive (`"HALF_UP"`, `"floor"`, ...)
    pub fn from_name(name: &str) -> Option<RoundingMode> {
        match name.to_ascii_uppercase().as_str() {
            "CEIL" | "CEILING" => Some(RoundingMode::Ceil),
            "FLOOR" => Some(RoundingMode::Floor),
            "DOWN" => Some(RoundingMode::Down),
            "UP" => Some(RoundingMode::Up),
            "HALF_UP" => Some(RoundingMode::HalfUp),
            "HALF_DOWN" => Some(RoundingMode::HalfDown),
            "HALF_EVEN" => Some(RoundingMode::HalfEven),
            "HALF_ODD" => Some(RoundingMode::HalfOdd),
            _ => None,
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::Ceil => "CEIL",
            RoundingMode::Floor => "FLOOR",
            RoundingMode::Down => "DOWN",
            RoundingMode::Up => "UP",
            RoundingMode::HalfUp => "HALF_UP",
            RoundingMode::HalfDown => "HALF_DOWN",
            RoundingMode::HalfEven => "HALF_EVEN",
            RoundingMode::HalfOdd => "HALF_ODD",
        }
    }

    fn strategy(&self) -> Option<RoundingStrategy> {
        match self {
            RoundingMode::Ceil => Some(RoundingStrategy::ToPositiveInfinity),
            RoundingMode::Floor => Some(RoundingStrategy::ToNegativeInfinity),
            RoundingMode::Down => Some(RoundingStrategy::ToZero),
            RoundingMode::Up => Some(RoundingStrategy::AwayFromZero),
            RoundingMode::HalfUp => Some(RoundingStrategy::MidpointAwayFromZero),
            RoundingMode::HalfDown => Some(RoundingStrategy::MidpointTowardZero),
            RoundingMode::HalfEven => Some(RoundingStrategy::MidpointNearestEven),
            RoundingMode::HalfOdd => None,
        }
    }
}

/// Parse decimal text, including scientific notation
pub fn parse(text: &str) -> EngineResult<Decimal> {
    let trimmed = text.trim();
    let invalid = || EngineError::InvalidDecimal {
        text: text.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.contains('e') || trimmed.contains('E') {
        Decimal::from_scientific(trimmed).map_err(|_| invalid())
    } else {
        trimmed.parse::<Decimal>().map_err(|_| invalid())
    }
}

/// Convert a binary float, rejecting NaN and infinities
pub fn from_f64(f: f64) -> EngineResult<Decimal> {
    Decimal::from_f64(f).ok_or(EngineError::InvalidDecimal {
        text: f.to_string(),
    })
}

/// Lossy conversion to a binary float; `None` when out of range
pub fn to_f64(d: Decimal) -> Option<f64> {
    ToPrimitive::to_f64(&d)
}

/// Canonical decimal text; trailing zeros are stripped unless preserved
pub fn to_canonical_string(d: Decimal, preserve_trailing_zeros: bool) -> String {
    if preserve_trailing_zeros {
        d.to_string()
    } else {
        d.normalize().to_string()
    }
}

/// Round to `scale` fractional digits with the given mode
pub fn round(d: Decimal, scale: u32, mode: RoundingMode) -> Decimal {
    let scale = scale.min(MAX_SCALE);
    match mode.strategy() {
        Some(strategy) => d.round_dp_with_strategy(scale, strategy),
        None => round_half_odd(d, scale),
    }
}

/// Round-half-to-odd: exact midpoints go to the neighbor with an odd final
/// digit, everything else rounds as HALF_UP.
fn round_half_odd(d: Decimal, scale: u32) -> Decimal {
    if d.scale() <= scale {
        return d;
    }
    let truncated = d.trunc_with_scale(scale);
    let remainder = (d - truncated).abs();
    let half = Decimal::new(5, scale + 1);
    let step = Decimal::new(1, scale);
    let away = if d.is_sign_negative() {
        truncated - step
    } else {
        truncated + step
    };
    match remainder.cmp(&half) {
        Ordering::Less => truncated,
        Ordering::Greater => away,
        Ordering::Equal => {
            // The kept digit is odd only when truncation produced a value
            // at exactly the target scale with an odd mantissa.
            let kept_is_odd = truncated.scale() == scale && truncated.mantissa() % 2 != 0;
            if kept_is_odd {
                truncated
            } else {
                away
            }
        }
    }
}

/// Checked addition
pub fn add(a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_add(b).ok_or(EngineError::DecimalOverflow)
}

/// Checked subtraction
pub fn sub(a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_sub(b).ok_or(EngineError::DecimalOverflow)
}

/// Checked multiplication
pub fn mul(a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_mul(b).ok_or(EngineError::DecimalOverflow)
}

/// Division carried to `scale` fractional digits with the given mode
pub fn div(a: Decimal, b: Decimal, scale: u32, mode: RoundingMode) -> EngineResult<Decimal> {
    if b.is_zero() {
        return Err(EngineError::DecimalDivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(EngineError::DecimalOverflow)?;
    Ok(round(quotient, scale, mode))
}

/// Remainder; the sign follows the dividend
pub fn rem(a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    if b.is_zero() {
        return Err(EngineError::DecimalDivisionByZero);
    }
    a.checked_rem(b).ok_or(EngineError::DecimalOverflow)
}

/// Power with any numeric exponent; integral exponents are computed exactly
pub fn pow(base: Decimal, exponent: Decimal) -> EngineResult<Decimal> {
    if exponent.fract().is_zero() {
        if let Some(e) = exponent.to_i64() {
            if base.is_zero() && e < 0 {
                return Err(EngineError::DecimalDivisionByZero);
            }
            return base.checked_powi(e).ok_or(EngineError::DecimalOverflow);
        }
    }
    if base.is_sign_negative() {
        return Err(EngineError::InvalidOperation {
            operator: "^".into(),
            operand_types: vec!["negative base".into(), "fractional exponent".into()],
        });
    }
    if base.is_zero() {
        if exponent.is_sign_negative() {
            return Err(EngineError::DecimalDivisionByZero);
        }
        return Ok(Decimal::ZERO);
    }
    base.checked_powd(exponent).ok_or(EngineError::DecimalOverflow)
}

/// Square root; negative input is a domain error
pub fn sqrt(d: Decimal) -> EngineResult<Decimal> {
    if d.is_sign_negative() && !d.is_zero() {
        return Err(EngineError::InvalidOperation {
            operator: "SQRT".into(),
            operand_types: vec!["negative decimal".into()],
        });
    }
    d.sqrt().ok_or(EngineError::DecimalOverflow)
}

/// Natural logarithm; input must be positive
pub fn ln(d: Decimal) -> EngineResult<Decimal> {
    if d <= Decimal::ZERO {
        return Err(EngineError::InvalidOperation {
            operator: "LOG".into(),
            operand_types: vec!["non-positive decimal".into()],
        });
    }
    Ok(d.ln())
}

/// Base-10 logarithm; input must be positive
pub fn log10(d: Decimal) -> EngineResult<Decimal> {
    if d <= Decimal::ZERO {
        return Err(EngineError::InvalidOperation {
            operator: "LOG10".into(),
            operand_types: vec!["non-positive decimal".into()],
        });
    }
    Ok(d.log10())
}

/// e^x
pub fn exp(d: Decimal) -> EngineResult<Decimal> {
    d.checked_exp().ok_or(EngineError::DecimalOverflow)
}

/// Total count of significant digits in the mantissa
pub fn precision(d: Decimal) -> u32 {
    let mantissa = d.mantissa().abs();
    if mantissa == 0 {
        return 1;
    }
    let mut digits = 0u32;
    let mut m = mantissa;
    while m > 0 {
        digits += 1;
        m /= 10;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        parse(s).unwrap()
    }

    #[test]
    fn test_parse_exact_text() {
        assert_eq!(dec("0.10").to_string(), "0.10");
        assert_eq!(dec("  19.99 "), dec("19.99"));
        assert_eq!(dec("1.5e3"), dec("1500"));
        assert!(parse("abc").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_exact_arithmetic() {
        assert_eq!(add(dec("0.1"), dec("0.2")).unwrap(), dec("0.3"));
        assert_eq!(sub(dec("1000.10"), dec("1000.00")).unwrap(), dec("0.10"));
        assert_eq!(mul(dec("19.99"), dec("3")).unwrap(), dec("59.97"));
    }

    #[test]
    fn test_division_scale_and_mode() {
        let q = div(dec("1"), dec("3"), 10, RoundingMode::HalfUp).unwrap();
        assert_eq!(q, dec("0.3333333333"));
        let q = div(dec("2"), dec("3"), 4, RoundingMode::HalfUp).unwrap();
        assert_eq!(q, dec("0.6667"));
        let q = div(dec("2"), dec("3"), 4, RoundingMode::Floor).unwrap();
        assert_eq!(q, dec("0.6666"));
        assert_eq!(
            div(dec("1"), Decimal::ZERO, 10, RoundingMode::HalfUp),
            Err(EngineError::DecimalDivisionByZero)
        );
    }

    #[test]
    fn test_rem() {
        assert_eq!(rem(dec("10"), dec("3")).unwrap(), dec("1"));
        assert_eq!(rem(dec("-10"), dec("3")).unwrap(), dec("-1"));
        assert!(rem(dec("1"), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_rounding_modes() {
        let x = dec("2.5");
        assert_eq!(round(x, 0, RoundingMode::HalfUp), dec("3"));
        assert_eq!(round(x, 0, RoundingMode::HalfDown), dec("2"));
        assert_eq!(round(x, 0, RoundingMode::HalfEven), dec("2"));
        assert_eq!(round(x, 0, RoundingMode::HalfOdd), dec("3"));
        assert_eq!(round(dec("-2.5"), 0, RoundingMode::HalfOdd), dec("-3"));
        assert_eq!(round(dec("1.5"), 0, RoundingMode::HalfOdd), dec("1"));

        assert_eq!(round(dec("1.01"), 0, RoundingMode::Ceil), dec("2"));
        assert_eq!(round(dec("-1.01"), 0, RoundingMode::Ceil), dec("-1"));
        assert_eq!(round(dec("1.99"), 0, RoundingMode::Floor), dec("1"));
        assert_eq!(round(dec("-1.01"), 0, RoundingMode::Floor), dec("-2"));
        assert_eq!(round(dec("1.99"), 0, RoundingMode::Down), dec("1"));
        assert_eq!(round(dec("1.01"), 0, RoundingMode::Up), dec("2"));
    }

    #[test]
    fn test_round_half_odd_at_scale() {
        // away/toward on non-midpoints, odd neighbor on midpoints
        assert_eq!(round(dec("1.26"), 1, RoundingMode::HalfOdd), dec("1.3"));
        assert_eq!(round(dec("1.24"), 1, RoundingMode::HalfOdd), dec("1.2"));
        assert_eq!(round(dec("1.15"), 1, RoundingMode::HalfOdd), dec("1.1"));
        assert_eq!(round(dec("1.05"), 1, RoundingMode::HalfOdd), dec("1.1"));
    }

    #[test]
    fn test_pow() {
        assert_eq!(pow(dec("2"), dec("10")).unwrap(), dec("1024"));
        assert_eq!(pow(dec("2"), dec("-2")).unwrap(), dec("0.25"));
        assert_eq!(pow(dec("9"), dec("0.5")).unwrap().round_dp(10), dec("3"));
        assert!(pow(Decimal::ZERO, dec("-1")).is_err());
        assert!(pow(dec("-2"), dec("0.5")).is_err());
    }

    #[test]
    fn test_sqrt_ln_log10() {
        assert_eq!(sqrt(dec("144")).unwrap().round_dp(10), dec("12"));
        assert!(sqrt(dec("-1")).is_err());
        assert_eq!(ln(dec("1")).unwrap(), Decimal::ZERO);
        assert!(ln(Decimal::ZERO).is_err());
        assert_eq!(log10(dec("1000")).unwrap().round_dp(10), dec("3"));
        assert!(log10(dec("-5")).is_err());
    }

    #[test]
    fn test_precision_and_scale() {
        assert_eq!(precision(dec("123.45")), 5);
        assert_eq!(precision(dec("0.05")), 1);
        assert_eq!(precision(Decimal::ZERO), 1);
        assert_eq!(dec("123.45").scale(), 2);
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(to_f64(dec("2.5")), Some(2.5));
        assert_eq!(from_f64(2.5).unwrap(), dec("2.5"));
        assert!(from_f64(f64::NAN).is_err());
        assert!(from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(to_canonical_string(dec("0.100"), false), "0.1");
        assert_eq!(to_canonical_string(dec("0.100"), true), "0.100");
        assert_eq!(to_canonical_string(dec("500"), false), "500");
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(RoundingMode::from_name("half_up"), Some(RoundingMode::HalfUp));
        assert_eq!(RoundingMode::from_name("CEIL"), Some(RoundingMode::Ceil));
        assert_eq!(RoundingMode::from_name("bogus"), None);
        assert_eq!(RoundingMode::HalfOdd.as_str(), "HALF_ODD");
    }
}
