//! Table lookup functions
//!
//! LOOKUP and RANGE return Decimal 0 instead of raising when nothing
//! matches; they sit at the bottom of cascading pricing tables and a miss
//! must stay total. Shape errors (criteria not an object, table not an
//! array) still raise.

use super::{mismatch, string_arg, FunctionContext};
use indexmap::IndexMap;
use reckon_core::{decimal, EngineResult, Value};
use rust_decimal::Decimal;

fn zero() -> Value {
    Value::Decimal(Decimal::ZERO)
}

/// Row-field vs criterion equality: numerics compare through Decimal, a
/// Decimal against a string compares by stringified form.
fn criterion_matches(row_value: &Value, criterion: &Value) -> bool {
    if row_value.is_numeric() && criterion.is_numeric() {
        return row_value.loose_eq(criterion);
    }
    match (row_value, criterion) {
        (Value::String(_), Value::Decimal(_) | Value::Float(_))
        | (Value::Decimal(_) | Value::Float(_), Value::String(_)) => {
            row_value.to_display_string() == criterion.to_display_string()
        }
        _ => row_value.loose_eq(criterion),
    }
}

fn field<'a>(row: &'a IndexMap<String, Value>, name: &str) -> Option<&'a Value> {
    row.get(name)
}

/// Upgrade primitive floats when handing a row field back out
fn read_field(row: &IndexMap<String, Value>, name: &str) -> Value {
    match field(row, name) {
        Some(Value::Float(f)) => decimal::from_f64(*f)
            .map(Value::Decimal)
            .unwrap_or(Value::Float(*f)),
        Some(other) => other.clone(),
        None => zero(),
    }
}

/// LOOKUP(table, criteria, returnField)
///
/// Linear scan; a row matches when every criteria key equals the row's
/// field. Empty criteria match the first row. No match, a null table, or a
/// missing return field all yield Decimal 0.
pub fn fn_lookup(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let criteria = match &args[1] {
        Value::Object(map) => map,
        other => return Err(mismatch("object", other, "LOOKUP", 1)),
    };
    let return_field = string_arg(args, 2, "LOOKUP")?;

    let rows = match &args[0] {
        Value::Array(rows) => rows,
        Value::Null => return Ok(zero()),
        other => return Err(mismatch("array", other, "LOOKUP", 0)),
    };

    for row in rows {
        let fields = match row {
            Value::Object(fields) => fields,
            _ => continue,
        };
        let matches = criteria.iter().all(|(key, want)| {
            field(fields, key).map_or(false, |got| criterion_matches(got, want))
        });
        if matches {
            return Ok(read_field(fields, return_field));
        }
    }
    Ok(zero())
}

/// RANGE(table, value, minField, maxField, returnField)
///
/// First row where `row[minField] <= value < row[maxField]`; a null or
/// missing max field is an open upper bound. No match yields Decimal 0.
pub fn fn_range(args: &[Value], _ctx: &FunctionContext<'_>) -> EngineResult<Value> {
    let value = args[1]
        .as_decimal()
        .ok_or_else(|| mismatch("number", &args[1], "RANGE", 1))?;
    let min_field = string_arg(args, 2, "RANGE")?;
    let max_field = string_arg(args, 3, "RANGE")?;
    let return_field = string_arg(args, 4, "RANGE")?;

    let rows = match &args[0] {
        Value::Array(rows) => rows,
        Value::Null => return Ok(zero()),
        other => return Err(mismatch("array", other, "RANGE", 0)),
    };

    for row in rows {
        let fields = match row {
            Value::Object(fields) => fields,
            _ => continue,
        };
        let min = match field(fields, min_field).and_then(Value::as_decimal) {
            Some(min) => min,
            None => continue,
        };
        if value < min {
            continue;
        }
        let in_range = match field(fields, max_field) {
            None | Some(Value::Null) => true,
            Some(max_value) => match max_value.as_decimal() {
                Some(max) => value < max,
                None => continue,
            },
        };
        if in_range {
            return Ok(read_field(fields, return_field));
        }
    }
    Ok(zero())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, dec};
    use reckon_core::Value;

    fn tax_table() -> Value {
        Value::from_json(&serde_json::json!([
            { "region": "US", "category": "food", "rate": 0.02 },
            { "region": "EU", "category": "food", "rate": 0.10 },
        ]))
    }

    fn tiers() -> Value {
        Value::from_json(&serde_json::json!([
            { "min": 0, "max": 1000, "rate": 0.10 },
            { "min": 1000, "max": 5000, "rate": 0.15 },
            { "min": 5000, "max": null, "rate": 0.20 },
        ]))
    }

    fn criteria(pairs: &[(&str, Value)]) -> Value {
        let mut map = indexmap::IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        Value::Object(map)
    }

    #[test]
    fn test_lookup_match() {
        let crit = criteria(&[
            ("region", Value::from("EU")),
            ("category", Value::from("food")),
        ]);
        assert_eq!(
            call("LOOKUP", &[tax_table(), crit, Value::from("rate")]).unwrap(),
            dec("0.10")
        );
    }

    #[test]
    fn test_lookup_no_match_is_zero() {
        let crit = criteria(&[("region", Value::from("JP"))]);
        assert_eq!(
            call("LOOKUP", &[tax_table(), crit, Value::from("rate")]).unwrap(),
            dec("0")
        );
    }

    #[test]
    fn test_lookup_null_table_and_missing_field_are_zero() {
        let crit = criteria(&[("region", Value::from("EU"))]);
        assert_eq!(
            call("LOOKUP", &[Value::Null, crit.clone(), Value::from("rate")]).unwrap(),
            dec("0")
        );
        assert_eq!(
            call("LOOKUP", &[tax_table(), crit, Value::from("ghost")]).unwrap(),
            dec("0")
        );
    }

    #[test]
    fn test_lookup_empty_criteria_matches_first_row() {
        assert_eq!(
            call("LOOKUP", &[tax_table(), criteria(&[]), Value::from("rate")]).unwrap(),
            dec("0.02")
        );
    }

    #[test]
    fn test_lookup_numeric_and_string_criteria() {
        let table = Value::from_json(&serde_json::json!([
            { "code": 10, "label": "a" },
            { "code": 20, "label": "b" },
        ]));
        // numeric criterion against numeric field
        assert_eq!(
            call(
                "LOOKUP",
                &[table.clone(), criteria(&[("code", dec("20"))]), Value::from("label")]
            )
            .unwrap(),
            Value::from("b")
        );
        // decimal criterion against a string field compares stringified
        let table = Value::from_json(&serde_json::json!([{ "code": "20", "label": "b" }]));
        assert_eq!(
            call(
                "LOOKUP",
                &[table, criteria(&[("code", dec("20"))]), Value::from("label")]
            )
            .unwrap(),
            Value::from("b")
        );
    }

    #[test]
    fn test_lookup_shape_errors_raise() {
        assert!(call("LOOKUP", &[tax_table(), dec("1"), Value::from("rate")]).is_err());
        assert!(call(
            "LOOKUP",
            &[Value::from("nope"), criteria(&[]), Value::from("rate")]
        )
        .is_err());
    }

    #[test]
    fn test_range_boundaries() {
        let args = |v: Value| {
            [
                tiers(),
                v,
                Value::from("min"),
                Value::from("max"),
                Value::from("rate"),
            ]
        };
        // lower bound is inclusive, upper bound exclusive
        assert_eq!(call("RANGE", &args(dec("1000"))).unwrap(), dec("0.15"));
        assert_eq!(call("RANGE", &args(dec("999.99"))).unwrap(), dec("0.10"));
        // null max is an open upper bound
        assert_eq!(call("RANGE", &args(dec("5000"))).unwrap(), dec("0.20"));
        assert_eq!(call("RANGE", &args(dec("1000000"))).unwrap(), dec("0.20"));
        // below every tier
        assert_eq!(call("RANGE", &args(dec("-5"))).unwrap(), dec("0"));
    }
}
