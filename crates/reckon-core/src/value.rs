//! Runtime values
//!
//! Values are untyped at the language level: every evaluator operation
//! dispatches on the variant and coerces explicitly. Decimal is the canonical
//! numeric type; `Float` exists only as a pass-through for explicitly
//! float-typed literals and inputs.

use crate::decimal;
use crate::error::EngineResult;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;

/// Runtime value produced by evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Decimal(Decimal),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Type name as reported by `TYPEOF`
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Decimal(_) | Value::Float(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion; `None` for non-numeric variants or unrepresentable
    /// floats
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Float(f) => decimal::from_f64(*f).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness: `Bool` as-is; `Null` false; numeric zero false; empty
    /// string/array false; objects true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Decimal(d) => !d.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Emptiness as seen by `ISEMPTY`
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Equality as applied by the `==` operator: numeric variants compare
    /// through Decimal, scalars compare structurally, and arrays/objects
    /// compare by identity - which owned trees never share, so they are
    /// never equal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.as_decimal(), b.as_decimal()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Ordering for `<`/`<=`/`>`/`>=`: numeric via Decimal, strings
    /// lexicographically; anything else is unordered
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        if self.is_numeric() && other.is_numeric() {
            return Some(self.as_decimal()?.cmp(&other.as_decimal()?));
        }
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Human-readable rendering used by string concatenation and `STRING`
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Decimal(d) => decimal::to_canonical_string(*d, false),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
        }
    }

    /// Structural JSON; Decimal serializes as its canonical text, never as a
    /// binary float
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Decimal(d) => {
                serde_json::Value::String(decimal::to_canonical_string(*d, false))
            }
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }

    /// Build a value from JSON. Numbers are parsed through their textual
    /// form so decimal precision survives entry; numbers outside the decimal
    /// range fall back to `Float`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match decimal::parse(&n.to_string()) {
                Ok(d) => Value::Decimal(d),
                Err(_) => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut obj = IndexMap::new();
                for (k, v) in map {
                    obj.insert(k.clone(), Value::from_json(v));
                }
                Value::Object(obj)
            }
        }
    }

    /// Recursively upgrade `Float` to `Decimal`, including inside arrays and
    /// objects. Floats with no exact decimal form are left as floats.
    pub fn convert_floats(self) -> Value {
        match self {
            Value::Float(f) => match decimal::from_f64(f) {
                Ok(d) => Value::Decimal(d),
                Err(_) => Value::Float(f),
            },
            Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::convert_floats).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.convert_floats()))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Decimal(Decimal::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

/// Parse a decimal out of text, for callers building contexts by hand
pub fn parse_decimal_value(text: &str) -> EngineResult<Value> {
    decimal::parse(text).map(Value::Decimal)
}
