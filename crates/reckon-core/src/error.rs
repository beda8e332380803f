//! The unified error taxonomy
//!
//! One enum covers every failure the engine can report, from lexing through
//! batch evaluation. Each variant carries its structured fields and maps to a
//! stable machine-readable code plus a category, so callers can match on
//! errors without parsing messages.

use serde_json::json;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Coarse error grouping, serialized alongside the code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Validation,
    Evaluation,
    Decimal,
    Configuration,
    Security,
}

impl ErrorCategory {
    /// Lowercase name used in serialized error envelopes
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Parse => "parse",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Evaluation => "evaluation",
            ErrorCategory::Decimal => "decimal",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Security => "security",
        }
    }
}

/// Errors that can occur during parsing, validation, or evaluation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    // === Parse ===
    /// General syntax error with source position
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        offset: usize,
        line: u32,
        column: u32,
    },

    /// A token that does not fit the grammar at its position
    #[error("unexpected token '{token}' at line {line}, column {column} (expected {expected:?})")]
    UnexpectedToken {
        token: String,
        expected: Vec<String>,
        offset: usize,
        line: u32,
        column: u32,
    },

    /// String literal with no closing quote
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize, line: u32, column: u32 },

    /// Malformed numeric literal
    #[error("invalid number literal '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    // === Validation ===
    /// A dependency cycle among formulas
    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency {
        cycle: Vec<String>,
        involved: Vec<String>,
    },

    /// Strict-mode reference to a variable absent from the context
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// Call to a function not present in the library
    #[error("undefined function: {name}")]
    UndefinedFunction { name: String },

    /// Two formulas in one batch share an id
    #[error("duplicate formula id: {id}")]
    DuplicateFormula { id: String },

    // === Evaluation ===
    /// Division or modulo with a zero divisor
    #[error("division by zero")]
    DivisionByZero,

    /// An operand of the wrong value type
    #[error("type mismatch in {location}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        location: String,
    },

    /// Wrong number of arguments to a function
    #[error("wrong number of arguments for {function}: expected {}, got {actual}", format_arity(*min, *max))]
    ArgumentCount {
        function: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    /// An operator applied to operand types it does not support
    #[error("invalid operation: {operator} on ({})", operand_types.join(", "))]
    InvalidOperation {
        operator: String,
        operand_types: Vec<String>,
    },

    /// Property access on a value that has no properties
    #[error("cannot access property '{property}' on {object_type}")]
    PropertyAccess {
        property: String,
        object_type: String,
    },

    /// Index access on a value that is not indexable
    #[error("cannot index with '{index}' into {object_type}")]
    IndexAccess { index: String, object_type: String },

    // === Decimal ===
    /// Result magnitude exceeds the decimal range
    #[error("decimal overflow")]
    DecimalOverflow,

    /// Result magnitude is too small for the decimal range
    #[error("decimal underflow")]
    DecimalUnderflow,

    /// Zero divisor inside the decimal primitive
    #[error("decimal division by zero")]
    DecimalDivisionByZero,

    /// Text that does not parse as a decimal
    #[error("invalid decimal value '{text}'")]
    InvalidDecimal { text: String },

    // === Configuration ===
    /// Invalid engine configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    // === Security ===
    /// Iteration budget exhausted
    #[error("maximum iteration count exceeded ({limit})")]
    MaxIterations { limit: usize },

    /// Recursion budget exhausted
    #[error("maximum recursion depth exceeded ({limit})")]
    MaxRecursion { limit: usize },

    /// Expression longer than the configured cap
    #[error("expression length {length} exceeds the maximum of {limit}")]
    MaxExpressionLength { length: usize, limit: usize },
}

fn format_arity(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{}", min),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    }
}

impl EngineError {
    /// Stable machine-readable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Syntax { .. } => "SYNTAX_ERROR",
            EngineError::UnexpectedToken { .. } => "UNEXPECTED_TOKEN",
            EngineError::UnterminatedString { .. } => "UNTERMINATED_STRING",
            EngineError::InvalidNumber { .. } => "INVALID_NUMBER",
            EngineError::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            EngineError::UndefinedVariable { .. } => "UNDEFINED_VARIABLE",
            EngineError::UndefinedFunction { .. } => "UNDEFINED_FUNCTION",
            EngineError::DuplicateFormula { .. } => "DUPLICATE_FORMULA",
            EngineError::DivisionByZero => "DIVISION_BY_ZERO",
            EngineError::TypeMismatch { .. } => "TYPE_MISMATCH",
            EngineError::ArgumentCount { .. } => "ARGUMENT_COUNT",
            EngineError::InvalidOperation { .. } => "INVALID_OPERATION",
            EngineError::PropertyAccess { .. } => "PROPERTY_ACCESS",
            EngineError::IndexAccess { .. } => "INDEX_ACCESS",
            EngineError::DecimalOverflow => "DECIMAL_OVERFLOW",
            EngineError::DecimalUnderflow => "DECIMAL_UNDERFLOW",
            EngineError::DecimalDivisionByZero => "DECIMAL_DIVISION_BY_ZERO",
            EngineError::InvalidDecimal { .. } => "INVALID_DECIMAL",
            EngineError::Configuration { .. } => "CONFIGURATION_ERROR",
            EngineError::MaxIterations { .. } => "MAX_ITERATIONS",
            EngineError::MaxRecursion { .. } => "MAX_RECURSION",
            EngineError::MaxExpressionLength { .. } => "MAX_EXPRESSION_LENGTH",
        }
    }

    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Syntax { .. }
            | EngineError::UnexpectedToken { .. }
            | EngineError::UnterminatedString { .. }
            | EngineError::InvalidNumber { .. } => ErrorCategory::Parse,

            EngineError::CircularDependency { .. }
            | EngineError::UndefinedVariable { .. }
            | EngineError::UndefinedFunction { .. }
            | EngineError::DuplicateFormula { .. } => ErrorCategory::Validation,

            EngineError::DivisionByZero
            | EngineError::TypeMismatch { .. }
            | EngineError::ArgumentCount { .. }
            | EngineError::InvalidOperation { .. }
            | EngineError::PropertyAccess { .. }
            | EngineError::IndexAccess { .. } => ErrorCategory::Evaluation,

            EngineError::DecimalOverflow
            | EngineError::DecimalUnderflow
            | EngineError::DecimalDivisionByZero
            | EngineError::InvalidDecimal { .. } => ErrorCategory::Decimal,

            EngineError::Configuration { .. } => ErrorCategory::Configuration,

            EngineError::MaxIterations { .. }
            | EngineError::MaxRecursion { .. }
            | EngineError::MaxExpressionLength { .. } => ErrorCategory::Security,
        }
    }

    /// Structured JSON envelope: `{ code, category, message, ...fields }`
    pub fn to_json(&self) -> serde_json::Value {
        let mut envelope = json!({
            "code": self.code(),
            "category": self.category().as_str(),
            "message": self.to_string(),
        });
        let fields = self.structured_fields();
        if let (Some(obj), serde_json::Value::Object(extra)) = (envelope.as_object_mut(), fields) {
            for (k, v) in extra {
                obj.insert(k, v);
            }
        }
        envelope
    }

    fn structured_fields(&self) -> serde_json::Value {
        match self {
            EngineError::Syntax { offset, line, column, .. } => {
                json!({ "offset": offset, "line": line, "column": column })
            }
            EngineError::UnexpectedToken { token, expected, offset, line, column } => {
                json!({
                    "token": token,
                    "expected": expected,
                    "offset": offset,
                    "line": line,
                    "column": column,
                })
            }
            EngineError::UnterminatedString { offset, line, column } => {
                json!({ "offset": offset, "line": line, "column": column })
            }
            EngineError::InvalidNumber { text, offset } => {
                json!({ "text": text, "offset": offset })
            }
            EngineError::CircularDependency { cycle, involved } => {
                json!({ "cycle": cycle, "involved": involved })
            }
            EngineError::UndefinedVariable { name }
            | EngineError::UndefinedFunction { name } => json!({ "name": name }),
            EngineError::DuplicateFormula { id } => json!({ "id": id }),
            EngineError::TypeMismatch { expected, actual, location } => {
                json!({ "expected": expected, "actual": actual, "location": location })
            }
            EngineError::ArgumentCount { function, min, max, actual } => {
                json!({ "function": function, "min": min, "max": max, "actual": actual })
            }
            EngineError::InvalidOperation { operator, operand_types } => {
                json!({ "operator": operator, "operand_types": operand_types })
            }
            EngineError::PropertyAccess { property, object_type } => {
                json!({ "property": property, "object_type": object_type })
            }
            EngineError::IndexAccess { index, object_type } => {
                json!({ "index": index, "object_type": object_type })
            }
            EngineError::InvalidDecimal { text } => json!({ "text": text }),
            EngineError::Configuration { .. } => json!({}),
            EngineError::MaxIterations { limit } | EngineError::MaxRecursion { limit } => {
                json!({ "limit": limit })
            }
            EngineError::MaxExpressionLength { length, limit } => {
                json!({ "length": length, "limit": limit })
            }
            _ => json!({}),
        }
    }
}

impl serde::Serialize for EngineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
