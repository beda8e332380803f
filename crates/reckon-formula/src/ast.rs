//! Expression AST types
//!
//! Owned, immutable trees. The parser is the only producer; the evaluator and
//! dependency extractor only ever borrow nodes.

/// Expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Decimal literal, kept as its exact textual value
    DecimalLit(String),
    /// Binary float literal, only when explicitly requested
    FloatLit(f64),
    StringLit(String),
    BoolLit(bool),
    NullLit,
    ArrayLit(Vec<Expr>),
    /// Object literal; insertion order is declaration order
    ObjectLit(Vec<(String, Expr)>),

    // === References ===
    /// `$name`
    Variable { name: String },
    /// `@name`
    ContextVariable { name: String },

    // === Operators ===
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `cond ? consequent : alternate`
    Conditional {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    // === Calls and access ===
    /// Function call; the name is upper-case-normalized by the parser
    Call { name: String, args: Vec<Expr> },
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// Operator symbol as written in source
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}
