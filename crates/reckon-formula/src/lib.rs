//! # reckon-formula
//!
//! The expression language of the reckon engine.
//!
//! This crate provides:
//! - Lexing (text → tokens) and parsing (tokens → AST)
//! - Dependency extraction and the formula dependency graph
//! - The tree-walking evaluator with decimal arithmetic
//! - The built-in function library
//!
//! ## Example
//!
//! ```rust
//! use reckon_formula::{parse_expression, EvaluationContext, Evaluator, EvaluatorOptions};
//! use reckon_formula::functions::FunctionRegistry;
//! use reckon_core::Value;
//!
//! let ast = parse_expression("$price * $quantity").unwrap();
//! let mut ctx = EvaluationContext::new();
//! ctx.set_variable("price", Value::from(100i64));
//! ctx.set_variable("quantity", Value::from(5i64));
//!
//! let registry = FunctionRegistry::new();
//! let options = EvaluatorOptions::default();
//! let mut evaluator = Evaluator::new(&registry, &options);
//! let value = evaluator.evaluate(&ast, &ctx).unwrap();
//! assert_eq!(value.to_display_string(), "500");
//! ```

pub mod ast;
pub mod dependency;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use dependency::{extract_dependencies, extract_function_names, DependencyGraph};
pub use evaluator::{EvaluationContext, Evaluator, EvaluatorOptions};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{parse_expression, Parser};
