//! # reckon-core
//!
//! Core data structures for the reckon formula engine.
//!
//! This crate provides the fundamental types used throughout reckon:
//! - [`Value`] - Runtime values (decimals, strings, booleans, arrays, objects)
//! - [`decimal`] - The arbitrary-precision decimal adapter and rounding modes
//! - [`EngineError`] - The unified error taxonomy with stable codes
//! - [`DecimalConfig`] and [`SecurityConfig`] - Shared configuration
//!
//! ## Example
//!
//! ```rust
//! use reckon_core::{decimal, RoundingMode, Value};
//!
//! let d = decimal::parse("19.125").unwrap();
//! let rounded = decimal::round(d, 2, RoundingMode::HalfUp);
//! assert_eq!(Value::Decimal(rounded).to_display_string(), "19.13");
//! ```

pub mod config;
pub mod decimal;
pub mod error;
pub mod value;

pub use config::{DecimalConfig, SecurityConfig};
pub use decimal::RoundingMode;
pub use error::{EngineError, EngineResult, ErrorCategory};
pub use value::Value;
