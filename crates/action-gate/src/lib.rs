//! Condition gates - keyed boolean expressions deciding whether a step runs
//!
//! This crate implements:
//! - Gate parsing (empty, single key, JSON-list string or native list)
//! - A closed registry mapping condition keys to expression source
//! - A small side-effect-free expression language evaluated over run variables
//! - Fail-closed evaluation: missing keys and evaluation errors close the gate

pub mod errors;
pub mod evaluator;
pub mod expression;
pub mod registry;

pub use errors::*;
pub use evaluator::*;
pub use expression::Expression;
pub use registry::*;
