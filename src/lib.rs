//! # flowcore: expression and operation core for process runtimes
//!
//! flowcore evaluates dependency-linked expressions and applies the results
//! as writes to process variables and business data within one unit of
//! work.
//!
//! ## Evaluation
//!
//! Expressions are dispatched by kind to a strategy ([`eval::strategy`])
//! looked up in an immutable [`eval::StrategyRegistry`]:
//! - Constants, variable and business data lookups
//! - Structural conditions and lists over resolved dependencies
//! - Path queries over XML payloads ([`xml`])
//! - Cached scripts and script conditions ([`script`])
//!
//! The [`eval::ExpressionEvaluator`] validates, times and optionally type
//! checks each call. The [`eval::ExpressionResolver`] walks dependency DAGs
//! depth-first, keeping each discriminant's value in a caller-owned
//! [`eval::ResolvedValues`] map.
//!
//! ## Scripts
//!
//! Script sources are compiled once per partition and cached together with
//! a shell holding the partition's function library. Reloading or
//! destroying any partition clears the whole cache.
//!
//! ## Operations
//!
//! The [`operation::OperationService`] resolves current values, evaluates
//! right operands in list order and writes through per-type left operand
//! handlers, either in one batched pass or one by one. Intermediate
//! business data writes that are overwritten before anything reads them are
//! not flushed ([`operation::should_persist`]).
//!
//! ```text
//! Operations → Resolve reads → Evaluate → Reduce → Batch / Sequential writes
//! ```
//!
//! [`engine::ExpressionEngine`] wires everything together.

pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod operation;
pub mod script;
pub mod value;
pub mod xml;

// Re-exports
pub use engine::{EngineParts, ExpressionEngine};
pub use error::*;
pub use value::{Value, ValueType, XmlNode};
