//! Expression evaluation: the expression model, per-call context, the kind
//! to strategy registry and the evaluator and resolver built on it.

pub mod context;
pub mod evaluator;
pub mod expression;
pub mod registry;
pub mod resolver;
pub mod strategy;

pub use context::{
    ContainerKind, ContainerRef, DependencyContext, Discriminant, EvaluationPhase, ResolvedValues,
};
pub use evaluator::{EvaluationTracker, ExpressionEvaluator};
pub use expression::{Expression, ExpressionKind};
pub use registry::StrategyRegistry;
pub use resolver::ExpressionResolver;
pub use strategy::ExpressionStrategy;
