use super::{resolved_dependency, ExpressionStrategy};
use crate::error::ExpressionResult;
use crate::eval::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::value::Value;

/// Collects the resolved dependency values, in declared order, into a list.
#[derive(Debug, Default)]
pub struct ListStrategy;

impl ListStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for ListStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::List
    }

    fn validate(&self, _expression: &Expression) -> ExpressionResult<()> {
        Ok(())
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &DependencyContext,
        resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let mut items = Vec::with_capacity(expression.dependencies().len());
        for index in 0..expression.dependencies().len() {
            items.push(resolved_dependency(expression, resolved, index)?.clone());
        }
        let list = Value::List(items);
        // siblings referencing this list reuse the stored value
        resolved.insert(expression.discriminant(), list.clone());
        Ok(list)
    }
}
