use std::collections::HashSet;
use std::sync::Arc;

use super::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use super::evaluator::ExpressionEvaluator;
use super::expression::{Expression, ExpressionKind};
use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

/// Walks dependency DAGs depth-first so every expression is evaluated after
/// the values it depends on, each discriminant at most once per call.
pub struct ExpressionResolver {
    evaluator: Arc<ExpressionEvaluator>,
}

impl ExpressionResolver {
    pub fn new(evaluator: Arc<ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn resolve(
        &self,
        expression: &Expression,
        context: &mut DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        if let Some(value) = resolved.get(&expression.discriminant()) {
            return Ok(value.clone());
        }
        self.resolve_dependencies(expression, context, resolved, phase)?;
        let value = self
            .evaluator
            .evaluate(expression, context, resolved, phase)?;
        self.store(expression, value.clone(), context, resolved)?;
        Ok(value)
    }

    /// Resolves a list of expressions, sending the still unresolved ones of
    /// each kind to the strategy as one batch. Values come back in input
    /// order.
    pub fn resolve_all(
        &self,
        expressions: &[Expression],
        context: &mut DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Vec<Value>> {
        for expression in expressions {
            self.resolve_dependencies(expression, context, resolved, phase)?;
        }

        // kinds in order of first appearance
        let mut groups: Vec<(ExpressionKind, Vec<Expression>)> = Vec::new();
        let mut seen = HashSet::new();
        for expression in expressions {
            if resolved.contains_key(&expression.discriminant())
                || !seen.insert(expression.discriminant())
            {
                continue;
            }
            match groups.iter_mut().find(|(kind, _)| *kind == expression.kind()) {
                Some((_, members)) => members.push(expression.clone()),
                None => groups.push((expression.kind(), vec![expression.clone()])),
            }
        }

        for (kind, members) in groups {
            let values = self
                .evaluator
                .evaluate_batch(kind, &members, context, resolved, phase)?;
            for (expression, value) in members.iter().zip(values) {
                self.store(expression, value, context, resolved)?;
            }
        }

        expressions
            .iter()
            .map(|expression| {
                resolved
                    .get(&expression.discriminant())
                    .cloned()
                    .ok_or_else(|| ExpressionError::missing(expression, expression.name()))
            })
            .collect()
    }

    fn resolve_dependencies(
        &self,
        expression: &Expression,
        context: &mut DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<()> {
        for dependency in expression.dependencies() {
            if !resolved.contains_key(&dependency.discriminant()) {
                self.resolve(dependency, context, resolved, phase)?;
            }
        }
        Ok(())
    }

    fn store(
        &self,
        expression: &Expression,
        value: Value,
        context: &mut DependencyContext,
        resolved: &mut ResolvedValues,
    ) -> ExpressionResult<()> {
        let strategy = self.evaluator.registry().get(expression.kind())?;
        if strategy.must_expose_result_by_name() {
            context.insert(expression.name(), value.clone());
        }
        resolved.insert(expression.discriminant(), value);
        Ok(())
    }
}
