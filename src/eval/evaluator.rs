use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use super::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use super::expression::{Expression, ExpressionKind};
use super::registry::StrategyRegistry;
use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

/// Receives the duration of every strategy call.
#[mockall::automock]
pub trait EvaluationTracker: Send + Sync {
    fn track(&self, kind: ExpressionKind, name: &str, elapsed: Duration);
}

/// Dispatches expressions to their strategies.
pub struct ExpressionEvaluator {
    registry: Arc<StrategyRegistry>,
    check_return_types: bool,
    tracker: Option<Arc<dyn EvaluationTracker>>,
}

impl ExpressionEvaluator {
    pub fn new(registry: Arc<StrategyRegistry>, check_return_types: bool) -> Self {
        Self {
            registry,
            check_return_types,
            tracker: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn EvaluationTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Validates, evaluates and, when enabled, type checks one expression.
    /// Validation errors are returned as they are; runtime failures carry the
    /// context's container.
    #[instrument(level = "debug", skip_all, fields(kind = %expression.kind(), name = %expression.name(), phase = ?phase))]
    pub fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let strategy = self.registry.get(expression.kind())?;
        strategy.validate(expression)?;

        let started = Instant::now();
        let result = strategy.evaluate(expression, context, resolved, phase);
        self.track(expression.kind(), expression.name(), started.elapsed());

        let value = result.map_err(|e| e.in_container(context.container()))?;
        if self.check_return_types {
            check_return_type(expression, &value, context)?;
        }
        Ok(value)
    }

    /// Evaluates same-kind expressions in one strategy call. The result has
    /// exactly one value per expression.
    #[instrument(level = "debug", skip_all, fields(kind = %kind, count = expressions.len(), phase = ?phase))]
    pub fn evaluate_batch(
        &self,
        kind: ExpressionKind,
        expressions: &[Expression],
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Vec<Value>> {
        let strategy = self.registry.get(kind)?;
        for expression in expressions {
            if expression.kind() != kind {
                return Err(ExpressionError::invalid(
                    expression,
                    format!("expected a {} expression in batch", kind),
                ));
            }
            strategy.validate(expression)?;
        }

        let started = Instant::now();
        let result = strategy.evaluate_batch(expressions, context, resolved, phase);
        self.track(kind, "batch", started.elapsed());

        let values = result.map_err(|e| e.in_container(context.container()))?;
        if values.len() != expressions.len() {
            return Err(ExpressionError::EvaluationFailure {
                expression: format!("{} batch", kind),
                reason: format!(
                    "expected {} results but got {}",
                    expressions.len(),
                    values.len()
                ),
                container: context.container().cloned(),
            });
        }
        if self.check_return_types {
            for (expression, value) in expressions.iter().zip(&values) {
                check_return_type(expression, value, context)?;
            }
        }
        Ok(values)
    }

    fn track(&self, kind: ExpressionKind, name: &str, elapsed: Duration) {
        debug!("{} '{}' evaluated in {:?}", kind, name, elapsed);
        if let Some(tracker) = &self.tracker {
            tracker.track(kind, name, elapsed);
        }
    }
}

/// Null passes; anything else must be assignable or convertible to the
/// declared type.
fn check_return_type(
    expression: &Expression,
    value: &Value,
    context: &DependencyContext,
) -> ExpressionResult<()> {
    let actual = match value.value_type() {
        Some(actual) => actual,
        None => return Ok(()),
    };
    let declared = expression.return_type();
    if declared.accepts(actual) {
        return Ok(());
    }
    Err(ExpressionError::ReturnTypeMismatch {
        expression: expression.name().to_string(),
        declared,
        actual: actual.to_string(),
        container: context.container().cloned(),
    })
}
