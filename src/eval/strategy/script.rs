use std::borrow::Cow;
use std::sync::Arc;

use super::{require_content, ExpressionStrategy};
use crate::error::ExpressionResult;
use crate::eval::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::script::ScriptExecutor;
use crate::value::{Value, ValueType};

/// Scripts see the context variables plus their own resolved dependencies,
/// bound under the dependency names.
fn script_context<'a>(
    expression: &Expression,
    context: &'a DependencyContext,
    resolved: &ResolvedValues,
) -> Cow<'a, DependencyContext> {
    let bound: Vec<(&str, &Value)> = expression
        .dependencies()
        .iter()
        .filter_map(|dependency| {
            resolved
                .get(&dependency.discriminant())
                .map(|value| (dependency.name(), value))
        })
        .collect();
    if bound.is_empty() {
        return Cow::Borrowed(context);
    }
    let mut scoped = context.clone();
    for (name, value) in bound {
        scoped.insert(name, value.clone());
    }
    Cow::Owned(scoped)
}

pub struct ScriptStrategy {
    executor: Arc<ScriptExecutor>,
}

impl ScriptStrategy {
    pub fn new(executor: Arc<ScriptExecutor>) -> Self {
        Self { executor }
    }
}

impl ExpressionStrategy for ScriptStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Script
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        require_content(expression).map(|_| ())
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let context = script_context(expression, context, resolved);
        self.executor.execute(expression, &context)
    }
}

/// Script used as a guard: any non-null, non-boolean result counts as
/// `true`.
pub struct ScriptConditionStrategy {
    executor: Arc<ScriptExecutor>,
}

impl ScriptConditionStrategy {
    pub fn new(executor: Arc<ScriptExecutor>) -> Self {
        Self { executor }
    }
}

impl ExpressionStrategy for ScriptConditionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::ScriptCondition
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        require_content(expression).map(|_| ())
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let context = script_context(expression, context, resolved);
        // truthiness replaces the Boolean cast
        let value = self
            .executor
            .execute_as(expression, &context, ValueType::Object)?;
        Ok(match value {
            Value::Null | Value::Boolean(_) => value,
            _ => Value::Boolean(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptConfig;
    use crate::error::ExpressionError;
    use crate::script::partition::PartitionKey;
    use crate::script::{BuiltinInterpreter, InMemoryCacheService, InMemoryPartitionLoader};

    fn executor() -> Arc<ScriptExecutor> {
        Arc::new(ScriptExecutor::new(
            Arc::new(BuiltinInterpreter::new()),
            Arc::new(InMemoryCacheService::new()),
            Arc::new(InMemoryPartitionLoader::new()),
            ScriptConfig::default(),
        ))
    }

    fn evaluate(strategy: &dyn ExpressionStrategy, source: &str, context: &DependencyContext) -> ExpressionResult<Value> {
        let expression = match strategy.kind() {
            ExpressionKind::Script => Expression::script("s", source, ValueType::Object, vec![]),
            _ => Expression::script_condition("s", source, vec![]),
        };
        strategy.validate(&expression)?;
        strategy.evaluate(&expression, context, &mut ResolvedValues::new(), EvaluationPhase::Active)
    }

    #[test]
    fn test_script_condition_truthiness() {
        let strategy = ScriptConditionStrategy::new(executor());
        let context = DependencyContext::new().with_variable("name", "ada");

        assert_eq!(evaluate(&strategy, "name", &context), Ok(Value::Boolean(true)));
        assert_eq!(evaluate(&strategy, "null", &context), Ok(Value::Null));
        assert_eq!(evaluate(&strategy, "name == 'bob'", &context), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_dependencies_are_bound_by_name() {
        let strategy = ScriptStrategy::new(executor());
        let rate = Expression::constant("3", ValueType::Integer);
        let expression = Expression::script("fee", "amount * 3", ValueType::Integer, vec![
            Expression::variable("amount", ValueType::Integer),
            rate,
        ]);
        let mut resolved = ResolvedValues::new();
        resolved.insert(expression.dependencies()[0].discriminant(), Value::Integer(5));
        let context = DependencyContext::new().with_partition(PartitionKey(1));

        // partition 1 is unknown to the loader
        assert!(matches!(
            strategy.evaluate(&expression, &context, &mut resolved, EvaluationPhase::Active),
            Err(ExpressionError::EvaluationFailure { .. })
        ));
        assert_eq!(
            strategy.evaluate(&expression, &DependencyContext::new(), &mut resolved, EvaluationPhase::Active),
            Ok(Value::Integer(15))
        );
    }

    #[test]
    fn test_empty_source_is_invalid() {
        let strategy = ScriptStrategy::new(executor());
        assert!(matches!(
            evaluate(&strategy, "  ", &DependencyContext::new()),
            Err(ExpressionError::InvalidExpression { .. })
        ));
    }
}
