use super::{require_content, require_dependency_count, ExpressionStrategy};
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::value::{parse_scalar, Value, ValueType};

/// Literal values written in the process model.
#[derive(Debug, Default)]
pub struct ConstantStrategy;

impl ConstantStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for ConstantStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Constant
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        if expression.content().is_none() {
            return Err(ExpressionError::invalid(expression, "content is null"));
        }
        require_dependency_count(expression, 0)
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &DependencyContext,
        _resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let content = expression.content().unwrap_or_default();
        match expression.return_type() {
            ValueType::Object => Ok(Value::String(content.to_string())),
            declared => parse_scalar(content, declared)
                .map_err(|reason| ExpressionError::evaluation(expression, reason)),
        }
    }
}

/// Reads a process variable bound in the dependency context.
#[derive(Debug, Default)]
pub struct VariableStrategy;

impl VariableStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for VariableStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Variable
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        require_content(expression).map(|_| ())
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        _resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let name = require_content(expression)?;
        context
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::missing(expression, name))
    }
}

/// Reads a business entity by name. This is the read the persist-elision
/// analysis looks for.
#[derive(Debug, Default)]
pub struct BusinessDataStrategy;

impl BusinessDataStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for BusinessDataStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::BusinessData
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        require_content(expression)?;
        require_dependency_count(expression, 0)
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        _resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let entity = require_content(expression)?;
        context
            .get(entity)
            .cloned()
            .ok_or_else(|| ExpressionError::missing(expression, entity))
    }
}
