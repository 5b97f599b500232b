//! Expression strategies, one per [`ExpressionKind`].
//!
//! Each strategy validates an expression before any work is done and then
//! evaluates it against the values already resolved for its dependencies.

pub mod condition;
pub mod list;
pub mod lookup;
pub mod script;
pub mod xpath;

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

use super::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use super::expression::{Expression, ExpressionKind};

pub use condition::ConditionStrategy;
pub use list::ListStrategy;
pub use lookup::{BusinessDataStrategy, ConstantStrategy, VariableStrategy};
pub use script::{ScriptConditionStrategy, ScriptStrategy};
pub use xpath::XPathReadStrategy;

pub trait ExpressionStrategy: Send + Sync {
    fn kind(&self) -> ExpressionKind;

    /// Rejects structurally invalid expressions before evaluation.
    fn validate(&self, expression: &Expression) -> ExpressionResult<()>;

    fn evaluate(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Value>;

    /// Evaluates same-kind expressions, one result per input in order.
    fn evaluate_batch(
        &self,
        expressions: &[Expression],
        context: &DependencyContext,
        resolved: &mut ResolvedValues,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Vec<Value>> {
        expressions
            .iter()
            .map(|expression| self.evaluate(expression, context, resolved, phase))
            .collect()
    }

    /// Whether the result is also bound under the expression name for sibling
    /// scripts.
    fn must_expose_result_by_name(&self) -> bool {
        false
    }
}

/// Looks up the already computed value of the `index`-th dependency.
pub(crate) fn resolved_dependency<'a>(
    expression: &Expression,
    resolved: &'a ResolvedValues,
    index: usize,
) -> ExpressionResult<&'a Value> {
    let dependency = expression.dependencies().get(index).ok_or_else(|| {
        ExpressionError::missing(expression, format!("dependency #{}", index))
    })?;
    resolved
        .get(&dependency.discriminant())
        .ok_or_else(|| ExpressionError::missing(expression, dependency.name()))
}

pub(crate) fn require_content(expression: &Expression) -> ExpressionResult<&str> {
    match expression.content() {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(ExpressionError::invalid(expression, "content is empty")),
    }
}

pub(crate) fn require_dependency_count(
    expression: &Expression,
    expected: usize,
) -> ExpressionResult<()> {
    let actual = expression.dependencies().len();
    if actual != expected {
        return Err(ExpressionError::invalid(
            expression,
            format!("expected {} dependencies but found {}", expected, actual),
        ));
    }
    Ok(())
}
