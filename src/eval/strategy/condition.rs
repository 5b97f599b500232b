use std::cmp::Ordering;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};

use super::{
    require_content, require_dependency_count, resolved_dependency, ExpressionStrategy,
};
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum ConditionOperator {
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "!")]
    Not,
}

impl ConditionOperator {
    fn arity(&self) -> usize {
        match self {
            ConditionOperator::Not => 1,
            _ => 2,
        }
    }
}

/// Structural guard conditions used on gateways and transitions.
#[derive(Debug, Default)]
pub struct ConditionStrategy;

impl ConditionStrategy {
    pub fn new() -> Self {
        Self
    }

    fn operator(expression: &Expression) -> ExpressionResult<ConditionOperator> {
        let content = require_content(expression)?;
        ConditionOperator::from_str(content.trim()).map_err(|_| {
            ExpressionError::invalid(
                expression,
                format!("unsupported condition operator '{}'", content),
            )
        })
    }

    fn compare(
        expression: &Expression,
        operator: ConditionOperator,
        left: &Value,
        right: &Value,
    ) -> ExpressionResult<bool> {
        let ordering = || {
            left.compare(right).ok_or_else(|| {
                ExpressionError::evaluation(
                    expression,
                    format!(
                        "cannot apply '{}' to {} and {}",
                        operator.as_ref(),
                        left.type_name(),
                        right.type_name()
                    ),
                )
            })
        };
        Ok(match operator {
            ConditionOperator::Equal => left.loose_eq(right),
            ConditionOperator::NotEqual => !left.loose_eq(right),
            ConditionOperator::LessThan => ordering()? == Ordering::Less,
            ConditionOperator::GreaterThan => ordering()? == Ordering::Greater,
            ConditionOperator::LessThanEqual => ordering()? != Ordering::Greater,
            ConditionOperator::GreaterThanEqual => ordering()? != Ordering::Less,
            ConditionOperator::Not => {
                return Err(ExpressionError::invalid(expression, "'!' takes one operand"))
            }
        })
    }
}

impl ExpressionStrategy for ConditionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Condition
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        let operator = Self::operator(expression)?;
        require_dependency_count(expression, operator.arity())
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &DependencyContext,
        resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let operator = Self::operator(expression)?;
        if operator == ConditionOperator::Not {
            let operand = resolved_dependency(expression, resolved, 0)?;
            let value = operand.as_bool().ok_or_else(|| {
                ExpressionError::evaluation(
                    expression,
                    format!("'!' expects a Boolean but got {}", operand.type_name()),
                )
            })?;
            return Ok(Value::Boolean(!value));
        }

        let left = resolved_dependency(expression, resolved, 0)?;
        let right = resolved_dependency(expression, resolved, 1)?;
        Self::compare(expression, operator, left, right).map(Value::Boolean)
    }
}
