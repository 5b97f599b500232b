use std::sync::Arc;

use super::{require_content, require_dependency_count, resolved_dependency, ExpressionStrategy};
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval::context::{DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::value::{parse_scalar, Value, ValueType};
use crate::xml::{QueryResult, QueryShape, XmlProvider};

/// Reads values out of an XML document held by the single dependency.
pub struct XPathReadStrategy {
    provider: Arc<dyn XmlProvider>,
}

impl XPathReadStrategy {
    pub fn new(provider: Arc<dyn XmlProvider>) -> Self {
        Self { provider }
    }

    fn shape_for(expression: &Expression) -> ExpressionResult<QueryShape> {
        match expression.return_type() {
            ValueType::Node => Ok(QueryShape::Node),
            ValueType::NodeSet => Ok(QueryShape::NodeSet),
            ValueType::String
            | ValueType::Boolean
            | ValueType::Integer
            | ValueType::Long
            | ValueType::Float
            | ValueType::Double => Ok(QueryShape::String),
            other => Err(ExpressionError::evaluation(
                expression,
                format!("unsupported return type {} for a path query", other),
            )),
        }
    }
}

impl ExpressionStrategy for XPathReadStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::XPathRead
    }

    fn validate(&self, expression: &Expression) -> ExpressionResult<()> {
        require_content(expression)?;
        require_dependency_count(expression, 1)
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &DependencyContext,
        resolved: &mut ResolvedValues,
        _phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        let query = require_content(expression)?;
        let document = match resolved_dependency(expression, resolved, 0)? {
            Value::String(document) if !document.trim().is_empty() => document.clone(),
            other => {
                return Err(ExpressionError::evaluation(
                    expression,
                    format!("expected a non-empty XML document but got {}", other.type_name()),
                ))
            }
        };
        let shape = Self::shape_for(expression)?;

        let result = self
            .provider
            .query(&document, query, shape)
            .map_err(|e| ExpressionError::evaluation(expression, e.to_string()))?;

        match result {
            QueryResult::Node(node) => Ok(node.map(Value::Node).unwrap_or(Value::Null)),
            QueryResult::NodeSet(nodes) => Ok(Value::NodeSet(nodes)),
            QueryResult::String(text) => parse_scalar(&text, expression.return_type())
                .map_err(|reason| ExpressionError::evaluation(expression, reason)),
        }
    }
}
