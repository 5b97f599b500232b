use thiserror::Error;

use crate::eval::context::ContainerRef;
use crate::eval::expression::{Expression, ExpressionKind};
use crate::operation::model::{LeftOperandType, OperatorType};
use crate::script::cache::CacheError;
use crate::script::error::ScriptError;
use crate::script::partition::LoaderError;
use crate::value::ValueType;
use crate::xml::XmlError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unknown expression kind: {0}")]
    UnknownExpressionKind(ExpressionKind),
    #[error("Strategy already registered for expression kind: {0}")]
    DuplicateStrategy(ExpressionKind),
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("Missing dependency '{dependency}' for expression '{expression}'")]
    MissingDependency {
        expression: String,
        dependency: String,
    },
    #[error("Failed to evaluate '{expression}': {reason}{}", container_suffix(.container))]
    EvaluationFailure {
        expression: String,
        reason: String,
        container: Option<ContainerRef>,
    },
    #[error(
        "Expression '{expression}' declares return type {declared} but produced {actual}{}",
        container_suffix(.container)
    )]
    ReturnTypeMismatch {
        expression: String,
        declared: ValueType,
        actual: String,
        container: Option<ContainerRef>,
    },
}

fn container_suffix(container: &Option<ContainerRef>) -> String {
    container
        .as_ref()
        .map(|c| format!(" (in {})", c))
        .unwrap_or_default()
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

// エラー作成用のヘルパー関数
impl ExpressionError {
    pub fn invalid<S: Into<String>>(expression: &Expression, reason: S) -> Self {
        ExpressionError::InvalidExpression {
            expression: expression.name().to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing<S: Into<String>>(expression: &Expression, dependency: S) -> Self {
        ExpressionError::MissingDependency {
            expression: expression.name().to_string(),
            dependency: dependency.into(),
        }
    }

    pub fn evaluation<S: Into<String>>(expression: &Expression, reason: S) -> Self {
        ExpressionError::EvaluationFailure {
            expression: expression.name().to_string(),
            reason: reason.into(),
            container: None,
        }
    }

    /// Attaches the running container to failures that carry one, keeping
    /// an annotation that is already present.
    pub fn in_container(self, current: Option<&ContainerRef>) -> Self {
        match self {
            ExpressionError::EvaluationFailure {
                expression,
                reason,
                container: None,
            } => ExpressionError::EvaluationFailure {
                expression,
                reason,
                container: current.cloned(),
            },
            ExpressionError::ReturnTypeMismatch {
                expression,
                declared,
                actual,
                container: None,
            } => ExpressionError::ReturnTypeMismatch {
                expression,
                declared,
                actual,
                container: current.cloned(),
            },
            other => other,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Operation on '{operand}' failed: {reason}")]
    ExecutionFailure { operand: String, reason: String },
    #[error("Deletion is not supported for {operand_type} operand '{operand}'")]
    DeletionNotSupported {
        operand: String,
        operand_type: LeftOperandType,
    },
    #[error("No left operand handler registered for type {0}")]
    HandlerNotFound(LeftOperandType),
    #[error("No operation executor registered for operator {0}")]
    ExecutorNotFound(OperatorType),
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
}

pub type OperationResult<T> = Result<T, OperationError>;

impl OperationError {
    pub fn failure<O: Into<String>, R: Into<String>>(operand: O, reason: R) -> Self {
        OperationError::ExecutionFailure {
            operand: operand.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),
    #[error("Script cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Partition loading error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
