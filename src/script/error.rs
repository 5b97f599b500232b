use thiserror::Error;

use crate::value::ValueType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Failed to parse script: {0}")]
    Parse(String),
    #[error("No such property: {0}")]
    UndefinedVariable(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Function {function} expects {expected} arguments but got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("Cannot cast '{value}' to {target}")]
    InvalidCast { value: String, target: ValueType },
    #[error("Type error: {0}")]
    Type(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Call depth exceeded {0}")]
    CallDepthExceeded(usize),
}

pub type ScriptResult<T> = Result<T, ScriptError>;
