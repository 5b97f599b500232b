use serde::{Deserialize, Serialize};

use crate::eval::expression::Expression;

/// Kind of storage a left operand lives in. Each type has one handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, strum::Display)]
pub enum LeftOperandType {
    Data,
    TransientData,
    BusinessData,
    Document,
    Custom(String),
}

/// Named, typed write target. Equal when both name and type are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct LeftOperand {
    pub name: String,
    #[serde(rename = "type")]
    pub operand_type: LeftOperandType,
}

impl LeftOperand {
    pub fn new(name: impl Into<String>, operand_type: LeftOperandType) -> Self {
        Self {
            name: name.into(),
            operand_type,
        }
    }

    pub fn data(name: impl Into<String>) -> Self {
        Self::new(name, LeftOperandType::Data)
    }

    pub fn transient(name: impl Into<String>) -> Self {
        Self::new(name, LeftOperandType::TransientData)
    }

    pub fn business_data(name: impl Into<String>) -> Self {
        Self::new(name, LeftOperandType::BusinessData)
    }

    pub fn is_business_data(&self) -> bool {
        self.operand_type == LeftOperandType::BusinessData
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, strum::Display)]
pub enum OperatorType {
    Assignment,
    JavaMethod,
    XPathUpdateQuery,
    Deletion,
}

/// One write of a right-hand value into a left operand.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Operation {
    pub left_operand: LeftOperand,
    pub operator_type: OperatorType,
    /// Method name for `JavaMethod`, path for `XPathUpdateQuery`.
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub right_operand: Option<Expression>,
}

impl Operation {
    pub fn assign(left_operand: LeftOperand, right_operand: Expression) -> Self {
        Self {
            left_operand,
            operator_type: OperatorType::Assignment,
            operator: None,
            right_operand: Some(right_operand),
        }
    }

    pub fn method(left_operand: LeftOperand, method: impl Into<String>, argument: Expression) -> Self {
        Self {
            left_operand,
            operator_type: OperatorType::JavaMethod,
            operator: Some(method.into()),
            right_operand: Some(argument),
        }
    }

    pub fn xpath_update(left_operand: LeftOperand, path: impl Into<String>, value: Expression) -> Self {
        Self {
            left_operand,
            operator_type: OperatorType::XPathUpdateQuery,
            operator: Some(path.into()),
            right_operand: Some(value),
        }
    }

    pub fn delete(left_operand: LeftOperand) -> Self {
        Self {
            left_operand,
            operator_type: OperatorType::Deletion,
            operator: None,
            right_operand: None,
        }
    }
}
