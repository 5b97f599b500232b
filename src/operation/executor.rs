use std::collections::HashMap;
use std::sync::Arc;

use super::model::{Operation, OperatorType};
use crate::error::{OperationError, OperationResult};
use crate::value::Value;
use crate::xml::XmlProvider;

/// Turns the evaluated right-hand value into the value written to the left
/// operand.
pub trait OperationExecutorStrategy: Send + Sync {
    fn operator_type(&self) -> OperatorType;

    /// Whether the current value of the left operand must be retrieved
    /// before the operation runs.
    fn requires_current_value(&self) -> bool;

    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        current: Option<&Value>,
    ) -> OperationResult<Value>;
}

#[derive(Debug, Default)]
pub struct AssignmentExecutor;

impl OperationExecutorStrategy for AssignmentExecutor {
    fn operator_type(&self) -> OperatorType {
        OperatorType::Assignment
    }

    fn requires_current_value(&self) -> bool {
        false
    }

    fn compute_new_value(
        &self,
        _operation: &Operation,
        right: Value,
        _current: Option<&Value>,
    ) -> OperationResult<Value> {
        Ok(right)
    }
}

/// Applies a mutator to the current value: `setX(v)` or `x(v)` on a map
/// sets key `x`, `add(v)` on a list appends.
#[derive(Debug, Default)]
pub struct JavaMethodExecutor;

impl JavaMethodExecutor {
    fn property_name(method: &str) -> String {
        match method.strip_prefix("set") {
            Some(rest) if !rest.is_empty() => {
                let mut chars = rest.chars();
                chars
                    .next()
                    .map(|first| first.to_lowercase().chain(chars).collect())
                    .unwrap_or_default()
            }
            _ => method.to_string(),
        }
    }
}

impl OperationExecutorStrategy for JavaMethodExecutor {
    fn operator_type(&self) -> OperatorType {
        OperatorType::JavaMethod
    }

    fn requires_current_value(&self) -> bool {
        true
    }

    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        current: Option<&Value>,
    ) -> OperationResult<Value> {
        let operand = &operation.left_operand.name;
        let method = operation
            .operator
            .as_deref()
            .ok_or_else(|| OperationError::failure(operand, "no method name"))?;
        match (method, current) {
            ("add", Some(Value::List(items))) => {
                let mut items = items.clone();
                items.push(right);
                Ok(Value::List(items))
            }
            (method, Some(Value::Map(entries))) => {
                let mut entries = entries.clone();
                entries.insert(Self::property_name(method), right);
                Ok(Value::Map(entries))
            }
            (method, Some(other)) => Err(OperationError::failure(
                operand,
                format!("cannot invoke {} on {}", method, other.type_name()),
            )),
            (method, None) => Err(OperationError::failure(
                operand,
                format!("cannot invoke {} without a current value", method),
            )),
        }
    }
}

/// Replaces the text selected by a path inside the current XML document.
pub struct XPathUpdateExecutor {
    xml: Arc<dyn XmlProvider>,
}

impl XPathUpdateExecutor {
    pub fn new(xml: Arc<dyn XmlProvider>) -> Self {
        Self { xml }
    }
}

impl OperationExecutorStrategy for XPathUpdateExecutor {
    fn operator_type(&self) -> OperatorType {
        OperatorType::XPathUpdateQuery
    }

    fn requires_current_value(&self) -> bool {
        true
    }

    fn compute_new_value(
        &self,
        operation: &Operation,
        right: Value,
        current: Option<&Value>,
    ) -> OperationResult<Value> {
        let operand = &operation.left_operand.name;
        let query = operation
            .operator
            .as_deref()
            .ok_or_else(|| OperationError::failure(operand, "no update path"))?;
        let document = current
            .and_then(Value::as_str)
            .ok_or_else(|| OperationError::failure(operand, "current value is not an XML document"))?;
        self.xml
            .update(document, query, &right.to_string())
            .map(Value::String)
            .map_err(|e| OperationError::failure(operand, e.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct DeletionExecutor;

impl OperationExecutorStrategy for DeletionExecutor {
    fn operator_type(&self) -> OperatorType {
        OperatorType::Deletion
    }

    fn requires_current_value(&self) -> bool {
        false
    }

    fn compute_new_value(
        &self,
        _operation: &Operation,
        _right: Value,
        _current: Option<&Value>,
    ) -> OperationResult<Value> {
        Ok(Value::Null)
    }
}

#[derive(Default, Clone)]
pub struct OperationExecutorRegistry {
    executors: HashMap<OperatorType, Arc<dyn OperationExecutorStrategy>>,
}

impl OperationExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(xml: Arc<dyn XmlProvider>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AssignmentExecutor));
        registry.register(Arc::new(JavaMethodExecutor));
        registry.register(Arc::new(XPathUpdateExecutor::new(xml)));
        registry.register(Arc::new(DeletionExecutor));
        registry
    }

    /// Replaces any executor already registered for the operator.
    pub fn register(&mut self, executor: Arc<dyn OperationExecutorStrategy>) {
        self.executors.insert(executor.operator_type(), executor);
    }

    pub fn get(&self, operator: OperatorType) -> OperationResult<&Arc<dyn OperationExecutorStrategy>> {
        self.executors
            .get(&operator)
            .ok_or(OperationError::ExecutorNotFound(operator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::expression::Expression;
    use crate::operation::model::LeftOperand;
    use crate::value::ValueType;
    use crate::xml::{QueryResult, QueryShape, SxdXmlProvider};

    fn argument() -> Expression {
        Expression::constant("x", ValueType::String)
    }

    #[test]
    fn test_setter_on_map() {
        let operation = Operation::method(LeftOperand::data("customer"), "setCity", argument());
        let current = Value::Map(HashMap::new());

        let updated = JavaMethodExecutor
            .compute_new_value(&operation, Value::from("Lyon"), Some(&current))
            .unwrap();

        let expected = HashMap::from([("city".to_string(), Value::from("Lyon"))]);
        assert_eq!(updated, Value::Map(expected));
    }

    #[test]
    fn test_add_on_list() {
        let operation = Operation::method(LeftOperand::data("items"), "add", argument());
        let current = Value::List(vec![Value::Integer(1)]);

        let updated = JavaMethodExecutor
            .compute_new_value(&operation, Value::Integer(2), Some(&current))
            .unwrap();
        assert_eq!(updated, Value::List(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn test_method_on_scalar_fails() {
        let operation = Operation::method(LeftOperand::data("count"), "add", argument());
        assert!(JavaMethodExecutor
            .compute_new_value(&operation, Value::Integer(2), Some(&Value::Integer(1)))
            .is_err());
        assert!(JavaMethodExecutor
            .compute_new_value(&operation, Value::Integer(2), None)
            .is_err());
    }

    #[test]
    fn test_xpath_update() {
        let provider = Arc::new(SxdXmlProvider::new());
        let executor = XPathUpdateExecutor::new(provider.clone());
        let operation =
            Operation::xpath_update(LeftOperand::data("invoice"), "/invoice/total", argument());
        let current = Value::from("<invoice><total>1</total></invoice>");

        let updated = executor
            .compute_new_value(&operation, Value::Long(42), Some(&current))
            .unwrap();
        let total = provider
            .query(updated.as_str().unwrap(), "/invoice/total", QueryShape::String)
            .unwrap();
        assert_eq!(total, QueryResult::String("42".to_string()));
    }

    #[test]
    fn test_registry_defaults() {
        let registry = OperationExecutorRegistry::with_defaults(Arc::new(SxdXmlProvider::new()));
        assert!(!registry.get(OperatorType::Assignment).unwrap().requires_current_value());
        assert!(registry.get(OperatorType::JavaMethod).unwrap().requires_current_value());
        assert!(!registry.get(OperatorType::Deletion).unwrap().requires_current_value());
    }
}
