use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::model::{LeftOperand, LeftOperandType};
use crate::error::{OperationError, OperationResult};
use crate::eval::context::{ContainerRef, DependencyContext};
use crate::value::Value;

/// Storage plugin for one left operand type.
#[mockall::automock]
#[async_trait]
pub trait LeftOperandHandler: Send + Sync {
    fn operand_type(&self) -> LeftOperandType;

    async fn retrieve(
        &self,
        operand: &LeftOperand,
        context: &DependencyContext,
    ) -> OperationResult<Value>;

    async fn update(
        &self,
        operand: &LeftOperand,
        value: Value,
        container: &ContainerRef,
    ) -> OperationResult<()>;

    async fn delete(&self, operand: &LeftOperand, container: &ContainerRef)
        -> OperationResult<()>;

    fn supports_batch_update(&self) -> bool;
}

/// Operand type to handler table, built once.
#[derive(Default, Clone)]
pub struct LeftOperandHandlerRegistry {
    handlers: HashMap<LeftOperandType, Arc<dyn LeftOperandHandler>>,
}

impl LeftOperandHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn LeftOperandHandler>) -> OperationResult<()> {
        let operand_type = handler.operand_type();
        if self.handlers.contains_key(&operand_type) {
            return Err(OperationError::failure(
                operand_type.to_string(),
                "handler already registered",
            ));
        }
        self.handlers.insert(operand_type, handler);
        Ok(())
    }

    pub fn get(&self, operand_type: &LeftOperandType) -> OperationResult<&Arc<dyn LeftOperandHandler>> {
        self.handlers
            .get(operand_type)
            .ok_or_else(|| OperationError::HandlerNotFound(operand_type.clone()))
    }

    pub fn supports_batch_update(&self, operand_type: &LeftOperandType) -> bool {
        self.handlers
            .get(operand_type)
            .is_some_and(|handler| handler.supports_batch_update())
    }
}
