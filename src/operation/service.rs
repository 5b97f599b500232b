use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::executor::OperationExecutorRegistry;
use super::handler::LeftOperandHandlerRegistry;
use super::model::{LeftOperand, Operation, OperatorType};
use super::persist::should_persist;
use crate::config::OperationConfig;
use crate::error::{OperationError, OperationResult};
use crate::eval::context::{ContainerRef, DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::resolver::ExpressionResolver;
use crate::value::Value;

/// Batch mode is allowed when a single operand is touched, or when any
/// touched operand's handler accepts batch updates.
pub fn use_batch_mode(operations: &[Operation], handlers: &LeftOperandHandlerRegistry) -> bool {
    let operands = reduce_outcomes(operations);
    operands.len() == 1
        || operands
            .iter()
            .any(|(operand, _)| handlers.supports_batch_update(&operand.operand_type))
}

/// Final action per operand in order of first appearance: `true` writes the
/// last computed value, `false` deletes. A deletion sticks even when the
/// operand is assigned again later in the same list.
pub fn reduce_outcomes(operations: &[Operation]) -> Vec<(LeftOperand, bool)> {
    let mut outcomes: Vec<(LeftOperand, bool)> = Vec::new();
    for operation in operations {
        let update = operation.operator_type != OperatorType::Deletion;
        match outcomes
            .iter_mut()
            .find(|(operand, _)| *operand == operation.left_operand)
        {
            Some((_, pending)) => *pending = *pending && update,
            None => outcomes.push((operation.left_operand.clone(), update)),
        }
    }
    outcomes
}

/// Applies operation lists for one unit of work.
pub struct OperationService {
    resolver: Arc<ExpressionResolver>,
    handlers: Arc<LeftOperandHandlerRegistry>,
    executors: Arc<OperationExecutorRegistry>,
    config: OperationConfig,
}

impl OperationService {
    pub fn new(
        resolver: Arc<ExpressionResolver>,
        handlers: Arc<LeftOperandHandlerRegistry>,
        executors: Arc<OperationExecutorRegistry>,
        config: OperationConfig,
    ) -> Self {
        Self {
            resolver,
            handlers,
            executors,
            config,
        }
    }

    pub fn handlers(&self) -> &LeftOperandHandlerRegistry {
        &self.handlers
    }

    /// Runs the operations in list order against `container`. Values read
    /// or computed along the way are left in `context`.
    #[instrument(level = "debug", skip_all, fields(container = %container, count = operations.len()))]
    pub async fn execute(
        &self,
        operations: &[Operation],
        container: &ContainerRef,
        context: &mut DependencyContext,
    ) -> OperationResult<()> {
        context.set_container(container.clone());
        self.retrieve_current_values(operations, context).await?;

        if !self.config.force_sequential && use_batch_mode(operations, &self.handlers) {
            self.execute_batch(operations, container, context).await
        } else {
            self.execute_sequential(operations, container, context).await
        }
    }

    async fn retrieve_current_values(
        &self,
        operations: &[Operation],
        context: &mut DependencyContext,
    ) -> OperationResult<()> {
        for operation in operations {
            let operand = &operation.left_operand;
            let executor = self.executors.get(operation.operator_type)?;
            if !executor.requires_current_value() || context.contains(&operand.name) {
                continue;
            }
            let handler = self.handlers.get(&operand.operand_type)?;
            let value = handler.retrieve(operand, context).await?;
            debug!("retrieved current value of '{}'", operand.name);
            context.insert_if_absent(&operand.name, value);
        }
        Ok(())
    }

    async fn execute_batch(
        &self,
        operations: &[Operation],
        container: &ContainerRef,
        context: &mut DependencyContext,
    ) -> OperationResult<()> {
        info!("Executing {} operations in batch mode", operations.len());
        let mut values: HashMap<&LeftOperand, Value> = HashMap::new();
        for operation in operations {
            if let Some(value) = self.compute(operation, context)? {
                values.insert(&operation.left_operand, value);
            }
        }

        for (operand, update) in reduce_outcomes(operations) {
            let handler = self.handlers.get(&operand.operand_type)?;
            if !update {
                handler.delete(&operand, container).await?;
                continue;
            }
            let value = values.remove(&operand).ok_or_else(|| {
                OperationError::failure(&operand.name, "no value computed for operand")
            })?;
            handler.update(&operand, value, container).await?;
        }
        Ok(())
    }

    async fn execute_sequential(
        &self,
        operations: &[Operation],
        container: &ContainerRef,
        context: &mut DependencyContext,
    ) -> OperationResult<()> {
        info!("Executing {} operations one by one", operations.len());
        for (index, operation) in operations.iter().enumerate() {
            let operand = &operation.left_operand;
            let handler = self.handlers.get(&operand.operand_type)?;
            match self.compute(operation, context)? {
                Some(value) => {
                    if operand.is_business_data() && !should_persist(index, operations) {
                        debug!(
                            "Not flushing '{}' at {}, overwritten before any read",
                            operand.name, index
                        );
                        continue;
                    }
                    handler.update(operand, value, container).await?;
                }
                None => handler.delete(operand, container).await?,
            }
        }
        Ok(())
    }

    /// Evaluates the right operand and installs the new value in the
    /// context. `None` means the operand is to be deleted.
    fn compute(
        &self,
        operation: &Operation,
        context: &mut DependencyContext,
    ) -> OperationResult<Option<Value>> {
        let operand = &operation.left_operand;
        let executor = self.executors.get(operation.operator_type)?;
        let right = match (&operation.right_operand, operation.operator_type) {
            (Some(expression), _) => self.resolver.resolve(
                expression,
                context,
                &mut ResolvedValues::new(),
                EvaluationPhase::Active,
            )?,
            (None, OperatorType::Deletion) => Value::Null,
            (None, _) => {
                return Err(OperationError::failure(&operand.name, "no right operand"));
            }
        };

        let current = context.get(&operand.name).cloned();
        let value = executor.compute_new_value(operation, right, current.as_ref())?;
        if operation.operator_type == OperatorType::Deletion {
            context.remove(&operand.name);
            return Ok(None);
        }
        context.insert(operand.name.clone(), value.clone());
        Ok(Some(value))
    }
}
