//! In-memory left operand handlers, used by the binary and by tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::handler::LeftOperandHandler;
use super::model::{LeftOperand, LeftOperandType};
use crate::error::{OperationError, OperationResult};
use crate::eval::context::{ContainerRef, DependencyContext};
use crate::value::Value;

/// Values keyed by container and operand name.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: DashMap<(ContainerRef, String), Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, container: &ContainerRef, name: impl Into<String>, value: Value) {
        self.values.insert((container.clone(), name.into()), value);
    }

    pub fn get(&self, container: &ContainerRef, name: &str) -> Option<Value> {
        self.values
            .get(&(container.clone(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, container: &ContainerRef, name: &str) -> Option<Value> {
        self.values
            .remove(&(container.clone(), name.to_string()))
            .map(|(_, value)| value)
    }

    /// Values of one container, sorted by name.
    pub fn snapshot(&self, container: &ContainerRef) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|entry| entry.key().0 == *container)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect()
    }

    fn retrieve(&self, operand: &LeftOperand, context: &DependencyContext) -> OperationResult<Value> {
        let container = context
            .container()
            .ok_or_else(|| OperationError::failure(&operand.name, "no container in context"))?;
        self.get(container, &operand.name).ok_or_else(|| {
            OperationError::failure(
                &operand.name,
                format!("{} '{}' not found in {}", operand.operand_type, operand.name, container),
            )
        })
    }
}

/// Process variables. Writes of several variables can share one pass.
pub struct DataHandler {
    store: Arc<InMemoryStore>,
}

impl DataHandler {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LeftOperandHandler for DataHandler {
    fn operand_type(&self) -> LeftOperandType {
        LeftOperandType::Data
    }

    async fn retrieve(
        &self,
        operand: &LeftOperand,
        context: &DependencyContext,
    ) -> OperationResult<Value> {
        self.store.retrieve(operand, context)
    }

    async fn update(
        &self,
        operand: &LeftOperand,
        value: Value,
        container: &ContainerRef,
    ) -> OperationResult<()> {
        debug!("data '{}' = {} in {}", operand.name, value, container);
        self.store.set(container, &operand.name, value);
        Ok(())
    }

    async fn delete(&self, operand: &LeftOperand, container: &ContainerRef) -> OperationResult<()> {
        self.store.remove(container, &operand.name);
        Ok(())
    }

    fn supports_batch_update(&self) -> bool {
        true
    }
}

/// Transient variables; they cannot be deleted.
pub struct TransientDataHandler {
    store: Arc<InMemoryStore>,
}

impl TransientDataHandler {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LeftOperandHandler for TransientDataHandler {
    fn operand_type(&self) -> LeftOperandType {
        LeftOperandType::TransientData
    }

    async fn retrieve(
        &self,
        operand: &LeftOperand,
        context: &DependencyContext,
    ) -> OperationResult<Value> {
        self.store.retrieve(operand, context)
    }

    async fn update(
        &self,
        operand: &LeftOperand,
        value: Value,
        container: &ContainerRef,
    ) -> OperationResult<()> {
        self.store.set(container, &operand.name, value);
        Ok(())
    }

    async fn delete(&self, operand: &LeftOperand, _container: &ContainerRef) -> OperationResult<()> {
        Err(OperationError::DeletionNotSupported {
            operand: operand.name.clone(),
            operand_type: LeftOperandType::TransientData,
        })
    }

    fn supports_batch_update(&self) -> bool {
        false
    }
}

/// A flush of a business data entity, kept in order for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PersistedWrite {
    Updated { name: String, value: Value },
    Deleted { name: String },
}

/// Business data entities. Every update reaching the handler counts as a
/// durable write.
pub struct BusinessDataHandler {
    store: Arc<InMemoryStore>,
    persisted: Mutex<Vec<PersistedWrite>>,
}

impl BusinessDataHandler {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            persisted: Mutex::new(Vec::new()),
        }
    }

    pub async fn persisted(&self) -> Vec<PersistedWrite> {
        self.persisted.lock().await.clone()
    }
}

#[async_trait]
impl LeftOperandHandler for BusinessDataHandler {
    fn operand_type(&self) -> LeftOperandType {
        LeftOperandType::BusinessData
    }

    async fn retrieve(
        &self,
        operand: &LeftOperand,
        context: &DependencyContext,
    ) -> OperationResult<Value> {
        self.store.retrieve(operand, context)
    }

    async fn update(
        &self,
        operand: &LeftOperand,
        value: Value,
        container: &ContainerRef,
    ) -> OperationResult<()> {
        debug!("persisting business data '{}' in {}", operand.name, container);
        self.store.set(container, &operand.name, value.clone());
        self.persisted.lock().await.push(PersistedWrite::Updated {
            name: operand.name.clone(),
            value,
        });
        Ok(())
    }

    async fn delete(&self, operand: &LeftOperand, container: &ContainerRef) -> OperationResult<()> {
        self.store.remove(container, &operand.name);
        self.persisted.lock().await.push(PersistedWrite::Deleted {
            name: operand.name.clone(),
        });
        Ok(())
    }

    fn supports_batch_update(&self) -> bool {
        false
    }
}
