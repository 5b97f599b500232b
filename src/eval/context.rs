use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::script::partition::PartitionKey;
use crate::value::Value;

/// Per-call map from expression discriminant to its computed value.
pub type ResolvedValues = HashMap<Discriminant, Value>;

pub type Discriminant = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, strum::Display)]
pub enum ContainerKind {
    ProcessInstance,
    FlowNode,
}

/// The running process instance or flow node an evaluation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ContainerRef {
    pub id: i64,
    pub kind: ContainerKind,
}

impl ContainerRef {
    pub fn new(id: i64, kind: ContainerKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum EvaluationPhase {
    #[default]
    Active,
    Archived,
}

/// Variable bindings visible to expressions during one unit of work.
///
/// Strategies only read it; the operation service installs retrieved and
/// newly computed left operand values between operations.
#[derive(Debug, Clone, Default)]
pub struct DependencyContext {
    variables: HashMap<String, Value>,
    container: Option<ContainerRef>,
    partition: Option<PartitionKey>,
}

impl DependencyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables(variables: HashMap<String, Value>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: ContainerRef) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_partition(mut self, partition: PartitionKey) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn container(&self) -> Option<&ContainerRef> {
        self.container.as_ref()
    }

    pub fn set_container(&mut self, container: ContainerRef) {
        self.container = Some(container);
    }

    pub fn partition(&self) -> Option<PartitionKey> {
        self.partition
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    /// Installs the value unless the name is already bound. Returns whether
    /// the value was installed.
    pub fn insert_if_absent(&mut self, name: &str, value: Value) -> bool {
        if self.variables.contains_key(name) {
            return false;
        }
        self.variables.insert(name.to_string(), value);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }
}
