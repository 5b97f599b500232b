use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::library::ScriptLibrary;

/// Code loading scope scripts are compiled against, one per process
/// definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PartitionKey(pub i64);

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "partition:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionEvent {
    Reloaded(PartitionKey),
    Destroyed(PartitionKey),
}

impl PartitionEvent {
    pub fn partition(&self) -> PartitionKey {
        match self {
            PartitionEvent::Reloaded(key) | PartitionEvent::Destroyed(key) => *key,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    #[error("Partition not found: {0}")]
    PartitionNotFound(PartitionKey),
    #[error("Failed to load {partition}: {reason}")]
    LoadFailed {
        partition: PartitionKey,
        reason: String,
    },
}

/// Handle returned by [`PartitionLoader::add_listener`].
pub type ListenerId = usize;

pub trait PartitionListener: Send + Sync {
    fn on_partition_event(&self, event: &PartitionEvent);
}

#[mockall::automock]
pub trait PartitionLoader: Send + Sync {
    /// Library for the partition, or the ambient one for `None`.
    fn library(&self, partition: Option<PartitionKey>) -> Result<Arc<ScriptLibrary>, LoaderError>;

    fn add_listener(&self, listener: Arc<dyn PartitionListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Loader holding libraries in memory. `reload` and `destroy` notify every
/// registered listener after the change is applied.
#[derive(Default)]
pub struct InMemoryPartitionLoader {
    ambient: Arc<ScriptLibrary>,
    partitions: DashMap<PartitionKey, Arc<ScriptLibrary>>,
    listeners: DashMap<ListenerId, Arc<dyn PartitionListener>>,
    next_listener_id: AtomicUsize,
}

impl InMemoryPartitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ambient(ambient: ScriptLibrary) -> Self {
        Self {
            ambient: Arc::new(ambient),
            ..Self::default()
        }
    }

    /// Registers a partition without notifying anyone.
    pub fn define(&self, partition: PartitionKey, library: ScriptLibrary) {
        self.partitions.insert(partition, Arc::new(library));
    }

    pub fn reload(&self, partition: PartitionKey, library: ScriptLibrary) {
        self.partitions.insert(partition, Arc::new(library));
        self.notify(PartitionEvent::Reloaded(partition));
    }

    pub fn destroy(&self, partition: PartitionKey) {
        self.partitions.remove(&partition);
        self.notify(PartitionEvent::Destroyed(partition));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, event: PartitionEvent) {
        info!("{:?}, notifying {} listeners", event, self.listeners.len());
        for listener in self.listeners.iter() {
            listener.value().on_partition_event(&event);
        }
    }
}

impl PartitionLoader for InMemoryPartitionLoader {
    fn library(&self, partition: Option<PartitionKey>) -> Result<Arc<ScriptLibrary>, LoaderError> {
        match partition {
            None => Ok(self.ambient.clone()),
            Some(key) => self
                .partitions
                .get(&key)
                .map(|entry| entry.value().clone())
                .ok_or(LoaderError::PartitionNotFound(key)),
        }
    }

    fn add_listener(&self, listener: Arc<dyn PartitionListener>) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        debug!("listener {} registered", id);
        self.listeners.insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        if self.listeners.remove(&id).is_some() {
            debug!("listener {} removed", id);
        }
    }
}
