use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{error, info};

use super::partition::{PartitionEvent, PartitionKey, PartitionListener};
use super::{CompiledScript, ScriptShell};

pub const SHELL_KEY: &str = "shell";

pub fn script_key(hash: &str) -> String {
    format!("script:{}", hash)
}

pub fn coercion_key(hash: &str) -> String {
    format!("coerce:{}", hash)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A cached item tagged with the invalidation generation it was built in.
/// Entries from an older generation are treated as misses.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Script {
        script: Arc<CompiledScript>,
        generation: u64,
    },
    Shell {
        shell: Arc<ScriptShell>,
        generation: u64,
    },
}

impl CacheEntry {
    pub fn generation(&self) -> u64 {
        match self {
            CacheEntry::Script { generation, .. } | CacheEntry::Shell { generation, .. } => {
                *generation
            }
        }
    }
}

/// Thread-safe store of compiled scripts and shells, keyed by partition and
/// item key.
#[mockall::automock]
pub trait CacheService: Send + Sync {
    fn get(&self, partition: PartitionKey, key: &str) -> CacheResult<Option<CacheEntry>>;

    fn put(&self, partition: PartitionKey, key: String, entry: CacheEntry) -> CacheResult<()>;

    /// Drops every entry of every partition.
    fn clear(&self) -> CacheResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCacheService {
    entries: DashMap<(PartitionKey, String), CacheEntry>,
}

impl InMemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheService for InMemoryCacheService {
    fn get(&self, partition: PartitionKey, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self
            .entries
            .get(&(partition, key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn put(&self, partition: PartitionKey, key: String, entry: CacheEntry) -> CacheResult<()> {
        self.entries.insert((partition, key), entry);
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Clears the whole cache, all partitions included, on any reload or
/// destroy event.
///
/// The generation is bumped before the clear. An evaluation that loaded a
/// library under an older generation may still put its entry after the
/// clear, but readers never accept it.
pub struct ScriptCacheInvalidator {
    cache: Arc<dyn CacheService>,
    generation: AtomicU64,
}

impl ScriptCacheInvalidator {
    pub fn new(cache: Arc<dyn CacheService>) -> Self {
        Self {
            cache,
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl PartitionListener for ScriptCacheInvalidator {
    fn on_partition_event(&self, event: &PartitionEvent) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Clearing script cache after {:?}, generation {}", event, generation);
        if let Err(e) = self.cache.clear() {
            error!("Failed to clear script cache: {}", e);
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    compilations: AtomicUsize,
    hits: AtomicUsize,
    coercions: AtomicUsize,
}

impl CacheStats {
    pub fn record_compilation(&self) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coercion(&self) {
        self.coercions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn coercions(&self) -> usize {
        self.coercions.load(Ordering::Relaxed)
    }
}
