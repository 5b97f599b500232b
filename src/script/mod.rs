//! Embedded script support: the interpreter seam, partition libraries, the
//! compilation cache and the executor the script strategies delegate to.

pub mod cache;
pub mod error;
pub mod executor;
pub mod lang;
pub mod library;
pub mod partition;

use std::collections::HashMap;
use std::sync::Arc;

use ring::digest;

use crate::value::Value;
use error::ScriptResult;
use lang::ast::Program;
use library::ScriptLibrary;
use partition::PartitionKey;

pub use cache::{CacheEntry, CacheService, CacheStats, InMemoryCacheService};
pub use executor::ScriptExecutor;
pub use lang::BuiltinInterpreter;
pub use partition::{InMemoryPartitionLoader, PartitionEvent, PartitionListener, PartitionLoader};

/// Compiled form of a script source.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub source_hash: String,
    pub program: Arc<Program>,
}

/// Reusable interpreter context bound to one partition's function library.
#[derive(Debug, Clone)]
pub struct ScriptShell {
    pub partition: Option<PartitionKey>,
    pub library: Arc<ScriptLibrary>,
}

#[mockall::automock]
pub trait ScriptInterpreter: Send + Sync {
    fn compile(&self, source: &str) -> ScriptResult<CompiledScript>;

    fn new_context(
        &self,
        partition: Option<PartitionKey>,
        library: Arc<ScriptLibrary>,
    ) -> ScriptShell;

    fn run(
        &self,
        script: &CompiledScript,
        shell: &ScriptShell,
        bindings: &HashMap<String, Value>,
    ) -> ScriptResult<Value>;
}

/// Hex encoded SHA-256 of a script source, used as the cache item key.
pub fn source_hash(source: &str) -> String {
    digest::digest(&digest::SHA256, source.as_bytes())
        .as_ref()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
