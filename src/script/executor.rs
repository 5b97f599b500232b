use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::{
    coercion_key, script_key, CacheEntry, CacheError, CacheService, CacheStats,
    ScriptCacheInvalidator, SHELL_KEY,
};
use super::error::ScriptError;
use super::partition::{ListenerId, PartitionKey, PartitionLoader};
use super::{source_hash, CompiledScript, ScriptInterpreter, ScriptShell};
use crate::config::ScriptConfig;
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval::context::DependencyContext;
use crate::eval::expression::Expression;
use crate::value::{Value, ValueType};

/// Runs script expressions through the interpreter with per-partition
/// caching of compiled scripts and shells.
///
/// Scripts evaluated without a partition use the ambient library and are
/// never cached.
pub struct ScriptExecutor {
    interpreter: Arc<dyn ScriptInterpreter>,
    cache: Arc<dyn CacheService>,
    loader: Arc<dyn PartitionLoader>,
    invalidator: Arc<ScriptCacheInvalidator>,
    listener: ListenerId,
    config: ScriptConfig,
    stats: CacheStats,
}

impl ScriptExecutor {
    /// Registers a cache invalidator with the loader so reloads and
    /// destroys clear the cache. It is removed again when the executor is
    /// dropped.
    pub fn new(
        interpreter: Arc<dyn ScriptInterpreter>,
        cache: Arc<dyn CacheService>,
        loader: Arc<dyn PartitionLoader>,
        config: ScriptConfig,
    ) -> Self {
        let invalidator = Arc::new(ScriptCacheInvalidator::new(cache.clone()));
        let listener = loader.add_listener(invalidator.clone());
        Self {
            interpreter,
            cache,
            loader,
            invalidator,
            listener,
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn execute(
        &self,
        expression: &Expression,
        context: &DependencyContext,
    ) -> ExpressionResult<Value> {
        self.execute_as(expression, context, expression.return_type())
    }

    /// Like [`execute`](Self::execute) but coerces to `declared` instead of
    /// the expression's own return type.
    pub fn execute_as(
        &self,
        expression: &Expression,
        context: &DependencyContext,
        declared: ValueType,
    ) -> ExpressionResult<Value> {
        let source = expression
            .content()
            .ok_or_else(|| ExpressionError::invalid(expression, "content is empty"))?;

        let partition = context.partition();
        if partition.is_none() && self.config.warn_missing_partition {
            warn!(
                "Script '{}' evaluated without a partition key, using the ambient library",
                expression.name()
            );
        }

        // read before anything is loaded so a concurrent reload marks
        // whatever this call builds as stale
        let generation = self.invalidator.generation();
        let script = self.fetch_or_compile(
            expression,
            partition,
            generation,
            script_key(&source_hash(source)),
            source,
        )?;
        let shell = self.fetch_or_create_shell(expression, partition, generation)?;

        let raw = self
            .interpreter
            .run(&script, &shell, context.variables())
            .map_err(|e| classify(expression, e))?;
        self.coerce(expression, declared, partition, generation, &shell, raw)
    }

    fn fetch_or_compile(
        &self,
        expression: &Expression,
        partition: Option<PartitionKey>,
        generation: u64,
        key: String,
        source: &str,
    ) -> ExpressionResult<Arc<CompiledScript>> {
        if let Some(partition) = partition {
            let cached = self
                .cache
                .get(partition, &key)
                .map_err(|e| cache_failure(expression, e))?;
            if let Some(CacheEntry::Script {
                script,
                generation: cached_in,
            }) = cached
            {
                if cached_in == generation {
                    self.stats.record_hit();
                    return Ok(script);
                }
                debug!("Ignoring {} from generation {}", key, cached_in);
            }
        }

        let script = Arc::new(
            self.interpreter
                .compile(source)
                .map_err(|e| classify(expression, e))?,
        );
        self.stats.record_compilation();
        debug!("Compiled {} for '{}'", key, expression.name());

        if let Some(partition) = partition {
            let entry = CacheEntry::Script {
                script: script.clone(),
                generation,
            };
            self.store(expression, partition, generation, key, entry)?;
        }
        Ok(script)
    }

    fn fetch_or_create_shell(
        &self,
        expression: &Expression,
        partition: Option<PartitionKey>,
        generation: u64,
    ) -> ExpressionResult<Arc<ScriptShell>> {
        if let Some(partition) = partition {
            let cached = self
                .cache
                .get(partition, SHELL_KEY)
                .map_err(|e| cache_failure(expression, e))?;
            if let Some(CacheEntry::Shell {
                shell,
                generation: cached_in,
            }) = cached
            {
                if cached_in == generation {
                    return Ok(shell);
                }
                debug!("Ignoring shell of {} from generation {}", partition, cached_in);
            }
        }

        let library = self.loader.library(partition).map_err(|e| {
            ExpressionError::evaluation(expression, format!("partition loading failed: {}", e))
        })?;
        let shell = Arc::new(self.interpreter.new_context(partition, library));

        if let Some(partition) = partition {
            let entry = CacheEntry::Shell {
                shell: shell.clone(),
                generation,
            };
            self.store(expression, partition, generation, SHELL_KEY.to_string(), entry)?;
        }
        Ok(shell)
    }

    /// Puts an entry unless the cache was invalidated since `generation`
    /// was read.
    fn store(
        &self,
        expression: &Expression,
        partition: PartitionKey,
        generation: u64,
        key: String,
        entry: CacheEntry,
    ) -> ExpressionResult<()> {
        if self.invalidator.generation() != generation {
            debug!("Not caching {} of {}, invalidated meanwhile", key, partition);
            return Ok(());
        }
        self.cache
            .put(partition, key, entry)
            .map_err(|e| cache_failure(expression, e))
    }

    /// Returns the raw value when the declared type already accepts it,
    /// otherwise runs a cached `binding as Type` script over it.
    fn coerce(
        &self,
        expression: &Expression,
        declared: ValueType,
        partition: Option<PartitionKey>,
        generation: u64,
        shell: &ScriptShell,
        raw: Value,
    ) -> ExpressionResult<Value> {
        let actual = match raw.value_type() {
            Some(actual) => actual,
            None => return Ok(raw),
        };
        if declared.accepts(actual) {
            return Ok(raw);
        }

        let binding = &self.config.coercion_binding;
        let source = format!("{} as {}", binding, declared);
        let script = self.fetch_or_compile(
            expression,
            partition,
            generation,
            coercion_key(&source_hash(&source)),
            &source,
        )?;
        self.stats.record_coercion();
        debug!("Coercing {} to {} for '{}'", actual, declared, expression.name());

        let bindings = HashMap::from([(binding.clone(), raw)]);
        self.interpreter
            .run(&script, shell, &bindings)
            .map_err(|e| classify(expression, e))
    }
}

impl Drop for ScriptExecutor {
    fn drop(&mut self) {
        self.loader.remove_listener(self.listener);
    }
}

fn classify(expression: &Expression, error: ScriptError) -> ExpressionError {
    match error {
        ScriptError::UndefinedVariable(name) => ExpressionError::missing(expression, name),
        other => ExpressionError::evaluation(expression, other.to_string()),
    }
}

fn cache_failure(expression: &Expression, error: CacheError) -> ExpressionError {
    ExpressionError::evaluation(expression, format!("script cache failed: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::cache::{InMemoryCacheService, MockCacheService};
    use crate::script::lang::BuiltinInterpreter;
    use crate::script::library::ScriptLibrary;
    use crate::script::partition::{
        InMemoryPartitionLoader, LoaderError, MockPartitionLoader, PartitionListener,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Hands out the current library, then reloads the partition before the
    /// caller gets to cache anything built from it. Only the first call
    /// races.
    struct ReloadingLoader {
        inner: InMemoryPartitionLoader,
        replacement: String,
        raced: AtomicBool,
    }

    impl PartitionLoader for ReloadingLoader {
        fn library(
            &self,
            partition: Option<PartitionKey>,
        ) -> Result<Arc<ScriptLibrary>, LoaderError> {
            let library = self.inner.library(partition)?;
            if let Some(partition) = partition {
                if !self.raced.swap(true, Ordering::SeqCst) {
                    self.inner
                        .reload(partition, ScriptLibrary::parse(&self.replacement).unwrap());
                }
            }
            Ok(library)
        }

        fn add_listener(&self, listener: Arc<dyn PartitionListener>) -> ListenerId {
            self.inner.add_listener(listener)
        }

        fn remove_listener(&self, id: ListenerId) {
            self.inner.remove_listener(id)
        }
    }

    fn executor_with(loader: Arc<InMemoryPartitionLoader>) -> (ScriptExecutor, Arc<InMemoryCacheService>) {
        let cache = Arc::new(InMemoryCacheService::new());
        let executor = ScriptExecutor::new(
            Arc::new(BuiltinInterpreter::new()),
            cache.clone(),
            loader,
            ScriptConfig::default(),
        );
        (executor, cache)
    }

    fn partitioned() -> DependencyContext {
        DependencyContext::new()
            .with_partition(PartitionKey(1))
            .with_variable("amount", 20)
    }

    #[test]
    fn test_second_evaluation_is_a_cache_hit() {
        let loader = Arc::new(InMemoryPartitionLoader::new());
        loader.define(PartitionKey(1), ScriptLibrary::empty());
        let (executor, cache) = executor_with(loader);
        let expression = Expression::script("double", "amount * 2", ValueType::Integer, vec![]);

        assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(40)));
        assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(40)));

        assert_eq!(executor.stats().compilations(), 1);
        assert_eq!(executor.stats().hits(), 1);
        // compiled script plus shell
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_missing_partition_bypasses_cache() {
        let (executor, cache) = executor_with(Arc::new(InMemoryPartitionLoader::new()));
        let expression = Expression::script("double", "amount * 2", ValueType::Integer, vec![]);
        let context = DependencyContext::new().with_variable("amount", 1);

        executor.execute(&expression, &context).unwrap();
        executor.execute(&expression, &context).unwrap();

        assert_eq!(executor.stats().compilations(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_undefined_variable_is_missing_dependency() {
        let loader = Arc::new(InMemoryPartitionLoader::new());
        loader.define(PartitionKey(1), ScriptLibrary::empty());
        let (executor, _) = executor_with(loader);
        let expression = Expression::script("tax", "rate * amount", ValueType::Object, vec![]);

        assert_eq!(
            executor.execute(&expression, &partitioned()),
            Err(ExpressionError::MissingDependency {
                expression: "tax".to_string(),
                dependency: "rate".to_string(),
            })
        );
    }

    #[test]
    fn test_runtime_failure_is_evaluation_failure() {
        let loader = Arc::new(InMemoryPartitionLoader::new());
        loader.define(PartitionKey(1), ScriptLibrary::empty());
        let (executor, _) = executor_with(loader);
        let expression = Expression::script("ratio", "amount / 0", ValueType::Object, vec![]);

        assert!(matches!(
            executor.execute(&expression, &partitioned()),
            Err(ExpressionError::EvaluationFailure { reason, .. }) if reason.contains("Division by zero")
        ));
    }

    #[test]
    fn test_unknown_partition_names_loader() {
        let (executor, _) = executor_with(Arc::new(InMemoryPartitionLoader::new()));
        let expression = Expression::script("double", "amount * 2", ValueType::Integer, vec![]);

        assert!(matches!(
            executor.execute(&expression, &partitioned()),
            Err(ExpressionError::EvaluationFailure { reason, .. }) if reason.contains("partition loading")
        ));
    }

    #[test]
    fn test_cache_failure_names_cache() {
        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .returning(|_, _| Err(CacheError::Unavailable("offline".to_string())));
        let mut loader = MockPartitionLoader::new();
        loader.expect_add_listener().times(1).return_const(0usize);
        loader.expect_remove_listener().times(1).return_const(());
        let executor = ScriptExecutor::new(
            Arc::new(BuiltinInterpreter::new()),
            Arc::new(cache),
            Arc::new(loader),
            ScriptConfig::default(),
        );
        let expression = Expression::script("double", "amount * 2", ValueType::Integer, vec![]);

        assert!(matches!(
            executor.execute(&expression, &partitioned()),
            Err(ExpressionError::EvaluationFailure { reason, .. }) if reason.contains("script cache")
        ));
    }

    #[test]
    fn test_matching_type_skips_coercion() {
        let (executor, _) = executor_with(Arc::new(InMemoryPartitionLoader::new()));
        let context = DependencyContext::new().with_variable("amount", 20);

        let widened = Expression::script("wide", "amount + 1", ValueType::Long, vec![]);
        assert_eq!(executor.execute(&widened, &context), Ok(Value::Integer(21)));
        assert_eq!(executor.stats().coercions(), 0);

        let text = Expression::script("text", "amount + 1", ValueType::String, vec![]);
        assert_eq!(executor.execute(&text, &context), Ok(Value::from("21")));
        assert_eq!(executor.stats().coercions(), 1);
    }

    #[test]
    fn test_reload_during_library_load_is_not_cached() {
        let inner = InMemoryPartitionLoader::new();
        inner.define(PartitionKey(1), ScriptLibrary::parse("def rate() = 2").unwrap());
        let loader = Arc::new(ReloadingLoader {
            inner,
            replacement: "def rate() = 3".to_string(),
            raced: AtomicBool::new(false),
        });
        let cache = Arc::new(InMemoryCacheService::new());
        let executor = ScriptExecutor::new(
            Arc::new(BuiltinInterpreter::new()),
            cache.clone(),
            loader,
            ScriptConfig::default(),
        );
        let expression = Expression::script("fee", "rate() * 10", ValueType::Integer, vec![]);

        // the evaluation in flight may finish with the library it loaded
        assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(20)));
        assert!(cache.get(PartitionKey(1), SHELL_KEY).unwrap().is_none());

        for _ in 0..3 {
            assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(30)));
        }
    }

    #[test]
    fn test_entries_from_older_generation_are_ignored() {
        let loader = Arc::new(InMemoryPartitionLoader::new());
        loader.define(PartitionKey(1), ScriptLibrary::parse("def rate() = 2").unwrap());
        let (executor, cache) = executor_with(loader.clone());
        let expression = Expression::script("fee", "rate() * 10", ValueType::Integer, vec![]);
        assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(20)));
        let stale = cache.get(PartitionKey(1), SHELL_KEY).unwrap().unwrap();

        loader.reload(PartitionKey(1), ScriptLibrary::parse("def rate() = 3").unwrap());
        // a late put from an evaluation that started before the reload
        cache
            .put(PartitionKey(1), SHELL_KEY.to_string(), stale)
            .unwrap();

        assert_eq!(executor.execute(&expression, &partitioned()), Ok(Value::Integer(30)));
        assert_eq!(
            cache.get(PartitionKey(1), SHELL_KEY).unwrap().map(|entry| entry.generation()),
            Some(1)
        );
    }

    #[test]
    fn test_dropped_executor_stops_listening() {
        let loader = Arc::new(InMemoryPartitionLoader::new());
        let (first, _) = executor_with(loader.clone());
        let (second, _) = executor_with(loader.clone());
        assert_eq!(loader.listener_count(), 2);

        drop(first);
        assert_eq!(loader.listener_count(), 1);
        drop(second);
        assert_eq!(loader.listener_count(), 0);
    }
}
