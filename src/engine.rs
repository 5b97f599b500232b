use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::error::{ExpressionError, ExpressionResult, OperationResult};
use crate::eval::context::{ContainerRef, DependencyContext, EvaluationPhase, ResolvedValues};
use crate::eval::evaluator::{EvaluationTracker, ExpressionEvaluator};
use crate::eval::expression::{Expression, ExpressionKind};
use crate::eval::registry::StrategyRegistry;
use crate::eval::resolver::ExpressionResolver;
use crate::operation::executor::OperationExecutorRegistry;
use crate::operation::handler::LeftOperandHandlerRegistry;
use crate::operation::model::Operation;
use crate::operation::service::OperationService;
use crate::script::{
    BuiltinInterpreter, CacheService, CacheStats, InMemoryCacheService, PartitionLoader,
    ScriptExecutor, ScriptInterpreter,
};
use crate::value::Value;
use crate::xml::{SxdXmlProvider, XmlProvider};
use crate::InternalResult;

/// Collaborators the engine is wired from.
pub struct EngineParts {
    pub handlers: LeftOperandHandlerRegistry,
    pub loader: Arc<dyn PartitionLoader>,
    pub interpreter: Arc<dyn ScriptInterpreter>,
    pub cache: Arc<dyn CacheService>,
    pub xml: Arc<dyn XmlProvider>,
    pub tracker: Option<Arc<dyn EvaluationTracker>>,
}

impl EngineParts {
    /// Built-in interpreter, in-memory cache and sxd based XML support.
    pub fn new(handlers: LeftOperandHandlerRegistry, loader: Arc<dyn PartitionLoader>) -> Self {
        Self {
            handlers,
            loader,
            interpreter: Arc::new(BuiltinInterpreter::new()),
            cache: Arc::new(InMemoryCacheService::new()),
            xml: Arc::new(SxdXmlProvider::new()),
            tracker: None,
        }
    }
}

/// Entry point used by the unit of work executor.
pub struct ExpressionEngine {
    resolver: Arc<ExpressionResolver>,
    operations: OperationService,
    scripts: Arc<ScriptExecutor>,
}

impl ExpressionEngine {
    pub fn new(config: EngineConfig, parts: EngineParts) -> InternalResult<Self> {
        let scripts = Arc::new(ScriptExecutor::new(
            parts.interpreter,
            parts.cache,
            parts.loader,
            config.script.clone(),
        ));
        let registry = StrategyRegistry::with_defaults(scripts.clone(), parts.xml.clone())?;
        info!(
            "Expression engine ready with {} strategies, return type checks {}",
            registry.len(),
            if config.check_return_types { "on" } else { "off" }
        );

        let mut evaluator = ExpressionEvaluator::new(Arc::new(registry), config.check_return_types);
        if let Some(tracker) = parts.tracker {
            evaluator = evaluator.with_tracker(tracker);
        }
        let resolver = Arc::new(ExpressionResolver::new(Arc::new(evaluator)));
        let operations = OperationService::new(
            resolver.clone(),
            Arc::new(parts.handlers),
            Arc::new(OperationExecutorRegistry::with_defaults(parts.xml)),
            config.operation,
        );

        Ok(Self {
            resolver,
            operations,
            scripts,
        })
    }

    /// Evaluates an expression and, first, every dependency below it.
    pub fn evaluate(
        &self,
        expression: &Expression,
        context: &mut DependencyContext,
    ) -> ExpressionResult<Value> {
        self.evaluate_in_phase(expression, context, EvaluationPhase::Active)
    }

    /// Same as [`evaluate`](Self::evaluate) for a container in the given
    /// phase, e.g. re-evaluating display expressions of an archived one.
    pub fn evaluate_in_phase(
        &self,
        expression: &Expression,
        context: &mut DependencyContext,
        phase: EvaluationPhase,
    ) -> ExpressionResult<Value> {
        self.resolver
            .resolve(expression, context, &mut ResolvedValues::new(), phase)
    }

    /// Evaluates same-kind expressions with one strategy call after their
    /// dependencies are resolved.
    pub fn evaluate_batch(
        &self,
        kind: ExpressionKind,
        expressions: &[Expression],
        context: &mut DependencyContext,
    ) -> ExpressionResult<Vec<Value>> {
        if let Some(other) = expressions.iter().find(|e| e.kind() != kind) {
            return Err(ExpressionError::invalid(
                other,
                format!("expected a {} expression in batch", kind),
            ));
        }
        self.resolver.resolve_all(
            expressions,
            context,
            &mut ResolvedValues::new(),
            EvaluationPhase::Active,
        )
    }

    pub async fn execute_operations(
        &self,
        operations: &[Operation],
        container: &ContainerRef,
        context: &mut DependencyContext,
    ) -> OperationResult<()> {
        self.operations.execute(operations, container, context).await
    }

    pub fn script_stats(&self) -> &CacheStats {
        self.scripts.stats()
    }
}
