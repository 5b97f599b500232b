use std::collections::HashMap;
use std::sync::Arc;

use super::expression::ExpressionKind;
use super::strategy::{
    BusinessDataStrategy, ConditionStrategy, ConstantStrategy, ExpressionStrategy, ListStrategy,
    ScriptConditionStrategy, ScriptStrategy, VariableStrategy, XPathReadStrategy,
};
use crate::error::{ExpressionError, ExpressionResult};
use crate::script::ScriptExecutor;
use crate::xml::XmlProvider;

/// Kind to strategy table. Filled while building, then shared read-only.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<ExpressionKind, Arc<dyn ExpressionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a strategy for every built-in kind.
    pub fn with_defaults(
        scripts: Arc<ScriptExecutor>,
        xml: Arc<dyn XmlProvider>,
    ) -> ExpressionResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(ConstantStrategy::new()))?;
        registry.register(Arc::new(VariableStrategy::new()))?;
        registry.register(Arc::new(BusinessDataStrategy::new()))?;
        registry.register(Arc::new(ConditionStrategy::new()))?;
        registry.register(Arc::new(ListStrategy::new()))?;
        registry.register(Arc::new(XPathReadStrategy::new(xml)))?;
        registry.register(Arc::new(ScriptStrategy::new(scripts.clone())))?;
        registry.register(Arc::new(ScriptConditionStrategy::new(scripts)))?;
        Ok(registry)
    }

    pub fn register(&mut self, strategy: Arc<dyn ExpressionStrategy>) -> ExpressionResult<()> {
        let kind = strategy.kind();
        if self.strategies.contains_key(&kind) {
            return Err(ExpressionError::DuplicateStrategy(kind));
        }
        self.strategies.insert(kind, strategy);
        Ok(())
    }

    pub fn get(&self, kind: ExpressionKind) -> ExpressionResult<&Arc<dyn ExpressionStrategy>> {
        self.strategies
            .get(&kind)
            .ok_or(ExpressionError::UnknownExpressionKind(kind))
    }

    pub fn contains(&self, kind: ExpressionKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
