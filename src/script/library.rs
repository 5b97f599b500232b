use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ScriptError, ScriptResult};
use super::lang::ast::FunctionDef;
use super::lang::parser::parse_library;

/// Functions a partition makes available to its scripts.
#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    functions: HashMap<String, Arc<FunctionDef>>,
}

impl ScriptLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses `def name(params) = body` declarations. A later declaration
    /// with the same name replaces the earlier one.
    pub fn parse(source: &str) -> ScriptResult<Self> {
        let (_, definitions) =
            parse_library(source).map_err(|e| ScriptError::Parse(e.to_string()))?;
        Ok(Self::from_definitions(definitions))
    }

    pub fn from_definitions(definitions: Vec<FunctionDef>) -> Self {
        let functions = definitions
            .into_iter()
            .map(|definition| (definition.name.clone(), Arc::new(definition)))
            .collect();
        Self { functions }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name).map(|definition| definition.as_ref())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
