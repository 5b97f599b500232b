use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::context::Discriminant;
use crate::value::ValueType;

/// Tag selecting the strategy that evaluates an expression.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum ExpressionKind {
    Constant,
    Variable,
    BusinessData,
    Condition,
    List,
    XPathRead,
    Script,
    ScriptCondition,
}

/// An immutable expression node. Dependencies form a DAG; structurally equal
/// nodes share a discriminant so their values are computed once per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExpressionDef")]
pub struct Expression {
    kind: ExpressionKind,
    name: String,
    content: Option<String>,
    return_type: ValueType,
    dependencies: Vec<Expression>,
    discriminant: Discriminant,
}

#[derive(Deserialize)]
struct ExpressionDef {
    kind: ExpressionKind,
    name: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default = "default_return_type")]
    return_type: ValueType,
    #[serde(default)]
    dependencies: Vec<Expression>,
}

fn default_return_type() -> ValueType {
    ValueType::Object
}

impl From<ExpressionDef> for Expression {
    fn from(def: ExpressionDef) -> Self {
        Expression::new(
            def.kind,
            def.name,
            def.content,
            def.return_type,
            def.dependencies,
        )
    }
}

impl Expression {
    pub fn new(
        kind: ExpressionKind,
        name: impl Into<String>,
        content: Option<String>,
        return_type: ValueType,
        dependencies: Vec<Expression>,
    ) -> Self {
        let name = name.into();
        let discriminant =
            Self::compute_discriminant(kind, &name, content.as_deref(), return_type, &dependencies);
        Self {
            kind,
            name,
            content,
            return_type,
            dependencies,
            discriminant,
        }
    }

    fn compute_discriminant(
        kind: ExpressionKind,
        name: &str,
        content: Option<&str>,
        return_type: ValueType,
        dependencies: &[Expression],
    ) -> Discriminant {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        name.hash(&mut hasher);
        content.hash(&mut hasher);
        return_type.hash(&mut hasher);
        for dependency in dependencies {
            dependency.discriminant.hash(&mut hasher);
        }
        hasher.finish() as Discriminant
    }

    pub fn constant(content: impl Into<String>, return_type: ValueType) -> Self {
        let content = content.into();
        Self::new(
            ExpressionKind::Constant,
            content.clone(),
            Some(content),
            return_type,
            vec![],
        )
    }

    pub fn variable(name: impl Into<String>, return_type: ValueType) -> Self {
        let name = name.into();
        Self::new(
            ExpressionKind::Variable,
            name.clone(),
            Some(name),
            return_type,
            vec![],
        )
    }

    pub fn business_data(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(
            ExpressionKind::BusinessData,
            entity.clone(),
            Some(entity),
            ValueType::Map,
            vec![],
        )
    }

    pub fn condition(operator: impl Into<String>, dependencies: Vec<Expression>) -> Self {
        let operator = operator.into();
        Self::new(
            ExpressionKind::Condition,
            operator.clone(),
            Some(operator),
            ValueType::Boolean,
            dependencies,
        )
    }

    pub fn list(name: impl Into<String>, dependencies: Vec<Expression>) -> Self {
        Self::new(
            ExpressionKind::List,
            name,
            None,
            ValueType::List,
            dependencies,
        )
    }

    pub fn xpath(
        name: impl Into<String>,
        query: impl Into<String>,
        return_type: ValueType,
        document: Expression,
    ) -> Self {
        Self::new(
            ExpressionKind::XPathRead,
            name,
            Some(query.into()),
            return_type,
            vec![document],
        )
    }

    pub fn script(
        name: impl Into<String>,
        source: impl Into<String>,
        return_type: ValueType,
        dependencies: Vec<Expression>,
    ) -> Self {
        Self::new(
            ExpressionKind::Script,
            name,
            Some(source.into()),
            return_type,
            dependencies,
        )
    }

    pub fn script_condition(
        name: impl Into<String>,
        source: impl Into<String>,
        dependencies: Vec<Expression>,
    ) -> Self {
        Self::new(
            ExpressionKind::ScriptCondition,
            name,
            Some(source.into()),
            ValueType::Boolean,
            dependencies,
        )
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    pub fn dependencies(&self) -> &[Expression] {
        &self.dependencies
    }

    pub fn discriminant(&self) -> Discriminant {
        self.discriminant
    }

    /// Whether this expression, or any expression below it, reads the named
    /// business entity.
    pub fn reads_business_data(&self, entity: &str) -> bool {
        if self.kind == ExpressionKind::BusinessData && self.content() == Some(entity) {
            return true;
        }
        self.dependencies
            .iter()
            .any(|dependency| dependency.reads_business_data(entity))
    }
}
