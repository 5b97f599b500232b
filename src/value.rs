use core::fmt;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// A node selected out of an XML document by a path query.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct XmlNode {
    pub name: String,
    pub value: String,
}

impl XmlNode {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// 値の型システム
#[derive(Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Node(XmlNode),
    NodeSet(Vec<XmlNode>),
    #[default]
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Node(node) => write!(f, "{}", node.value),
            Value::Null => write!(f, "null"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Declared return type of an expression.
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
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    String,
    List,
    Map,
    Node,
    NodeSet,
    Object,
}

lazy_static! {
    // (actual, declared) pairs accepted as-is without running a coercion.
    static ref CONVERTIBLE: HashSet<(ValueType, ValueType)> = {
        let mut pairs = HashSet::new();
        pairs.insert((ValueType::Integer, ValueType::Long));
        pairs.insert((ValueType::Integer, ValueType::Double));
        pairs.insert((ValueType::Integer, ValueType::Float));
        pairs.insert((ValueType::Long, ValueType::Double));
        pairs.insert((ValueType::Float, ValueType::Double));
        pairs
    };
}

impl ValueType {
    /// Exact match, or `Object` which takes anything.
    pub fn is_assignable_from(&self, actual: ValueType) -> bool {
        *self == ValueType::Object || *self == actual
    }

    pub fn is_convertible_from(&self, actual: ValueType) -> bool {
        CONVERTIBLE.contains(&(actual, *self))
    }

    pub fn accepts(&self, actual: ValueType) -> bool {
        self.is_assignable_from(actual) || self.is_convertible_from(actual)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Integer | ValueType::Long | ValueType::Float | ValueType::Double
        )
    }
}

impl Value {
    /// Runtime type of the value, `None` for `Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::Integer(_) => Some(ValueType::Integer),
            Value::Long(_) => Some(ValueType::Long),
            Value::Float(_) => Some(ValueType::Float),
            Value::Double(_) => Some(ValueType::Double),
            Value::String(_) => Some(ValueType::String),
            Value::List(_) => Some(ValueType::List),
            Value::Map(_) => Some(ValueType::Map),
            Value::Node(_) => Some(ValueType::Node),
            Value::NodeSet(_) => Some(ValueType::NodeSet),
            Value::Null => None,
        }
    }

    pub fn type_name(&self) -> String {
        self.value_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Null".to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view, only for `Integer` and `Long`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality with numeric promotion, so `Integer(5)` equals `Long(5)`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if let (Some(l), Some(r)) = (self.as_i64(), other.as_i64()) {
            return l == r;
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => self == other,
        }
    }

    /// Natural ordering: numbers across widths, strings, booleans.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(l), Some(r)) = (self.as_i64(), other.as_i64()) {
            return Some(l.cmp(&r));
        }
        if let (Some(l), Some(r)) = (self.as_f64(), other.as_f64()) {
            return l.partial_cmp(&r);
        }
        match (self, other) {
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

/// Parses a scalar text into the given type. Booleans follow the lenient
/// rule where only a case-insensitive "true" is true.
pub fn parse_scalar(text: &str, target: ValueType) -> Result<Value, String> {
    let trimmed = text.trim();
    let invalid = || format!("cannot convert '{}' to {}", text, target);
    match target {
        ValueType::String => Ok(Value::String(text.to_string())),
        ValueType::Boolean => Ok(Value::Boolean(trimmed.eq_ignore_ascii_case("true"))),
        ValueType::Integer => trimmed.parse().map(Value::Integer).map_err(|_| invalid()),
        ValueType::Long => trimmed.parse().map(Value::Long).map_err(|_| invalid()),
        ValueType::Float => trimmed.parse().map(Value::Float).map_err(|_| invalid()),
        ValueType::Double => trimmed.parse().map(Value::Double).map_err(|_| invalid()),
        other => Err(format!("{} is not a scalar type", other)),
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
