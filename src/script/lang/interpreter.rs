use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, FunctionDef, Program, Statement, UnaryOp};
use crate::script::error::{ScriptError, ScriptResult};
use crate::script::library::ScriptLibrary;
use crate::value::{parse_scalar, Value, ValueType};

const MAX_CALL_DEPTH: usize = 64;

type Locals = HashMap<String, Value>;

/// Tree-walking evaluator for compiled programs.
pub struct Interpreter<'a> {
    library: &'a ScriptLibrary,
    bindings: &'a HashMap<String, Value>,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(library: &'a ScriptLibrary, bindings: &'a HashMap<String, Value>) -> Self {
        Self {
            library,
            bindings,
            depth: 0,
        }
    }

    /// Runs every statement; the value of the last expression statement is
    /// the result.
    pub fn run(&self, program: &Program) -> ScriptResult<Value> {
        let mut locals = Locals::new();
        let mut result = Value::Null;
        for statement in &program.statements {
            match statement {
                Statement::Let(name, expr) => {
                    let value = self.eval(expr, &locals)?;
                    locals.insert(name.clone(), value);
                    result = Value::Null;
                }
                Statement::Expr(expr) => result = self.eval(expr, &locals)?,
            }
        }
        Ok(result)
    }

    fn eval(&self, expr: &Expr, locals: &Locals) -> ScriptResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => locals
                .get(name)
                .or_else(|| self.bindings.get(name))
                .cloned()
                .ok_or_else(|| ScriptError::UndefinedVariable(name.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, locals))
                .collect::<ScriptResult<Vec<_>>>()
                .map(Value::List),
            Expr::Property(target, property) => {
                Self::property(self.eval(target, locals)?, property)
            }
            Expr::Unary(op, operand) => Self::unary(*op, self.eval(operand, locals)?),
            Expr::Binary(BinaryOp::And, left, right) => {
                if !Self::truth(&self.eval(left, locals)?)? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(Self::truth(&self.eval(right, locals)?)?))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                if Self::truth(&self.eval(left, locals)?)? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(Self::truth(&self.eval(right, locals)?)?))
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, locals)?;
                let right = self.eval(right, locals)?;
                Self::binary(*op, &left, &right)
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if Self::truth(&self.eval(condition, locals)?)? {
                    self.eval(then, locals)
                } else {
                    self.eval(otherwise, locals)
                }
            }
            Expr::Cast(value, target) => cast(self.eval(value, locals)?, *target),
            Expr::Call(function, arguments) => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.eval(argument, locals))
                    .collect::<ScriptResult<Vec<_>>>()?;
                match self.library.function(function) {
                    Some(definition) => self.call(definition, arguments),
                    None => builtin(function, arguments),
                }
            }
        }
    }

    fn call(&self, definition: &FunctionDef, arguments: Vec<Value>) -> ScriptResult<Value> {
        if definition.params.len() != arguments.len() {
            return Err(ScriptError::Arity {
                function: definition.name.clone(),
                expected: definition.params.len(),
                actual: arguments.len(),
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        let nested = Interpreter {
            library: self.library,
            bindings: self.bindings,
            depth: self.depth + 1,
        };
        let locals: Locals = definition
            .params
            .iter()
            .cloned()
            .zip(arguments)
            .collect();
        nested.eval(&definition.body, &locals)
    }

    fn truth(value: &Value) -> ScriptResult<bool> {
        value.as_bool().ok_or_else(|| {
            ScriptError::Type(format!("expected a Boolean but got {}", value.type_name()))
        })
    }

    fn property(target: Value, property: &str) -> ScriptResult<Value> {
        match target {
            Value::Map(mut entries) => Ok(entries.remove(property).unwrap_or(Value::Null)),
            Value::Node(node) => match property {
                "name" => Ok(Value::String(node.name)),
                "value" => Ok(Value::String(node.value)),
                _ => Ok(Value::Null),
            },
            other => Err(ScriptError::Type(format!(
                "cannot read property '{}' of {}",
                property,
                other.type_name()
            ))),
        }
    }

    fn unary(op: UnaryOp, operand: Value) -> ScriptResult<Value> {
        match (op, operand) {
            (UnaryOp::Not, operand) => Ok(Value::Boolean(!Self::truth(&operand)?)),
            (UnaryOp::Negate, Value::Integer(i)) => {
                i.checked_neg().map(Value::Integer).ok_or(ScriptError::Overflow)
            }
            (UnaryOp::Negate, Value::Long(l)) => {
                l.checked_neg().map(Value::Long).ok_or(ScriptError::Overflow)
            }
            (UnaryOp::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOp::Negate, Value::Double(d)) => Ok(Value::Double(-d)),
            (UnaryOp::Negate, other) => Err(ScriptError::Type(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        }
    }

    fn binary(op: BinaryOp, left: &Value, right: &Value) -> ScriptResult<Value> {
        match op {
            BinaryOp::Equal => Ok(Value::Boolean(left.loose_eq(right))),
            BinaryOp::NotEqual => Ok(Value::Boolean(!left.loose_eq(right))),
            BinaryOp::LessThan
            | BinaryOp::GreaterThan
            | BinaryOp::LessThanEqual
            | BinaryOp::GreaterThanEqual => {
                let ordering = left.compare(right).ok_or_else(|| {
                    ScriptError::Type(format!(
                        "cannot compare {} with {}",
                        left.type_name(),
                        right.type_name()
                    ))
                })?;
                Ok(Value::Boolean(match op {
                    BinaryOp::LessThan => ordering.is_lt(),
                    BinaryOp::GreaterThan => ordering.is_gt(),
                    BinaryOp::LessThanEqual => ordering.is_le(),
                    _ => ordering.is_ge(),
                }))
            }
            BinaryOp::Add => match (left, right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                (Value::List(l), Value::List(r)) => {
                    Ok(Value::List(l.iter().chain(r.iter()).cloned().collect()))
                }
                _ => arithmetic(op, left, right),
            },
            _ => arithmetic(op, left, right),
        }
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> ScriptResult<Value> {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        if matches!(op, BinaryOp::Divide | BinaryOp::Remainder) && r == 0 {
            return Err(ScriptError::DivisionByZero);
        }
        let value = match op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Subtract => l.checked_sub(r),
            BinaryOp::Multiply => l.checked_mul(r),
            BinaryOp::Divide => l.checked_div(r),
            BinaryOp::Remainder => l.checked_rem(r),
            _ => return Err(unsupported(op, left, right)),
        }
        .ok_or(ScriptError::Overflow)?;
        let both_integer = matches!((left, right), (Value::Integer(_), Value::Integer(_)));
        return Ok(match i32::try_from(value) {
            Ok(narrow) if both_integer => Value::Integer(narrow),
            _ => Value::Long(value),
        });
    }

    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        let value = match op {
            BinaryOp::Add => l + r,
            BinaryOp::Subtract => l - r,
            BinaryOp::Multiply => l * r,
            BinaryOp::Divide => l / r,
            BinaryOp::Remainder => l % r,
            _ => return Err(unsupported(op, left, right)),
        };
        return Ok(match (left, right) {
            (Value::Float(_), Value::Float(_)) => Value::Float(value as f32),
            _ => Value::Double(value),
        });
    }

    Err(unsupported(op, left, right))
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> ScriptError {
    ScriptError::Type(format!(
        "unsupported operands for {:?}: {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

/// Converts a value to the target type, the way `value as Type` does.
pub fn cast(value: Value, target: ValueType) -> ScriptResult<Value> {
    match (target, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ValueType::Object, value) => Ok(value),
        (ValueType::String, value) => Ok(Value::String(value.to_string())),
        (ValueType::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
        (ValueType::Boolean, Value::String(text))
            if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") =>
        {
            Ok(Value::Boolean(text.eq_ignore_ascii_case("true")))
        }
        (target, value) if target.is_numeric() => numeric_cast(value, target),
        (ValueType::List, Value::List(items)) => Ok(Value::List(items)),
        (ValueType::List, Value::NodeSet(nodes)) => Ok(Value::List(
            nodes.into_iter().map(|node| Value::String(node.value)).collect(),
        )),
        (ValueType::Map, Value::Map(entries)) => Ok(Value::Map(entries)),
        (ValueType::Node, Value::Node(node)) => Ok(Value::Node(node)),
        (ValueType::NodeSet, Value::NodeSet(nodes)) => Ok(Value::NodeSet(nodes)),
        (ValueType::NodeSet, Value::Node(node)) => Ok(Value::NodeSet(vec![node])),
        (target, value) => Err(ScriptError::InvalidCast {
            value: value.to_string(),
            target,
        }),
    }
}

fn numeric_cast(value: Value, target: ValueType) -> ScriptResult<Value> {
    let invalid = || ScriptError::InvalidCast {
        value: value.to_string(),
        target,
    };
    if let Value::String(text) = &value {
        return parse_scalar(text, target).map_err(|_| invalid());
    }
    match target {
        ValueType::Integer => match value.as_i64() {
            Some(integral) => i32::try_from(integral)
                .map(Value::Integer)
                .map_err(|_| invalid()),
            None => value
                .as_f64()
                .map(|f| Value::Integer(f as i32))
                .ok_or_else(invalid),
        },
        ValueType::Long => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .map(Value::Long)
            .ok_or_else(invalid),
        ValueType::Float => value
            .as_f64()
            .map(|f| Value::Float(f as f32))
            .ok_or_else(invalid),
        _ => value.as_f64().map(Value::Double).ok_or_else(invalid),
    }
}

fn builtin(function: &str, arguments: Vec<Value>) -> ScriptResult<Value> {
    let arity = |expected: usize| {
        if arguments.len() != expected {
            return Err(ScriptError::Arity {
                function: function.to_string(),
                expected,
                actual: arguments.len(),
            });
        }
        Ok(())
    };

    match function {
        "len" => {
            arity(1)?;
            let length = match &arguments[0] {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(entries) => entries.len(),
                Value::NodeSet(nodes) => nodes.len(),
                other => {
                    return Err(ScriptError::Type(format!(
                        "len requires a String, List or Map but got {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Integer(length as i32))
        }
        "upper" | "lower" => {
            arity(1)?;
            match &arguments[0] {
                Value::String(s) if function == "upper" => Ok(Value::String(s.to_uppercase())),
                Value::String(s) => Ok(Value::String(s.to_lowercase())),
                other => Err(ScriptError::Type(format!(
                    "{} requires a String but got {}",
                    function,
                    other.type_name()
                ))),
            }
        }
        "str" => {
            arity(1)?;
            Ok(Value::String(arguments[0].to_string()))
        }
        "isNull" => {
            arity(1)?;
            Ok(Value::Boolean(arguments[0].is_null()))
        }
        "contains" => {
            arity(2)?;
            let needle = &arguments[1];
            match &arguments[0] {
                Value::String(s) => Ok(Value::Boolean(s.contains(&needle.to_string()))),
                Value::List(items) => Ok(Value::Boolean(
                    items.iter().any(|item| item.loose_eq(needle)),
                )),
                Value::Map(entries) => Ok(Value::Boolean(
                    entries.contains_key(&needle.to_string()),
                )),
                other => Err(ScriptError::Type(format!(
                    "contains requires a String, List or Map but got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(ScriptError::UnknownFunction(function.to_string())),
    }
}
