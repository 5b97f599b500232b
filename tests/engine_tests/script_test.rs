use flowcore::{
    eval::{DependencyContext, Expression},
    script::{library::ScriptLibrary, partition::PartitionKey},
    ExpressionError, Value, ValueType,
};

use super::checked_config;
use crate::setup_engine;

const PARTITION: PartitionKey = PartitionKey(3);

fn library(source: &str) -> ScriptLibrary {
    ScriptLibrary::parse(source).unwrap()
}

fn partition_context() -> DependencyContext {
    DependencyContext::new().with_partition(PARTITION)
}

#[test]
fn test_script_compiled_once_per_partition() {
    let fixture = setup_engine(checked_config());
    fixture
        .loader
        .define(PARTITION, library("def twice(x) = x * 2"));

    let script = Expression::script(
        "doubled",
        "twice(amount)",
        ValueType::Integer,
        vec![Expression::variable("amount", ValueType::Integer)],
    );
    for amount in [1, 5, 21] {
        let mut context = partition_context().with_variable("amount", amount);
        let value = fixture.engine.evaluate(&script, &mut context).unwrap();
        assert_eq!(value, Value::Integer(amount * 2));
    }

    let stats = fixture.engine.script_stats();
    assert_eq!(stats.compilations(), 1);
    assert_eq!(stats.hits(), 2);
}

#[test]
fn test_reload_drops_stale_library() {
    let fixture = setup_engine(checked_config());
    fixture.loader.define(PARTITION, library("def rate() = 2"));

    let script = Expression::script("fee", "rate() * 10", ValueType::Integer, vec![]);
    let mut context = partition_context();
    assert_eq!(
        fixture.engine.evaluate(&script, &mut context).unwrap(),
        Value::Integer(20)
    );

    fixture.loader.reload(PARTITION, library("def rate() = 3"));

    let mut context = partition_context();
    assert_eq!(
        fixture.engine.evaluate(&script, &mut context).unwrap(),
        Value::Integer(30)
    );
    assert_eq!(fixture.engine.script_stats().compilations(), 2);
}

#[test]
fn test_destroyed_partition_fails_evaluation() {
    let fixture = setup_engine(checked_config());
    fixture.loader.define(PARTITION, library("def rate() = 2"));
    fixture.loader.destroy(PARTITION);

    let script = Expression::script("fee", "rate()", ValueType::Integer, vec![]);
    let error = fixture
        .engine
        .evaluate(&script, &mut partition_context())
        .unwrap_err();

    assert!(matches!(error, ExpressionError::EvaluationFailure { .. }));
}

#[test]
fn test_result_coerced_to_declared_type() {
    let fixture = setup_engine(checked_config());
    let script = Expression::script("text", "'17'", ValueType::Long, vec![]);

    let value = fixture
        .engine
        .evaluate(&script, &mut DependencyContext::new())
        .unwrap();

    assert_eq!(value, Value::Long(17));
    assert_eq!(fixture.engine.script_stats().coercions(), 1);
}

#[test]
fn test_integer_result_accepted_as_long() {
    let fixture = setup_engine(checked_config());
    let script = Expression::script("sum", "1 + 2", ValueType::Long, vec![]);

    let value = fixture
        .engine
        .evaluate(&script, &mut DependencyContext::new())
        .unwrap();

    assert_eq!(value, Value::Integer(3));
    assert_eq!(fixture.engine.script_stats().coercions(), 0);
}

#[test]
fn test_script_condition_truthiness() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new().with_variable("name", "ada");
    let dependencies = || vec![Expression::variable("name", ValueType::String)];

    let equal = Expression::script_condition("is_ada", "name == 'ada'", dependencies());
    let present = Expression::script_condition("has_name", "name", dependencies());
    let absent = Expression::script_condition("nothing", "null", vec![]);

    assert_eq!(
        fixture.engine.evaluate(&equal, &mut context).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        fixture.engine.evaluate(&present, &mut context).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        fixture.engine.evaluate(&absent, &mut context).unwrap(),
        Value::Null
    );
}

#[test]
fn test_undefined_binding_is_missing_dependency() {
    let fixture = setup_engine(checked_config());
    let script = Expression::script("broken", "amount + 1", ValueType::Integer, vec![]);

    let error = fixture
        .engine
        .evaluate(&script, &mut DependencyContext::new())
        .unwrap_err();

    assert!(matches!(error, ExpressionError::MissingDependency { .. }));
}
