use std::collections::HashMap;

use flowcore::{
    config::{EngineConfig, OperationConfig},
    eval::{DependencyContext, Expression},
    operation::{memory::PersistedWrite, LeftOperand, Operation},
    OperationError, Value, ValueType,
};
use pretty_assertions::assert_eq;

use crate::{container, setup_engine, ORDER_DOCUMENT};

fn sequential_config() -> EngineConfig {
    EngineConfig {
        operation: OperationConfig {
            force_sequential: true,
        },
        ..EngineConfig::default()
    }
}

fn address(city: &str) -> Value {
    Value::Map(HashMap::from([("city".to_string(), Value::from(city))]))
}

#[tokio::test]
async fn test_assignments_reach_data_store() {
    let fixture = setup_engine(EngineConfig::default());
    let operations = vec![
        Operation::assign(
            LeftOperand::data("total"),
            Expression::constant("10", ValueType::Integer),
        ),
        Operation::assign(
            LeftOperand::data("label"),
            Expression::script(
                "label",
                "'total=' + total",
                ValueType::String,
                vec![Expression::variable("total", ValueType::Integer)],
            ),
        ),
    ];
    let mut context = DependencyContext::new();

    fixture
        .engine
        .execute_operations(&operations, &container(), &mut context)
        .await
        .unwrap();

    assert_eq!(fixture.data.get(&container(), "total"), Some(Value::Integer(10)));
    assert_eq!(
        fixture.data.get(&container(), "label"),
        Some(Value::from("total=10"))
    );
}

#[tokio::test]
async fn test_method_call_updates_current_value() {
    let fixture = setup_engine(EngineConfig::default());
    fixture
        .data
        .set(&container(), "tags", Value::List(vec![Value::from("a")]));
    let operations = vec![Operation::method(
        LeftOperand::data("tags"),
        "add",
        Expression::constant("b", ValueType::String),
    )];

    fixture
        .engine
        .execute_operations(&operations, &container(), &mut DependencyContext::new())
        .await
        .unwrap();

    assert_eq!(
        fixture.data.get(&container(), "tags"),
        Some(Value::List(vec![Value::from("a"), Value::from("b")]))
    );
}

#[tokio::test]
async fn test_xpath_update_rewrites_document() {
    let fixture = setup_engine(EngineConfig::default());
    fixture
        .data
        .set(&container(), "order", Value::from(ORDER_DOCUMENT.as_str()));
    let operations = vec![Operation::xpath_update(
        LeftOperand::data("order"),
        "/order/customer",
        Expression::constant("Globex", ValueType::String),
    )];
    let mut context = DependencyContext::new();

    fixture
        .engine
        .execute_operations(&operations, &container(), &mut context)
        .await
        .unwrap();

    let customer = Expression::xpath(
        "customer",
        "/order/customer",
        ValueType::String,
        Expression::variable("order", ValueType::String),
    );
    assert_eq!(
        fixture.engine.evaluate(&customer, &mut context).unwrap(),
        Value::from("Globex")
    );
}

#[tokio::test]
async fn test_overwritten_business_data_is_not_flushed() {
    let fixture = setup_engine(sequential_config());
    let operations = vec![
        Operation::assign(
            LeftOperand::business_data("address"),
            Expression::variable("first", ValueType::Map),
        ),
        Operation::assign(
            LeftOperand::business_data("address"),
            Expression::variable("second", ValueType::Map),
        ),
    ];
    let mut context = DependencyContext::new()
        .with_variable("first", address("Lyon"))
        .with_variable("second", address("Nantes"));

    fixture
        .engine
        .execute_operations(&operations, &container(), &mut context)
        .await
        .unwrap();

    assert_eq!(
        fixture.business_handler.persisted().await,
        vec![PersistedWrite::Updated {
            name: "address".to_string(),
            value: address("Nantes"),
        }]
    );
    assert_eq!(
        fixture.business.get(&container(), "address"),
        Some(address("Nantes"))
    );
}

#[tokio::test]
async fn test_business_data_read_forces_flush() {
    let fixture = setup_engine(sequential_config());
    let operations = vec![
        Operation::assign(
            LeftOperand::business_data("address"),
            Expression::variable("first", ValueType::Map),
        ),
        Operation::assign(
            LeftOperand::data("city"),
            Expression::script(
                "city",
                "address.city",
                ValueType::String,
                vec![Expression::business_data("address")],
            ),
        ),
        Operation::assign(
            LeftOperand::business_data("address"),
            Expression::variable("second", ValueType::Map),
        ),
    ];
    let mut context = DependencyContext::new()
        .with_variable("first", address("Lyon"))
        .with_variable("second", address("Nantes"));

    fixture
        .engine
        .execute_operations(&operations, &container(), &mut context)
        .await
        .unwrap();

    assert_eq!(fixture.business_handler.persisted().await.len(), 2);
    assert_eq!(fixture.data.get(&container(), "city"), Some(Value::from("Lyon")));
}

#[tokio::test]
async fn test_transient_deletion_is_rejected() {
    let fixture = setup_engine(EngineConfig::default());
    fixture
        .transient
        .set(&container(), "draft", Value::from("x"));
    let operations = vec![Operation::delete(LeftOperand::transient("draft"))];

    let error = fixture
        .engine
        .execute_operations(&operations, &container(), &mut DependencyContext::new())
        .await
        .unwrap_err();

    assert!(matches!(error, OperationError::DeletionNotSupported { .. }));
}
