use flowcore::{
    eval::{DependencyContext, EvaluationPhase, Expression, ExpressionKind},
    ExpressionError, Value, ValueType, XmlNode,
};
use proptest::prelude::*;

use super::checked_config;
use crate::{container, setup_engine, ORDER_DOCUMENT};

fn order_context() -> DependencyContext {
    DependencyContext::new()
        .with_container(container())
        .with_variable("order", ORDER_DOCUMENT.as_str())
}

fn order_document() -> Expression {
    Expression::variable("order", ValueType::String)
}

#[test]
fn test_xpath_reads_number_as_declared_type() {
    let fixture = setup_engine(checked_config());
    let mut context = order_context();

    let total = Expression::xpath("total", "/order/total", ValueType::Long, order_document());
    let value = fixture.engine.evaluate(&total, &mut context).unwrap();

    assert_eq!(value, Value::Long(42));
}

#[test]
fn test_xpath_node_set() {
    let fixture = setup_engine(checked_config());
    let mut context = order_context();

    let items = Expression::xpath(
        "items",
        "/order/items/item",
        ValueType::NodeSet,
        order_document(),
    );
    let value = fixture.engine.evaluate(&items, &mut context).unwrap();

    assert_eq!(
        value,
        Value::NodeSet(vec![XmlNode::new("item", "pen"), XmlNode::new("item", "ink")])
    );
}

#[test]
fn test_xpath_batch_shares_the_document() {
    let fixture = setup_engine(checked_config());
    let mut context = order_context();

    let expressions = vec![
        Expression::xpath("customer", "/order/customer", ValueType::String, order_document()),
        Expression::xpath("id", "/order/@id", ValueType::Integer, order_document()),
    ];
    let values = fixture
        .engine
        .evaluate_batch(ExpressionKind::XPathRead, &expressions, &mut context)
        .unwrap();

    assert_eq!(values, vec![Value::from("ACME"), Value::Integer(7)]);
}

#[test]
fn test_batch_repeats_shared_expressions_in_input_order() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new().with_variable("amount", 12);
    let amount = Expression::variable("amount", ValueType::Integer);
    let limit = Expression::variable("amount", ValueType::Long);

    let values = fixture
        .engine
        .evaluate_batch(
            ExpressionKind::Variable,
            &[amount.clone(), limit, amount],
            &mut context,
        )
        .unwrap();

    assert_eq!(values, vec![Value::Integer(12); 3]);
}

#[test]
fn test_batch_rejects_mixed_kinds() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new().with_variable("amount", 12);

    let error = fixture
        .engine
        .evaluate_batch(
            ExpressionKind::Variable,
            &[
                Expression::variable("amount", ValueType::Integer),
                Expression::constant("1", ValueType::Integer),
            ],
            &mut context,
        )
        .unwrap_err();

    assert!(matches!(error, ExpressionError::InvalidExpression { .. }));
}

#[test]
fn test_archived_container_evaluates_like_active() {
    let fixture = setup_engine(checked_config());
    let mut context = order_context();
    let customer = Expression::xpath("customer", "/order/customer", ValueType::String, order_document());

    let value = fixture
        .engine
        .evaluate_in_phase(&customer, &mut context, EvaluationPhase::Archived)
        .unwrap();

    assert_eq!(value, Value::from("ACME"));
}

#[test]
fn test_list_keeps_dependency_order() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new().with_variable("name", "ada");

    let list = Expression::list(
        "values",
        vec![
            Expression::constant("3", ValueType::Integer),
            Expression::variable("name", ValueType::String),
            Expression::constant("true", ValueType::Boolean),
        ],
    );
    let value = fixture.engine.evaluate(&list, &mut context).unwrap();

    assert_eq!(
        value,
        Value::List(vec![Value::Integer(3), Value::from("ada"), Value::Boolean(true)])
    );
}

#[test]
fn test_missing_variable_is_reported() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new();

    let condition = Expression::condition(
        ">",
        vec![
            Expression::variable("amount", ValueType::Integer),
            Expression::constant("10", ValueType::Integer),
        ],
    );
    let error = fixture.engine.evaluate(&condition, &mut context).unwrap_err();

    assert!(matches!(
        error,
        ExpressionError::MissingDependency { ref dependency, .. } if dependency == "amount"
    ));
}

#[test]
fn test_return_type_mismatch_names_the_container() {
    let fixture = setup_engine(checked_config());
    let mut context = DependencyContext::new()
        .with_container(container())
        .with_variable("amount", "twelve");

    let amount = Expression::variable("amount", ValueType::Integer);
    let error = fixture.engine.evaluate(&amount, &mut context).unwrap_err();

    match error {
        ExpressionError::ReturnTypeMismatch {
            declared,
            container: reported,
            ..
        } => {
            assert_eq!(declared, ValueType::Integer);
            assert_eq!(reported, Some(container()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_return_type_check_can_be_disabled() {
    let fixture = setup_engine(Default::default());
    let mut context = DependencyContext::new().with_variable("amount", "twelve");

    let amount = Expression::variable("amount", ValueType::Integer);
    let value = fixture.engine.evaluate(&amount, &mut context).unwrap();

    assert_eq!(value, Value::from("twelve"));
}

proptest! {
    #[test]
    fn test_condition_follows_integer_ordering(left in any::<i32>(), right in any::<i32>()) {
        let fixture = setup_engine(checked_config());
        let mut context = DependencyContext::new();
        let operands = || vec![
            Expression::constant(left.to_string(), ValueType::Integer),
            Expression::constant(right.to_string(), ValueType::Integer),
        ];

        let less = Expression::condition("<", operands());
        let equal = Expression::condition("==", operands());
        let not_equal = Expression::condition("!=", operands());

        prop_assert_eq!(fixture.engine.evaluate(&less, &mut context).unwrap(), Value::Boolean(left < right));
        prop_assert_eq!(fixture.engine.evaluate(&equal, &mut context).unwrap(), Value::Boolean(left == right));
        prop_assert_eq!(fixture.engine.evaluate(&not_equal, &mut context).unwrap(), Value::Boolean(left != right));
    }

    #[test]
    fn test_not_negates_boolean(flag in any::<bool>()) {
        let fixture = setup_engine(checked_config());
        let mut context = DependencyContext::new().with_variable("flag", flag);

        let not = Expression::condition("!", vec![Expression::variable("flag", ValueType::Boolean)]);

        prop_assert_eq!(fixture.engine.evaluate(&not, &mut context).unwrap(), Value::Boolean(!flag));
    }
}
