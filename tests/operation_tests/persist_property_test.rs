use std::sync::Arc;

use flowcore::{
    eval::{Expression, ExpressionKind},
    operation::{
        handler::LeftOperandHandlerRegistry,
        memory::{BusinessDataHandler, DataHandler, InMemoryStore, TransientDataHandler},
        reduce_outcomes, should_persist, use_batch_mode, LeftOperand, LeftOperandType, Operation,
        OperatorType,
    },
    ValueType,
};
use proptest::prelude::*;

const NAMES: [&str; 3] = ["a", "b", "c"];

fn operand_strategy() -> impl Strategy<Value = LeftOperand> {
    (0..NAMES.len(), 0..3usize).prop_map(|(name, kind)| match kind {
        0 => LeftOperand::data(NAMES[name]),
        1 => LeftOperand::transient(NAMES[name]),
        _ => LeftOperand::business_data(NAMES[name]),
    })
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    (operand_strategy(), any::<bool>(), proptest::option::of(0..NAMES.len())).prop_map(
        |(operand, delete, read)| {
            if delete {
                return Operation::delete(operand);
            }
            let right = match read {
                Some(name) => Expression::business_data(NAMES[name]),
                None => Expression::constant("1", ValueType::Integer),
            };
            Operation::assign(operand, right)
        },
    )
}

fn transient_only_handlers() -> LeftOperandHandlerRegistry {
    let mut handlers = LeftOperandHandlerRegistry::new();
    handlers
        .register(Arc::new(TransientDataHandler::new(Arc::new(InMemoryStore::new()))))
        .unwrap();
    handlers
}

/// Handlers for every operand type; only data handlers accept batches.
fn all_handlers() -> LeftOperandHandlerRegistry {
    let mut handlers = transient_only_handlers();
    handlers
        .register(Arc::new(DataHandler::new(Arc::new(InMemoryStore::new()))))
        .unwrap();
    handlers
        .register(Arc::new(BusinessDataHandler::new(Arc::new(InMemoryStore::new()))))
        .unwrap();
    handlers
}

fn distinct_operands(operations: &[Operation]) -> Vec<LeftOperand> {
    let mut operands: Vec<LeftOperand> = Vec::new();
    for operation in operations {
        if !operands.contains(&operation.left_operand) {
            operands.push(operation.left_operand.clone());
        }
    }
    operands
}

proptest! {
    #[test]
    fn test_batch_mode_follows_operands_and_handlers(operations in prop::collection::vec(operation_strategy(), 1..8)) {
        let operands = distinct_operands(&operations);

        let with_batch_handler = operands.len() == 1
            || operands
                .iter()
                .any(|operand| operand.operand_type == LeftOperandType::Data);
        prop_assert_eq!(use_batch_mode(&operations, &all_handlers()), with_batch_handler);

        // no batch-capable handler registered at all
        prop_assert_eq!(
            use_batch_mode(&operations, &transient_only_handlers()),
            operands.len() == 1
        );
    }

    #[test]
    fn test_only_business_data_is_flushed(operations in prop::collection::vec(operation_strategy(), 1..8)) {
        for (index, operation) in operations.iter().enumerate() {
            if !operation.left_operand.is_business_data() {
                prop_assert!(!should_persist(index, &operations));
            }
        }
    }

    #[test]
    fn test_last_business_data_write_is_flushed(operations in prop::collection::vec(operation_strategy(), 1..8)) {
        for (index, operation) in operations.iter().enumerate() {
            let operand = &operation.left_operand;
            let is_last = operations[index + 1..]
                .iter()
                .all(|later| later.left_operand != *operand);
            if operand.is_business_data() && is_last {
                prop_assert!(should_persist(index, &operations));
            }
        }
    }

    #[test]
    fn test_deletion_sticks(operations in prop::collection::vec(operation_strategy(), 1..8)) {
        let outcomes = reduce_outcomes(&operations);
        for (operand, update) in &outcomes {
            let deleted = operations.iter().any(|operation| {
                operation.left_operand == *operand
                    && operation.operator_type == OperatorType::Deletion
            });
            prop_assert_eq!(*update, !deleted);
        }
        let distinct = operations
            .iter()
            .enumerate()
            .filter(|(index, operation)| {
                operations[..*index]
                    .iter()
                    .all(|earlier| earlier.left_operand != operation.left_operand)
            })
            .count();
        prop_assert_eq!(outcomes.len(), distinct);
    }

    #[test]
    fn test_single_operand_always_batches(operand in operand_strategy(), count in 1..6usize) {
        let operations: Vec<Operation> = (0..count)
            .map(|_| Operation::assign(operand.clone(), Expression::constant("1", ValueType::Integer)))
            .collect();

        prop_assert!(use_batch_mode(&operations, &transient_only_handlers()));
    }
}

#[test]
fn test_batch_needs_a_batch_handler_for_several_operands() {
    let operations = vec![
        Operation::assign(
            LeftOperand::transient("a"),
            Expression::constant("1", ValueType::Integer),
        ),
        Operation::assign(
            LeftOperand::transient("b"),
            Expression::constant("2", ValueType::Integer),
        ),
    ];
    let mut handlers = transient_only_handlers();
    assert!(!use_batch_mode(&operations, &handlers));

    handlers
        .register(Arc::new(DataHandler::new(Arc::new(InMemoryStore::new()))))
        .unwrap();
    let mut with_data = operations.clone();
    with_data.push(Operation::assign(
        LeftOperand::data("c"),
        Expression::constant("3", ValueType::Integer),
    ));
    assert!(use_batch_mode(&with_data, &handlers));
}

#[test]
fn test_business_data_reads_are_detected() {
    let read = Expression::business_data("address");
    let script = Expression::script("city", "address.city", ValueType::String, vec![read]);

    assert_eq!(script.dependencies()[0].kind(), ExpressionKind::BusinessData);
    assert!(script.reads_business_data("address"));
    assert!(!script.reads_business_data("invoice"));
}
