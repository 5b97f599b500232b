use super::model::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationIndexes {
    /// Greatest index writing the same left operand, possibly the operation
    /// itself.
    pub last_index: usize,
    /// Smallest later index writing the same left operand.
    pub next_index: Option<usize>,
}

pub fn calculate_indexes(index: usize, operations: &[Operation]) -> OperationIndexes {
    let target = &operations[index].left_operand;
    let mut last_index = index;
    let mut next_index = None;
    for (position, operation) in operations.iter().enumerate() {
        if operation.left_operand != *target {
            continue;
        }
        last_index = last_index.max(position);
        if position > index && next_index.is_none() {
            next_index = Some(position);
        }
    }
    OperationIndexes {
        last_index,
        next_index,
    }
}

/// First index at or after `from` whose right-hand expression reads the
/// business entity anywhere in its dependency tree.
pub fn find_dependency_index(entity: &str, from: usize, operations: &[Operation]) -> Option<usize> {
    operations
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, operation)| {
            operation
                .right_operand
                .as_ref()
                .is_some_and(|expression| expression.reads_business_data(entity))
        })
        .map(|(position, _)| position)
}
