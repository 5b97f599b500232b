use super::analyzer::{calculate_indexes, find_dependency_index};
use super::model::Operation;

/// Whether the business data write at `index` has to be flushed now.
///
/// Only the last write to an entity, or one read by a later expression
/// before the entity is written again, is persisted. Other operand types
/// are written by their handlers directly and always answer `false`.
pub fn should_persist(index: usize, operations: &[Operation]) -> bool {
    let operand = &operations[index].left_operand;
    if !operand.is_business_data() {
        return false;
    }
    let indexes = calculate_indexes(index, operations);
    if indexes.last_index == index {
        return true;
    }
    match (
        find_dependency_index(&operand.name, index + 1, operations),
        indexes.next_index,
    ) {
        (Some(read), Some(next)) => read < next,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
