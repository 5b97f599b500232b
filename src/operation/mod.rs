//! Operations: writes of evaluated right-hand expressions into left
//! operands, with batch or one-by-one dispatch and business data flush
//! elision.

pub mod analyzer;
pub mod executor;
pub mod handler;
pub mod memory;
pub mod model;
pub mod persist;
pub mod service;

pub use analyzer::{calculate_indexes, find_dependency_index, OperationIndexes};
pub use executor::{OperationExecutorRegistry, OperationExecutorStrategy};
pub use handler::{LeftOperandHandler, LeftOperandHandlerRegistry};
pub use model::{LeftOperand, LeftOperandType, Operation, OperatorType};
pub use persist::should_persist;
pub use service::{reduce_outcomes, use_batch_mode, OperationService};
