mod engine_operation_test;
mod persist_property_test;
