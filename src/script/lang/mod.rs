pub mod ast;
pub mod interpreter;
pub mod parser;

use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ScriptError, ScriptResult};
use super::library::ScriptLibrary;
use super::partition::PartitionKey;
use super::{source_hash, CompiledScript, ScriptInterpreter, ScriptShell};
use crate::value::Value;
use interpreter::Interpreter;
use parser::parse_program;

/// The interpreter shipped with the crate, running the small expression
/// language parsed by [`parser`].
#[derive(Debug, Default)]
pub struct BuiltinInterpreter;

impl BuiltinInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptInterpreter for BuiltinInterpreter {
    fn compile(&self, source: &str) -> ScriptResult<CompiledScript> {
        let (_, program) =
            parse_program(source.trim()).map_err(|e| ScriptError::Parse(e.to_string()))?;
        Ok(CompiledScript {
            source_hash: source_hash(source),
            program: Arc::new(program),
        })
    }

    fn new_context(
        &self,
        partition: Option<PartitionKey>,
        library: Arc<ScriptLibrary>,
    ) -> ScriptShell {
        ScriptShell { partition, library }
    }

    fn run(
        &self,
        script: &CompiledScript,
        shell: &ScriptShell,
        bindings: &HashMap<String, Value>,
    ) -> ScriptResult<Value> {
        Interpreter::new(&shell.library, bindings).run(&script.program)
    }
}
