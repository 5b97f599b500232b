use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Verify every non-null result against the declared return type.
    #[serde(default)]
    pub check_return_types: bool,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub operation: OperationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_true")]
    pub warn_missing_partition: bool,

    /// Variable name the raw result is bound to inside a coercion script.
    #[serde(default = "default_coercion_binding")]
    pub coercion_binding: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            warn_missing_partition: default_true(),
            coercion_binding: default_coercion_binding(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperationConfig {
    /// Always run operations one by one, even when batch mode is allowed.
    #[serde(default)]
    pub force_sequential: bool,
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_coercion_binding() -> String {
    "__result".to_string()
}
