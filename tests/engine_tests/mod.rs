mod evaluation_test;
mod script_test;

use flowcore::config::EngineConfig;

pub fn checked_config() -> EngineConfig {
    EngineConfig {
        check_return_types: true,
        ..EngineConfig::default()
    }
}
