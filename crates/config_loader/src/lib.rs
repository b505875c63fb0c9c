//! # Config Loader
//!
//! Loads a [`ControllerBlueprint`] from TOML or JSON and validates it.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("controller.toml")).unwrap();
//! println!("green: {}s", blueprint.scheduler.green_time_s);
//! ```

mod parser;
mod validator;

pub use contracts::ControllerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::{debug, instrument};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a blueprint from a file, picking the format from its extension.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    #[instrument(name = "config_load", fields(path = %path.display()))]
    pub fn load_from_path(path: &Path) -> Result<ControllerBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let blueprint = Self::load_from_str(&content, format)?;
        debug!(
            intersection = %blueprint.intersection.name,
            sinks = blueprint.sinks.len(),
            "blueprint loaded"
        );
        Ok(blueprint)
    }

    /// Parse and validate a blueprint held in memory.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ControllerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize a blueprint to TOML
    pub fn to_toml(blueprint: &ControllerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a blueprint to JSON
    pub fn to_json(blueprint: &ControllerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Lane, SinkType};
    use std::io::Write;

    const CONTROLLER_TOML: &str = r#"
[intersection]
name = "main-and-5th"

[scheduler]
green_time_s = 6.0
yellow_time_s = 1.0
post_priority_buffer_s = 2.0
priority_order = ["N", "E", "S", "W"]
tick_interval_ms = 50

[[sinks]]
name = "log"
sink_type = "log"

[[sinks]]
name = "telemetry"
sink_type = "file"
queue_capacity = 256
[sinks.params]
path = "./output/decisions.jsonl"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(CONTROLLER_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.intersection.name, "main-and-5th");
        assert_eq!(bp.scheduler.post_priority_buffer_s, 2.0);
        assert_eq!(bp.sinks.len(), 2);
        assert_eq!(bp.sinks[1].sink_type, SinkType::File);
        assert_eq!(bp.sinks[1].queue_capacity, 256);
        assert_eq!(bp.sinks[1].params["path"], "./output/decisions.jsonl");
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(CONTROLLER_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.scheduler, bp2.scheduler);
        assert_eq!(bp.sinks.len(), bp2.sinks.len());
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(CONTROLLER_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp2.scheduler.priority_order, Lane::ALL.to_vec());
        assert_eq!(bp2.intersection.name, "main-and-5th");
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[scheduler]
priority_order = ["N", "E", "S"]
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("missing 'W'"), "got: {err}");
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONTROLLER_TOML.as_bytes()).unwrap();

        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.sinks[0].name, "log");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"), "got: {err}");
    }
}
