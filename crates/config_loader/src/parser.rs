//! Blueprint parsing
//!
//! TOML is the primary format; JSON is accepted for generated configs.

use contracts::{ContractError, ControllerBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<ControllerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<ControllerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<ControllerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Lane, SinkType};

    #[test]
    fn test_parse_toml_lane_aliases() {
        let content = r#"
[intersection]
name = "main-and-5th"

[scheduler]
green_time_s = 8.0
priority_order = ["S", "north", "E", "w"]
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.intersection.name, "main-and-5th");
        assert_eq!(bp.scheduler.green_time_s, 8.0);
        assert_eq!(bp.scheduler.yellow_time_s, 1.0);
        assert_eq!(
            bp.scheduler.priority_order,
            vec![Lane::South, Lane::North, Lane::East, Lane::West]
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "scheduler": { "post_priority_buffer_s": 3.0 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.scheduler.post_priority_buffer_s, 3.0);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_unknown_lane_is_parse_error() {
        let content = r#"
[scheduler]
priority_order = ["N", "E", "S", "X"]
"#;
        let err = parse_toml(content).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
