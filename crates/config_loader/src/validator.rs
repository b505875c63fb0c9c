//! Blueprint validation
//!
//! Rules:
//! - scheduler timing and priority order (see `SchedulerConfig::validate`)
//! - sink names non-empty and unique
//! - sink queue capacity > 0

use std::collections::HashSet;

use contracts::{ContractError, ControllerBlueprint};

/// Validate a blueprint, returning the first error found.
pub fn validate(blueprint: &ControllerBlueprint) -> Result<(), ContractError> {
    validate_intersection(blueprint)?;
    blueprint.scheduler.validate()?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_intersection(blueprint: &ControllerBlueprint) -> Result<(), ContractError> {
    if blueprint.intersection.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "intersection.name",
            "intersection name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &ControllerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
