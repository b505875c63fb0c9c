//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{ControllerBlueprint, Lane};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    intersection: String,
    scheduler: SchedulerInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SchedulerInfo {
    green_time_s: f64,
    yellow_time_s: f64,
    post_priority_buffer_s: f64,
    cycle_s: f64,
    priority_order: Vec<&'static str>,
    tick_interval_ms: u64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &ControllerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let scheduler = &blueprint.scheduler;

    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            queue_capacity: s.queue_capacity,
            params: if args.sinks {
                s.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        intersection: blueprint.intersection.name.clone(),
        scheduler: SchedulerInfo {
            green_time_s: scheduler.green_time_s,
            yellow_time_s: scheduler.yellow_time_s,
            post_priority_buffer_s: scheduler.post_priority_buffer_s,
            cycle_s: scheduler.cycle_length().as_secs_f64(),
            priority_order: scheduler.priority_order.iter().map(|l| l.code()).collect(),
            tick_interval_ms: scheduler.tick_interval_ms,
        },
        sinks,
    }
}

fn print_config_info(blueprint: &ControllerBlueprint, args: &InfoArgs) {
    let scheduler = &blueprint.scheduler;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Signal Controller Configuration              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Intersection");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Name: {}", blueprint.intersection.name);

    println!("\n🚦 Scheduler");
    println!("   ├─ Green: {}s", scheduler.green_time_s);
    println!("   ├─ Yellow: {}s", scheduler.yellow_time_s);
    println!(
        "   ├─ Cycle: {:.1}s ({} lanes)",
        scheduler.cycle_length().as_secs_f64(),
        Lane::COUNT
    );
    println!("   ├─ Post-priority buffer: {}s", scheduler.post_priority_buffer_s);
    let order: Vec<_> = scheduler.priority_order.iter().map(|l| l.code()).collect();
    println!("   ├─ Priority order: {}", order.join(" > "));
    println!("   └─ Tick interval: {}ms", scheduler.tick_interval_ms);

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
            if args.sinks {
                let mut params: Vec<_> = sink.params.iter().collect();
                params.sort();
                for (key, value) in params {
                    println!("   {}  {} = {}", child_prefix, key, value);
                }
            }
        }
    }

    println!();
}
