//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(tick_ms) = args.tick_ms {
        info!(tick_ms, "Overriding tick interval from CLI");
        blueprint.scheduler.tick_interval_ms = tick_ms;
    }

    info!(
        intersection = %blueprint.intersection.name,
        green_s = blueprint.scheduler.green_time_s,
        yellow_s = blueprint.scheduler.yellow_time_s,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_ticks: (args.max_ticks > 0).then_some(args.max_ticks),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        replay_path: args.replay.clone(),
        replay_speed: args.speed,
        replay_loop: args.replay_loop,
        every_tick: args.every_tick,
    };

    info!("Starting controller...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Controller run failed")?;

    info!(
        ticks = stats.driver.ticks,
        preemptions = stats.driver.preemptions,
        duration_secs = stats.duration.as_secs_f64(),
        tick_rate = format!("{:.2}", stats.tick_rate()),
        "Controller stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}

fn print_config_summary(blueprint: &contracts::ControllerBlueprint) {
    let scheduler = &blueprint.scheduler;

    println!("\n=== Configuration Summary ===\n");
    println!("Intersection: {}", blueprint.intersection.name);
    println!("\nScheduler:");
    println!("  Green: {}s", scheduler.green_time_s);
    println!("  Yellow: {}s", scheduler.yellow_time_s);
    println!("  Post-priority buffer: {}s", scheduler.post_priority_buffer_s);
    println!(
        "  Cycle: {:.1}s",
        scheduler.cycle_length().as_secs_f64()
    );
    println!("  Tick interval: {}ms", scheduler.tick_interval_ms);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
