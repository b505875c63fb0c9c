//! FileSink - appends decisions to a JSON Lines telemetry file

use chrono::{SecondsFormat, Utc};
use contracts::{ContractError, DecisionSink, Lane, LaneLights, SignalDecision, Transition};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map (`path`, `append`)
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output/decisions.jsonl"));
        let append = params
            .get("append")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Self { path, append }
    }
}

/// One telemetry line
#[derive(Debug, Serialize)]
struct DecisionRecord<'a> {
    recorded_at: String,
    tick: u64,
    t: f64,
    lights: &'a LaneLights,
    mode: String,
    priority_lane: Option<&'static str>,
    phase_lane: &'static str,
    ambulance_detected: Vec<&'static str>,
    siren: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<&'a Transition>,
}

impl<'a> DecisionRecord<'a> {
    fn new(decision: &'a SignalDecision) -> Self {
        Self {
            recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            tick: decision.tick,
            t: decision.at_secs(),
            lights: &decision.lights,
            mode: decision.mode.to_string(),
            priority_lane: decision.priority_lane.map(Lane::code),
            phase_lane: decision.phase_lane.code(),
            ambulance_detected: Lane::ALL
                .into_iter()
                .filter(|lane| decision.detected[lane.index()])
                .map(Lane::code)
                .collect(),
            siren: decision.siren,
            transition: decision.transition.as_ref(),
        }
    }
}

/// Sink that writes one JSON object per decision
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: LineWriter<File>,
    written: u64,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: LineWriter::new(file),
            written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Output path
    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    fn append_record(&mut self, decision: &SignalDecision) -> std::io::Result<()> {
        let record = DecisionRecord::new(decision);
        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn persist(&mut self, decision: &SignalDecision) -> Result<(), ContractError> {
        self.append_record(decision).map_err(|e| {
            error!(sink = %self.name, tick = decision.tick, error = %e, "write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl DecisionSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, decision),
        fields(sink = %self.name, tick = decision.tick)
    )]
    async fn write(&mut self, decision: &SignalDecision) -> Result<(), ContractError> {
        self.persist(decision)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            sink = %self.name,
            path = %self.config.path.display(),
            decisions = self.written,
            "FileSink closed"
        );
        Ok(())
    }
}
