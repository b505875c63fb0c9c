//! Replay source - plays back a recorded detection timeline
//!
//! Recordings are JSON Lines, one timed event per line:
//!
//! ```text
//! {"t": 10.0, "lane": "S", "detected": true, "confidence": 0.91}
//! {"t": 3.0, "siren": true}
//! ```
//!
//! `t` is seconds since the start of playback. A source only plays the events
//! of its own [`SensorKind`], so one recording can feed both a vision and an
//! audio source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{DetectionCallback, DetectionReport, DetectionSource, Lane, SensorKind};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// Longest single sleep, so `stop` never waits on a far-off event
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = real time)
    pub speed_multiplier: f64,

    /// Restart from the beginning after the last event
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// One line of a recording
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventRecord {
    t: f64,
    #[serde(default)]
    lane: Option<String>,
    #[serde(default)]
    detected: Option<bool>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    siren: Option<bool>,
}

/// A report scheduled at an offset from the start of playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedReport {
    pub at: Duration,
    pub report: DetectionReport,
}

impl TimedReport {
    pub fn new(at_secs: f64, report: DetectionReport) -> Self {
        Self {
            at: Duration::from_secs_f64(at_secs.max(0.0)),
            report,
        }
    }
}

/// Detection source replaying a recorded timeline on a background thread
#[derive(Debug)]
pub struct ReplaySource {
    source_id: String,
    kind: SensorKind,
    events: Arc<[TimedReport]>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplaySource {
    /// Load the `kind` events of a recording.
    ///
    /// # Errors
    /// Fails if the file cannot be read or any line is malformed, including
    /// lines naming an unknown lane.
    pub fn load(
        path: impl AsRef<Path>,
        source_id: impl Into<String>,
        kind: SensorKind,
        config: ReplayConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let source_id = source_id.into();
        let io_err = |source| IngestionError::Io {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let mut events = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let event = parse_event(&source_id, idx + 1, line)?;
            if event.report.sensor_kind() == kind {
                events.push(event);
            }
        }

        info!(
            source_id = %source_id,
            path = %path.display(),
            kind = kind.as_str(),
            events = events.len(),
            "loaded detection recording"
        );

        Ok(Self::from_events(source_id, kind, events, config))
    }

    /// Build a source from in-memory events. Events of another kind are dropped.
    pub fn from_events(
        source_id: impl Into<String>,
        kind: SensorKind,
        events: impl IntoIterator<Item = TimedReport>,
        config: ReplayConfig,
    ) -> Self {
        let mut events: Vec<_> = events
            .into_iter()
            .filter(|event| event.report.sensor_kind() == kind)
            .collect();
        events.sort_by_key(|event| event.at);

        Self {
            source_id: source_id.into(),
            kind,
            events: events.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    /// Events in playback order.
    pub fn events(&self) -> &[TimedReport] {
        &self.events
    }

    /// Offset of the last event (one playback pass at speed 1.0).
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.at).unwrap_or_default()
    }
}

fn parse_event(source_id: &str, line_no: usize, line: &str) -> Result<TimedReport> {
    let record: EventRecord = serde_json::from_str(line)
        .map_err(|e| IngestionError::parse_failed(source_id, line_no, e.to_string()))?;

    if !record.t.is_finite() || record.t < 0.0 {
        return Err(IngestionError::parse_failed(
            source_id,
            line_no,
            format!("event time must be a non-negative number, got {}", record.t),
        ));
    }

    let report = match (record.lane, record.siren) {
        (Some(value), None) => {
            let lane = value
                .parse::<Lane>()
                .map_err(|_| IngestionError::InvalidLane {
                    source_id: source_id.to_string(),
                    line: line_no,
                    value: value.clone(),
                })?;
            let detected = record.detected.ok_or_else(|| {
                IngestionError::parse_failed(source_id, line_no, "lane event without 'detected'")
            })?;
            DetectionReport::Lane {
                lane,
                detected,
                confidence: record.confidence,
            }
        }
        (None, Some(detected)) => DetectionReport::siren(detected),
        _ => {
            return Err(IngestionError::parse_failed(
                source_id,
                line_no,
                "event must carry exactly one of 'lane' or 'siren'",
            ))
        }
    };

    Ok(TimedReport::new(record.t, report))
}

/// Sleep until `deadline`, waking periodically to honour `listening`.
/// Returns false if playback was stopped meanwhile.
fn sleep_until(deadline: Instant, listening: &AtomicBool) -> bool {
    loop {
        if !listening.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

impl DetectionSource for ReplaySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: DetectionCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let source_id = self.source_id.clone();
        let events = self.events.clone();
        let speed = self.config.speed_multiplier.max(0.1);
        let loop_playback = self.config.loop_playback && !self.duration().is_zero();
        if self.config.loop_playback && !loop_playback {
            warn!(source_id = %source_id, "recording has no duration, playing once");
        }

        let handle = thread::spawn(move || {
            debug!(source_id = %source_id, "replay thread started");

            'playback: loop {
                if events.is_empty() {
                    warn!(source_id = %source_id, "no events to replay");
                    break;
                }

                let start_time = Instant::now();
                for event in events.iter() {
                    let deadline = start_time + event.at.div_f64(speed);
                    if !sleep_until(deadline, &listening) {
                        debug!(source_id = %source_id, "replay stopped");
                        break 'playback;
                    }
                    callback(event.report);
                }

                if !loop_playback {
                    info!(source_id = %source_id, "replay completed");
                    break;
                }

                debug!(source_id = %source_id, "looping replay");
            }

            listening.store(false, Ordering::SeqCst);
        });

        if let Ok(mut slot) = self.thread_handle.lock() {
            *slot = Some(handle);
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        let handle = self.thread_handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(source_id = %self.source_id, "replay thread panicked");
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn collector() -> (DetectionCallback, Arc<StdMutex<Vec<DetectionReport>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: DetectionCallback = Arc::new(move |report| {
            sink.lock().unwrap().push(report);
        });
        (callback, seen)
    }

    #[test]
    fn test_load_filters_by_kind_and_sorts() {
        let file = recording(&[
            r#"{"t": 2.0, "lane": "S", "detected": false}"#,
            r#"{"t": 0.5, "siren": true}"#,
            "",
            "# comment",
            r#"{"t": 1.0, "lane": "south", "detected": true, "confidence": 0.8}"#,
        ]);

        let vision =
            ReplaySource::load(file.path(), "cam", SensorKind::Vision, ReplayConfig::default())
                .unwrap();
        assert_eq!(vision.events().len(), 2);
        assert_eq!(vision.events()[0].at, Duration::from_secs(1));
        assert_eq!(
            vision.events()[0].report,
            DetectionReport::Lane {
                lane: Lane::South,
                detected: true,
                confidence: Some(0.8)
            }
        );
        assert_eq!(vision.duration(), Duration::from_secs(2));

        let audio =
            ReplaySource::load(file.path(), "mic", SensorKind::Audio, ReplayConfig::default())
                .unwrap();
        assert_eq!(audio.events().len(), 1);
        assert_eq!(audio.events()[0].report, DetectionReport::siren(true));
    }

    #[test]
    fn test_unknown_lane_rejected_at_load() {
        let file = recording(&[
            r#"{"t": 0.0, "lane": "N", "detected": true}"#,
            r#"{"t": 1.0, "lane": "NE", "detected": true}"#,
        ]);

        let err = ReplaySource::load(file.path(), "cam", SensorKind::Vision, ReplayConfig::default())
            .unwrap_err();
        match err {
            IngestionError::InvalidLane { line, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(value, "NE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_events_rejected() {
        for line in [
            r#"{"t": 1.0}"#,
            r#"{"t": 1.0, "lane": "N", "siren": true, "detected": true}"#,
            r#"{"t": 1.0, "lane": "N"}"#,
            r#"{"t": -1.0, "siren": true}"#,
            r#"{"t": 1.0, "siren": true, "volume": 3}"#,
            "not json",
        ] {
            let file = recording(&[line]);
            let result =
                ReplaySource::load(file.path(), "cam", SensorKind::Audio, ReplayConfig::default());
            assert!(
                matches!(result, Err(IngestionError::ParseFailed { line: 1, .. })),
                "accepted: {line}"
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let result = ReplaySource::load(
            "/definitely/not/here.jsonl",
            "cam",
            SensorKind::Vision,
            ReplayConfig::default(),
        );
        assert!(matches!(result, Err(IngestionError::Io { .. })));
    }

    #[test]
    fn test_playback_delivers_in_order() {
        let source = ReplaySource::from_events(
            "cam",
            SensorKind::Vision,
            vec![
                TimedReport::new(0.02, DetectionReport::lane(Lane::East, false)),
                TimedReport::new(0.0, DetectionReport::lane(Lane::East, true)),
                TimedReport::new(0.01, DetectionReport::siren(true)),
            ],
            ReplayConfig {
                speed_multiplier: 2.0,
                loop_playback: false,
            },
        );
        assert_eq!(source.events().len(), 2);

        let (callback, seen) = collector();
        source.listen(callback);
        assert!(source.is_listening());

        let deadline = Instant::now() + Duration::from_secs(2);
        while source.is_listening() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!source.is_listening());

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                DetectionReport::lane(Lane::East, true),
                DetectionReport::lane(Lane::East, false),
            ]
        );
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let source = ReplaySource::from_events(
            "mic",
            SensorKind::Audio,
            vec![
                TimedReport::new(0.0, DetectionReport::siren(true)),
                TimedReport::new(3600.0, DetectionReport::siren(false)),
            ],
            ReplayConfig::default(),
        );

        let (callback, seen) = collector();
        source.listen(callback);
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        source.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!source.is_listening());
        assert_eq!(*seen.lock().unwrap(), vec![DetectionReport::siren(true)]);
    }

    #[test]
    fn test_loop_playback_repeats() {
        let source = ReplaySource::from_events(
            "mic",
            SensorKind::Audio,
            vec![
                TimedReport::new(0.0, DetectionReport::siren(true)),
                TimedReport::new(0.01, DetectionReport::siren(false)),
            ],
            ReplayConfig {
                speed_multiplier: 1.0,
                loop_playback: true,
            },
        );

        let (callback, seen) = collector();
        source.listen(callback);
        thread::sleep(Duration::from_millis(100));
        source.stop();

        assert!(seen.lock().unwrap().len() > 2);
    }
}
