//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! - Boundary contracts between the store and its writers
//! - Deterministic controller scenarios on a manual clock
//! - Replay -> store -> driver -> dispatcher end-to-end run

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, Lane, ManualClock};
    use detection_store::DetectionStore;
    use std::sync::Arc;

    #[test]
    fn test_invalid_lane_never_reaches_store() {
        let store = DetectionStore::new(Arc::new(ManualClock::new()));

        let err = store.set_lane_detected_by_id("northeast", true).unwrap_err();
        assert!(matches!(err, ContractError::InvalidLane { .. }));

        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.any_lane_detected());
        assert_eq!(snapshot.last_emergency, None);
        assert_eq!(store.stats().invalid_lanes, 1);

        store.set_lane_detected_by_id("West", true).unwrap();
        assert!(store.snapshot().unwrap().lane_detected(Lane::West));
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ControllerMode, Lane, LightState, ManualClock, SchedulerConfig, Transition};
    use detection_store::DetectionStore;
    use observability::DecisionStatsAggregator;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use scheduler::SignalScheduler;

    fn controller(config: SchedulerConfig) -> (SignalScheduler, Arc<DetectionStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = DetectionStore::shared(clock.clone());
        let scheduler = SignalScheduler::new(config, store.clone(), clock.clone()).unwrap();
        (scheduler, store, clock)
    }

    /// G=6, Y=1, buffer 0, loaded through the config loader.
    #[test]
    fn test_reference_scenario_from_config() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[scheduler]
green_time_s = 6.0
yellow_time_s = 1.0
post_priority_buffer_s = 0.0
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let (mut scheduler, store, clock) = controller(blueprint.scheduler);

        clock.set_secs(6.5);
        let decision = scheduler.update();
        assert_eq!(decision.lights.get(Lane::North), LightState::Yellow);
        assert_eq!(decision.mode, ControllerMode::Normal);

        clock.set_secs(7.1);
        let decision = scheduler.update();
        assert_eq!(decision.lights.get(Lane::East), LightState::Green);
        assert_eq!(decision.lights.get(Lane::North), LightState::Red);

        clock.set_secs(10.0);
        store.set_lane_detected(Lane::South, true);
        let decision = scheduler.update();
        assert_eq!(decision.mode, ControllerMode::Priority);
        assert_eq!(decision.priority_lane, Some(Lane::South));
        assert!(decision.lights.is_exclusive());
        assert_eq!(decision.lights.get(Lane::South), LightState::Green);

        clock.set_secs(12.0);
        store.set_lane_detected(Lane::South, false);
        let decision = scheduler.update();
        assert_eq!(decision.mode, ControllerMode::Normal);
        assert_eq!(
            decision.transition,
            Some(Transition::PreemptionCleared { resumed: Lane::East })
        );
        assert_eq!(decision.lights.get(Lane::East), LightState::Green);
    }

    #[test]
    fn test_round_robin_fairness_over_two_cycles() {
        let config = SchedulerConfig::default();
        let cycle_ms = config.cycle_length().as_millis() as u64;
        let (mut scheduler, _store, clock) = controller(config);

        let mut aggregator = DecisionStatsAggregator::new();
        aggregator.update(&scheduler.current());
        for ms in (50..=2 * cycle_ms).step_by(50) {
            clock.set(Duration::from_millis(ms));
            aggregator.update(&scheduler.update());
        }

        let summary = aggregator.summary();
        for lane in &summary.lanes {
            assert!((lane.green_secs - 12.0).abs() < 1e-6, "{:?}", lane);
            assert!((lane.yellow_secs - 2.0).abs() < 1e-6, "{:?}", lane);
            assert_eq!(lane.preemptions, 0);
        }
        assert_eq!(summary.priority_ticks, 0);
    }

    #[test]
    fn test_lights_stay_exclusive_under_noisy_detections() {
        let config = SchedulerConfig {
            post_priority_buffer_s: 0.5,
            ..Default::default()
        };
        let (mut scheduler, store, clock) = controller(config);

        let mut rng = StdRng::seed_from_u64(0x5EED_0F_11);

        let mut preempting: Option<Lane> = None;
        for step in 1..=2_000u64 {
            clock.set(Duration::from_millis(step * 50));
            if rng.random_bool(0.15) {
                let lane = Lane::ALL[rng.random_range(0..Lane::COUNT)];
                store.set_lane_detected(lane, rng.random_bool(0.5));
            }
            if rng.random_bool(0.1) {
                store.set_siren_detected(rng.random_bool(0.3));
            }

            let snapshot = store.snapshot().unwrap();
            let decision = scheduler.update();
            assert!(decision.lights.is_exclusive(), "tick {}", decision.tick);

            if decision.is_priority() {
                let lane = decision.priority_lane.unwrap();
                assert_eq!(decision.lights.active(), Some((lane, LightState::Green)));
                // a still-detected preempting lane is never displaced
                if let Some(held) = preempting {
                    if snapshot.lane_detected(held) {
                        assert_eq!(lane, held, "tick {}", decision.tick);
                    }
                }
                preempting = Some(lane);
            } else {
                preempting = None;
            }
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{MonotonicClock, SchedulerConfig, SensorKind, SinkConfig, SinkType};
    use detection_store::DetectionStore;
    use dispatcher::create_dispatcher;
    use ingestion::{ReplayConfig, ReplaySource, SourceRegistry};
    use scheduler::{ForwardPolicy, SignalScheduler, TickDriver};
    use tokio::sync::mpsc;

    /// End-to-end: ReplaySource -> DetectionStore -> TickDriver -> Dispatcher
    #[tokio::test]
    async fn test_e2e_replay_preemption() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("events.jsonl");
        let output = dir.path().join("decisions.jsonl");

        let mut file = std::fs::File::create(&recording).unwrap();
        writeln!(file, "# ambulance on the south approach").unwrap();
        writeln!(file, r#"{{"t": 0.05, "lane": "S", "detected": true, "confidence": 0.9}}"#).unwrap();
        writeln!(file, r#"{{"t": 0.05, "siren": true}}"#).unwrap();
        writeln!(file, r#"{{"t": 0.25, "lane": "S", "detected": false}}"#).unwrap();
        writeln!(file, r#"{{"t": 0.25, "siren": false}}"#).unwrap();
        drop(file);

        let clock = MonotonicClock::shared();
        let store = DetectionStore::shared(clock.clone());

        let mut registry = SourceRegistry::new(store.clone());
        for kind in [SensorKind::Vision, SensorKind::Audio] {
            let source = ReplaySource::load(
                &recording,
                format!("replay-{}", kind.as_str()),
                kind,
                ReplayConfig::default(),
            )
            .unwrap();
            registry.register(Box::new(source)).unwrap();
        }

        let (decision_tx, decision_rx) = mpsc::channel(64);
        let sink_configs = vec![SinkConfig {
            name: "telemetry".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            params: HashMap::from([("path".to_string(), output.display().to_string())]),
        }];
        let dispatcher_handle = create_dispatcher(sink_configs, decision_rx).unwrap().spawn();

        let config = SchedulerConfig {
            tick_interval_ms: 5,
            ..Default::default()
        };
        let scheduler = SignalScheduler::new(config, store.clone(), clock).unwrap();
        let driver = TickDriver::new(scheduler).with_consumer(decision_tx, ForwardPolicy::Changes);

        registry.start_all();
        let driver_handle = driver.spawn();

        let deadline = Instant::now() + Duration::from_secs(5);
        while registry.any_listening() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let driver_stats = driver_handle.shutdown().await.unwrap();
        registry.stop_all();
        let sink_metrics = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(driver_stats.preemptions, 1);
        assert_eq!(registry.metrics().snapshot().reports_received, 4);
        assert_eq!(sink_metrics[0].1.write_count, driver_stats.forwarded);

        let records: Vec<serde_json::Value> = std::fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let kinds: Vec<_> = records
            .iter()
            .map(|r| r["transition"]["kind"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["preemption_started", "preemption_cleared"]);

        assert_eq!(records[0]["mode"], "PRIORITY");
        assert_eq!(records[0]["lights"]["south"], "GREEN");
        assert_eq!(records[0]["ambulance_detected"], serde_json::json!(["S"]));
        assert_eq!(records[1]["mode"], "NORMAL");
        assert_eq!(records[1]["transition"]["resumed"], "north");
        assert_eq!(records[1]["lights"]["north"], "GREEN");
    }

    /// Every tick reaches the log sink when forwarding everything
    #[tokio::test]
    async fn test_driver_feeds_log_sink_every_tick() {
        let clock = MonotonicClock::shared();
        let store = DetectionStore::shared(clock.clone());
        let scheduler = SignalScheduler::new(SchedulerConfig::default(), store, clock).unwrap();

        let (tx, rx) = mpsc::channel(64);
        let sink_configs = vec![SinkConfig {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 64,
            params: HashMap::new(),
        }];
        let dispatcher_handle = create_dispatcher(sink_configs, rx).unwrap().spawn();

        let stats = TickDriver::new(scheduler)
            .with_interval(Duration::from_millis(1))
            .with_max_ticks(20)
            .with_consumer(tx, ForwardPolicy::All)
            .spawn()
            .join()
            .await
            .unwrap();

        let sink_metrics = dispatcher_handle.await.unwrap();
        assert_eq!(stats.ticks, 20);
        assert_eq!(stats.forwarded + stats.dropped, 20);
        assert_eq!(sink_metrics[0].1.write_count, stats.forwarded);
    }
}
