//! Integration tests for the job runner.
//!
//! These tests run real jobs against a scripted model client and check the
//! result log and manifest written to a temporary directory.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use keepsake::KeepsakeError;
use keepsake::api::{ModelClient, ModelFuture, ModelReply, ModelRequest};
use keepsake::knowledge::CompressionConfig;
use keepsake::strategy::StrategyKind;
use keepsake_bench::{
    FnObserver, JobRunner, NoopObserver, ResultRecord, RunConfig, RunEvent, Scenario, Turn,
    manifest_path_for,
};

/// Answers every request after a short delay, failing any request whose
/// messages mention `fail_marker`. Tracks peak concurrent calls.
struct ScriptedClient {
    fail_marker: Option<&'static str>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(fail_marker: Option<&'static str>) -> Self {
        Self {
            fail_marker,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ModelClient for ScriptedClient {
    fn complete<'a>(&'a self, request: &'a ModelRequest) -> ModelFuture<'a> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let text: String = request.messages.iter().map(|m| m.content.as_str()).collect();
            self.seen.lock().unwrap().push(text.clone());
            if let Some(marker) = self.fail_marker
                && text.contains(marker)
            {
                return Err(KeepsakeError::Model("OpenRouter API HTTP 429: rate limited".into()));
            }
            Ok(ModelReply {
                text: "Noted.".into(),
                input_tokens: 20,
                output_tokens: 4,
            })
        })
    }
}

fn scenario(name: &str, user: &str) -> Scenario {
    Scenario {
        name: name.into(),
        description: None,
        turns: vec![
            Turn {
                user: user.into(),
                probe: None,
            },
            Turn {
                user: "Anything else?".into(),
                probe: None,
            },
        ],
    }
}

fn five_scenarios() -> Vec<Scenario> {
    vec![
        scenario("s1", "hello one"),
        scenario("s2", "hello two"),
        scenario("s3", "please FAIL now"),
        scenario("s4", "hello four"),
        scenario("s5", "hello five"),
    ]
}

fn read_records(path: &Path) -> Vec<ResultRecord> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn read_manifest(output: &Path) -> serde_json::Value {
    let path = manifest_path_for(output);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ── Concurrency and failure isolation ────────────────────────────────

#[tokio::test]
async fn one_failing_job_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results.json");
    let client = Arc::new(ScriptedClient::new(Some("FAIL")));

    let summary = JobRunner::new(RunConfig::new(&output).with_concurrency(2), client.clone())
        .with_observer(NoopObserver)
        .run(&[StrategyKind::FullContext], five_scenarios())
        .await
        .unwrap();

    assert_eq!(summary.planned, 5);
    assert_eq!(summary.executed, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].scenario, "s3");
    assert!(summary.failures[0].error.contains("429"));

    let records = read_records(&output);
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.scenario != "s3"));

    let manifest = read_manifest(&output);
    assert_eq!(manifest["plannedRuns"], 5);
    assert_eq!(manifest["executedRuns"], 4);
    assert_eq!(manifest["failedRuns"], 1);
    assert_eq!(manifest["cachedRuns"], 0);
    assert_eq!(manifest["totalRecords"], 4);
    assert_eq!(manifest["concurrency"], 2);

    assert!(client.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn sequential_mode_runs_one_call_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results.json");
    let client = Arc::new(ScriptedClient::new(None));

    let summary = JobRunner::new(RunConfig::new(&output).with_sequential(true), client.clone())
        .with_observer(NoopObserver)
        .run(&[StrategyKind::FullContext], five_scenarios())
        .await
        .unwrap();

    assert_eq!(summary.executed, 5);
    assert_eq!(client.peak.load(Ordering::SeqCst), 1);
    assert_eq!(read_manifest(&output)["sequential"], true);
}

// ── Resume ───────────────────────────────────────────────────────────

#[tokio::test]
async fn recorded_pairs_are_skipped_as_cached() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results.json");
    let existing = ResultRecord {
        strategy: "full-context".into(),
        scenario: "s1".into(),
        turns: 2,
        probes_total: 0,
        probes_passed: 0,
        retention_score: 1.0,
        input_tokens: 40,
        output_tokens: 8,
        overhead_tokens: 0,
        compression_cycles: 0,
        peak_context_tokens: 10,
        estimated_cost_usd: 0.0001,
        duration_ms: 12,
        completed_at: "2026-10-14T09:00:00+00:00".into(),
    };
    std::fs::write(&output, serde_json::to_string(&vec![existing.clone()]).unwrap()).unwrap();

    let cached_events = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&cached_events);
    let client = Arc::new(ScriptedClient::new(None));

    let summary = JobRunner::new(RunConfig::new(&output), client.clone())
        .with_observer(FnObserver::new(move |event| {
            if let RunEvent::JobCached { strategy, scenario } = event {
                observed
                    .lock()
                    .unwrap()
                    .push(format!("{strategy}/{scenario}"));
            }
        }))
        .run(
            &[StrategyKind::FullContext],
            vec![scenario("s1", "hello one"), scenario("s2", "hello two")],
        )
        .await
        .unwrap();

    assert_eq!(summary.cached, 1);
    assert_eq!(summary.executed, 1);
    assert_eq!(*cached_events.lock().unwrap(), vec!["full-context/s1".to_string()]);
    assert!(
        client
            .seen
            .lock()
            .unwrap()
            .iter()
            .all(|text| !text.contains("hello one"))
    );

    let records = read_records(&output);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], existing);
    assert_eq!(read_manifest(&output)["cachedRuns"], 1);
}

#[tokio::test]
async fn rerun_after_failure_only_runs_the_failed_job() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results.json");

    let flaky = Arc::new(ScriptedClient::new(Some("FAIL")));
    JobRunner::new(RunConfig::new(&output).with_concurrency(2), flaky)
        .with_observer(NoopObserver)
        .run(&[StrategyKind::FullContext], five_scenarios())
        .await
        .unwrap();

    let healthy = Arc::new(ScriptedClient::new(None));
    let summary = JobRunner::new(RunConfig::new(&output).with_concurrency(2), healthy)
        .with_observer(NoopObserver)
        .run(&[StrategyKind::FullContext], five_scenarios())
        .await
        .unwrap();

    assert_eq!(summary.cached, 4);
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(read_records(&output).len(), 5);
}

// ── Strategies end to end ────────────────────────────────────────────

#[tokio::test]
async fn every_strategy_produces_a_record() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results.json");
    let client = Arc::new(ScriptedClient::new(None));
    let compression = CompressionConfig::default()
        .with_compress_every(2)
        .with_recent_window(1);
    let strategies = StrategyKind::all(&compression, 2);

    let long = Scenario {
        name: "long".into(),
        description: None,
        turns: (0..6)
            .map(|i| Turn {
                user: format!("message {i}"),
                probe: None,
            })
            .collect(),
    };

    let summary = JobRunner::new(RunConfig::new(&output), client)
        .with_observer(NoopObserver)
        .run(&strategies, vec![long])
        .await
        .unwrap();
    assert_eq!(summary.executed, 4);

    let records = read_records(&output);
    let structured = records.iter().find(|r| r.strategy == "structured").unwrap();
    assert!(structured.compression_cycles > 0);
    assert!(structured.overhead_tokens > 0);
    let full = records.iter().find(|r| r.strategy == "full-context").unwrap();
    assert_eq!(full.compression_cycles, 0);
    assert_eq!(full.overhead_tokens, 0);
}
