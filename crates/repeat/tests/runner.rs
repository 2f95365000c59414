//! Integration tests for `RepeatRunner`.
//!
//! Exercise the loop against a scripted fake upstream: single-flight
//! across start/stop sequences, run accounting, error recording and
//! recovery, bounded stop latency, and restart-resume from a persisted
//! record. Timing knobs are shrunk so each test settles in milliseconds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::{json, Value};

use pylon_comfyui::ComfyApiError;
use pylon_core::repeat::{RepeatSnapshot, RepeatState};
use pylon_repeat::{JobClient, RepeatConfig, RepeatError, RepeatRunner};
use pylon_store::RepeatStateStore;

// ---------------------------------------------------------------------------
// Fake upstream client
// ---------------------------------------------------------------------------

/// Scripted [`JobClient`]: pops canned results while the scripts last,
/// then falls back to configurable defaults. Also counts calls so tests
/// can assert on loop behaviour.
#[derive(Default)]
struct FakeClient {
    submit_script: std::sync::Mutex<VecDeque<Result<String, ComfyApiError>>>,
    completed_script: std::sync::Mutex<VecDeque<Result<bool, ComfyApiError>>>,
    /// Default completion answer once the script is exhausted.
    completes_by_default: bool,
    /// When set, unscripted submits fail instead of succeeding.
    fail_all_submits: bool,
    submit_calls: AtomicUsize,
    completed_calls: AtomicUsize,
    submitted_base_urls: std::sync::Mutex<Vec<String>>,
}

impl FakeClient {
    /// Every cycle submits fine and completes on the first poll.
    fn completing() -> Arc<Self> {
        Arc::new(Self {
            completes_by_default: true,
            ..Default::default()
        })
    }

    /// Every cycle submits fine but never completes.
    fn pending() -> Arc<Self> {
        Arc::new(Self {
            completes_by_default: false,
            ..Default::default()
        })
    }

    /// Every submit fails.
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_all_submits: true,
            ..Default::default()
        })
    }

    fn script_submits(&self, results: Vec<Result<String, ComfyApiError>>) {
        self.submit_script.lock().unwrap().extend(results);
    }

    fn rejected() -> ComfyApiError {
        ComfyApiError::Rejected {
            status: 502,
            body: "boom".to_string(),
        }
    }
}

#[async_trait]
impl JobClient for FakeClient {
    async fn submit(
        &self,
        base_url: &str,
        _client_id: &str,
        _prompt: &Value,
    ) -> Result<String, ComfyApiError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted_base_urls
            .lock()
            .unwrap()
            .push(base_url.to_string());

        if let Some(result) = self.submit_script.lock().unwrap().pop_front() {
            return result;
        }
        if self.fail_all_submits {
            return Err(Self::rejected());
        }
        Ok(format!("job-{n}"))
    }

    async fn completed(&self, _base_url: &str, _prompt_id: &str) -> Result<bool, ComfyApiError> {
        self.completed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.completed_script.lock().unwrap().pop_front() {
            return result;
        }
        Ok(self.completes_by_default)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn fast_config() -> RepeatConfig {
    RepeatConfig {
        poll_interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(10),
    }
}

async fn runner_with(
    dir: &tempfile::TempDir,
    client: Arc<FakeClient>,
    config: RepeatConfig,
) -> RepeatRunner {
    let store = RepeatStateStore::new(dir.path().join("repeat_state.json"));
    RepeatRunner::new(store, client, config).await
}

/// Poll `status()` until the predicate holds, or panic after 2 seconds.
async fn wait_for(
    runner: &RepeatRunner,
    predicate: impl Fn(&RepeatSnapshot) -> bool,
) -> RepeatSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let snapshot = runner.status().await;
        if predicate(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached in time, last snapshot: {snapshot:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn workflow() -> Option<Value> {
    Some(json!({"x": 1}))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_with_empty_base_url_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_with(&dir, FakeClient::completing(), fast_config()).await;

    let result = runner.start("", workflow()).await;

    assert_matches!(result, Err(RepeatError::InvalidConfig(_)));
    // Nothing was persisted by the failed call.
    let store = RepeatStateStore::new(dir.path().join("repeat_state.json"));
    assert_eq!(store.load().await, RepeatState::default());
}

#[tokio::test]
async fn start_without_prompt_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_with(&dir, FakeClient::completing(), fast_config()).await;

    assert_matches!(
        runner.start("http://up:8188", None).await,
        Err(RepeatError::InvalidConfig(_))
    );
    assert_matches!(
        runner.start("http://up:8188", Some(Value::Null)).await,
        Err(RepeatError::InvalidConfig(_))
    );
    assert!(!runner.status().await.active);
}

// ---------------------------------------------------------------------------
// Run accounting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_cycles_increment_runs() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_with(&dir, FakeClient::completing(), fast_config()).await;

    let snapshot = runner.start("http://up:8188", workflow()).await.unwrap();
    assert!(snapshot.active);
    assert_eq!(snapshot.runs, 0);

    let snapshot = wait_for(&runner, |s| s.runs >= 3).await;
    assert!(snapshot.active);
    assert!(snapshot.last_error.is_none());
    assert!(snapshot.last_prompt_id.as_deref().unwrap().starts_with("job-"));
    assert!(snapshot.last_started_at.is_some());
    assert!(snapshot.last_finished_at.is_some());

    runner.stop().await.unwrap();
}

#[tokio::test]
async fn runs_do_not_change_while_cycles_fail() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::failing();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://up:8188", workflow()).await.unwrap();

    // Let several failing cycles elapse.
    wait_for(&runner, |s| s.last_error.is_some()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = runner.status().await;
    assert_eq!(snapshot.runs, 0);
    assert!(snapshot.active, "transient failures must not stop the loop");
    assert!(client.submit_calls.load(Ordering::SeqCst) >= 2, "loop keeps retrying");

    runner.stop().await.unwrap();
}

#[tokio::test]
async fn submit_failing_twice_then_succeeding_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::completing();
    client.script_submits(vec![Err(FakeClient::rejected()), Err(FakeClient::rejected())]);
    let runner = runner_with(
        &dir,
        Arc::clone(&client),
        RepeatConfig {
            poll_interval: Duration::from_millis(10),
            // Wide enough that the error state is observable between cycles.
            error_backoff: Duration::from_millis(50),
        },
    )
    .await;

    runner.start("http://up:8188", workflow()).await.unwrap();

    let snapshot = wait_for(&runner, |s| s.last_error.is_some()).await;
    assert_eq!(snapshot.runs, 0);

    let snapshot = wait_for(&runner, |s| s.runs >= 1).await;
    assert!(snapshot.last_error.is_none());
    assert!(client.submit_calls.load(Ordering::SeqCst) >= 3);

    runner.stop().await.unwrap();
}

// ---------------------------------------------------------------------------
// Single-flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_starts_never_spawn_a_second_loop() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::pending();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    for _ in 0..5 {
        runner.start("http://up:8188", workflow()).await.unwrap();
    }
    // Concurrent starts race the same lock; still exactly one loop.
    let (a, b, c) = tokio::join!(
        runner.start("http://up:8188", workflow()),
        runner.start("http://up:8188", workflow()),
        runner.start("http://up:8188", workflow()),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    // One loop, one pending cycle: exactly one submission ever went out.
    assert_eq!(client.submit_calls.load(Ordering::SeqCst), 1);

    runner.stop().await.unwrap();
}

#[tokio::test]
async fn start_while_active_refreshes_config_for_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::completing();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://first:8188", workflow()).await.unwrap();
    wait_for(&runner, |s| s.runs >= 1).await;

    runner.start("http://second:8188", workflow()).await.unwrap();
    wait_for(&runner, |s| s.base_url == "http://second:8188" && s.runs >= 2).await;

    let urls = client.submitted_base_urls.lock().unwrap().clone();
    assert!(urls.iter().any(|u| u == "http://second:8188"));

    runner.stop().await.unwrap();
}

// ---------------------------------------------------------------------------
// Stopping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_halts_polling_within_the_latency_bound() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::pending();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://up:8188", workflow()).await.unwrap();
    // The cycle is in its poll loop once a couple of polls have happened.
    wait_for(&runner, |_| client.completed_calls.load(Ordering::SeqCst) >= 2).await;

    let snapshot = runner.stop().await.unwrap();
    assert!(!snapshot.active);

    // Give the loop a couple of ticks to observe the flag, then the
    // poll count must freeze.
    tokio::time::sleep(Duration::from_millis(40)).await;
    let settled = client.completed_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(client.completed_calls.load(Ordering::SeqCst), settled);
    assert!(!runner.status().await.active);
}

#[tokio::test]
async fn stop_then_start_keeps_the_loop_running() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::pending();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://up:8188", workflow()).await.unwrap();
    wait_for(&runner, |_| client.completed_calls.load(Ordering::SeqCst) >= 1).await;

    // Stop and immediately restart: the loop must survive the stale
    // cancellation and keep polling.
    runner.stop().await.unwrap();
    runner.start("http://up:8188", workflow()).await.unwrap();

    let before = client.completed_calls.load(Ordering::SeqCst);
    wait_for(&runner, |_| {
        client.completed_calls.load(Ordering::SeqCst) > before + 2
    })
    .await;
    assert!(runner.status().await.active);

    runner.stop().await.unwrap();
}

#[tokio::test]
async fn shutdown_keeps_operator_intent_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::completing();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://up:8188", workflow()).await.unwrap();
    wait_for(&runner, |s| s.runs >= 1).await;

    runner.shutdown().await;

    // The loop is gone but `active` stays true so a restart resumes it.
    let settled = client.submit_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(client.submit_calls.load(Ordering::SeqCst), settled);

    let store = RepeatStateStore::new(dir.path().join("repeat_state.json"));
    assert!(store.load().await.active);
}

// ---------------------------------------------------------------------------
// Restart / resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_spawns_the_loop_from_a_persisted_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repeat_state.json");

    let store = RepeatStateStore::new(&path);
    store
        .save(&RepeatState {
            active: true,
            base_url: "http://up:8188".into(),
            prompt: Some(json!({"x": 1})),
            ..Default::default()
        })
        .await
        .unwrap();

    let client = FakeClient::completing();
    let runner = RepeatRunner::new(
        RepeatStateStore::new(&path),
        Arc::clone(&client),
        fast_config(),
    )
    .await;
    runner.resume_if_active().await;

    // No `start` call, yet cycles run.
    wait_for(&runner, |s| s.runs >= 1).await;

    runner.stop().await.unwrap();
}

#[tokio::test]
async fn resume_does_nothing_when_inactive() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::completing();
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.resume_if_active().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn incomplete_persisted_config_deactivates_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repeat_state.json");

    // active=true but no prompt: the loop must give up rather than spin.
    let store = RepeatStateStore::new(&path);
    store
        .save(&RepeatState {
            active: true,
            base_url: "http://up:8188".into(),
            prompt: None,
            ..Default::default()
        })
        .await
        .unwrap();

    let client = FakeClient::completing();
    let runner = RepeatRunner::new(
        RepeatStateStore::new(&path),
        Arc::clone(&client),
        fast_config(),
    )
    .await;
    runner.resume_if_active().await;

    let snapshot = wait_for(&runner, |s| !s.active).await;
    assert!(snapshot.last_error.is_some());
    assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Error lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_error_is_cleared_when_a_cycle_begins() {
    let dir = tempfile::tempdir().unwrap();
    let client = FakeClient::completing();
    client.script_submits(vec![Err(FakeClient::rejected())]);
    let runner = runner_with(&dir, Arc::clone(&client), fast_config()).await;

    runner.start("http://up:8188", workflow()).await.unwrap();

    wait_for(&runner, |s| s.last_error.is_some()).await;
    // The next cycle succeeds and must wipe the error.
    let snapshot = wait_for(&runner, |s| s.runs >= 1).await;
    assert!(snapshot.last_error.is_none());

    runner.stop().await.unwrap();
}
