//! The recurring-job runner itself.
//!
//! One [`RepeatRunner`] exists per process. It owns the persisted
//! [`RepeatState`], the handle to the (at most one) live loop task, and a
//! per-loop [`CancellationToken`], all behind a single mutex so that
//! "check whether a loop is alive" and "spawn one" are a single atomic
//! step. The mutex is never held across a network call.
//!
//! Cancellation is cooperative: `stop()` flips the persisted `active`
//! flag and cancels the token, which wakes any sleep early, but the loop
//! only exits at a decision point. Worst-case stop latency is one poll
//! interval (or one backoff) plus whatever upstream call is in flight.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pylon_comfyui::ComfyApiError;
use pylon_core::repeat::{RepeatSnapshot, RepeatState};
use pylon_store::{RepeatStateStore, StoreError};

use crate::client::JobClient;

/// How long `shutdown` waits for the loop task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs for the loop. Tests shrink these.
#[derive(Debug, Clone)]
pub struct RepeatConfig {
    /// Delay between history polls while a job is executing.
    pub poll_interval: Duration,
    /// Delay after a failed cycle before the next attempt.
    pub error_backoff: Duration,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Errors surfaced to callers of the mutating operations.
///
/// Upstream faults never appear here: the loop absorbs them and records
/// them in `last_error` instead.
#[derive(Debug, thiserror::Error)]
pub enum RepeatError {
    /// The caller asked to start without a usable configuration.
    #[error("invalid repeat configuration: {0}")]
    InvalidConfig(&'static str),

    /// The state record could not be persisted. In-memory state still
    /// reflects the attempted change; durability is not guaranteed.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// The runner. Cheaply cloneable; all clones share one state record and
/// one loop task.
#[derive(Clone)]
pub struct RepeatRunner {
    shared: Arc<Shared>,
}

struct Shared {
    store: RepeatStateStore,
    client: Arc<dyn JobClient>,
    config: RepeatConfig,
    inner: Mutex<Inner>,
}

/// Everything the single mutex guards: the state record, the live task
/// handle, and the token that cancels it.
struct Inner {
    state: RepeatState,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl RepeatRunner {
    /// Create a runner, loading the persisted record.
    ///
    /// Does not spawn anything; call [`resume_if_active`](Self::resume_if_active)
    /// after construction to honor a persisted `active=true`.
    pub async fn new(
        store: RepeatStateStore,
        client: Arc<dyn JobClient>,
        config: RepeatConfig,
    ) -> Self {
        let state = store.load().await;
        Self {
            shared: Arc::new(Shared {
                store,
                client,
                config,
                inner: Mutex::new(Inner {
                    state,
                    task: None,
                    cancel: CancellationToken::new(),
                }),
            }),
        }
    }

    /// Activate the recurring job and ensure the loop is running.
    ///
    /// Idempotent: calling while a loop is alive refreshes the
    /// configuration for the *next* cycle and never spawns a second loop
    /// or interrupts the cycle in flight. Validation failures leave both
    /// in-memory and persisted state untouched.
    pub async fn start(
        &self,
        base_url: &str,
        prompt: Option<Value>,
    ) -> Result<RepeatSnapshot, RepeatError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RepeatError::InvalidConfig("base_url is required"));
        }
        let Some(prompt) = prompt.filter(|p| !p.is_null()) else {
            return Err(RepeatError::InvalidConfig("prompt is required"));
        };

        let mut inner = self.shared.inner.lock().await;
        inner.state.active = true;
        inner.state.base_url = base_url.to_string();
        inner.state.prompt = Some(prompt);
        inner.state.last_error = None;
        self.shared.store.save(&inner.state).await?;
        self.ensure_task(&mut inner);
        Ok(inner.state.snapshot())
    }

    /// Declare the loop should stop.
    ///
    /// Does not interrupt an in-flight upstream call; the loop observes
    /// the flag at its next decision point and exits.
    pub async fn stop(&self) -> Result<RepeatSnapshot, RepeatError> {
        let mut inner = self.shared.inner.lock().await;
        inner.state.active = false;
        inner.cancel.cancel();
        self.shared.store.save(&inner.state).await?;
        Ok(inner.state.snapshot())
    }

    /// Read-only snapshot of the current state.
    pub async fn status(&self) -> RepeatSnapshot {
        self.shared.inner.lock().await.state.snapshot()
    }

    /// Spawn the loop iff the persisted record says it should be running.
    /// Called once at process startup.
    pub async fn resume_if_active(&self) {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.active {
            tracing::info!("Resuming repeat loop from persisted state");
            self.ensure_task(&mut inner);
        }
    }

    /// Cancel the loop and wait (bounded) for it to exit.
    ///
    /// Leaves the persisted `active` flag untouched so a restart
    /// resumes the loop; only [`stop`](Self::stop) clears operator intent.
    pub async fn shutdown(&self) {
        let task = {
            let mut inner = self.shared.inner.lock().await;
            inner.cancel.cancel();
            inner.task.take()
        };
        if let Some(task) = task {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
                tracing::warn!("Repeat loop did not stop within the shutdown timeout");
            }
        }
    }

    // ---- private helpers ----

    /// Spawn the loop task unless one is already alive. Callers must hold
    /// the `inner` lock -- this is what makes check-then-spawn atomic with
    /// the state mutation that preceded it.
    ///
    /// If the loop is alive but its token was cancelled by an earlier
    /// `stop()`, the token is replaced so the loop (which re-reads it at
    /// every decision point) keeps running instead of honoring the stale
    /// cancellation.
    fn ensure_task(&self, inner: &mut Inner) {
        let alive = inner.task.as_ref().is_some_and(|task| !task.is_finished());
        if alive {
            if inner.cancel.is_cancelled() {
                inner.cancel = CancellationToken::new();
            }
            return;
        }

        inner.cancel = CancellationToken::new();
        let runner = self.clone();
        inner.task = Some(tokio::spawn(async move {
            runner.run_loop().await;
        }));
    }

    /// The loop: one iteration per cycle, until stopped or unconfigured.
    async fn run_loop(self) {
        tracing::info!("Repeat loop started");
        loop {
            // Decision point: read intent, configuration, and the current
            // cancellation token under the lock.
            let (base_url, prompt, cancel) = {
                let mut inner = self.shared.inner.lock().await;
                if !inner.state.active || inner.cancel.is_cancelled() {
                    break;
                }
                match (inner.state.base_url.is_empty(), inner.state.prompt.clone()) {
                    (false, Some(prompt)) => {
                        (inner.state.base_url.clone(), prompt, inner.cancel.clone())
                    }
                    _ => {
                        inner.state.active = false;
                        inner.state.last_error =
                            Some("repeat configuration is incomplete".to_string());
                        persist_logged(&self.shared.store, &inner.state).await;
                        tracing::error!("Repeat loop stopping: configuration is incomplete");
                        break;
                    }
                }
            };

            self.update(|state| {
                state.last_started_at = Some(chrono::Utc::now());
                state.last_error = None;
            })
            .await;

            match self.run_cycle(&base_url, &prompt, &cancel).await {
                Ok(true) => {
                    self.update(|state| {
                        state.last_finished_at = Some(chrono::Utc::now());
                        state.runs += 1;
                    })
                    .await;
                }
                // Stopped while waiting for completion; the next decision
                // point ends the loop.
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Repeat cycle failed");
                    self.update(|state| state.last_error = Some(e.to_string()))
                        .await;
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.shared.config.error_backoff) => {}
                    }
                }
            }
        }
        tracing::info!("Repeat loop stopped");
    }

    /// One submit-then-poll cycle.
    ///
    /// `Ok(true)` -- the job completed. `Ok(false)` -- stopped before
    /// completion. `Err` -- the submit or a poll failed.
    async fn run_cycle(
        &self,
        base_url: &str,
        prompt: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool, ComfyApiError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let prompt_id = self
            .shared
            .client
            .submit(base_url, &client_id, prompt)
            .await?;
        tracing::info!(prompt_id = %prompt_id, "Workflow submitted");
        self.update(|state| state.last_prompt_id = Some(prompt_id.clone()))
            .await;

        loop {
            if !self.is_active().await || cancel.is_cancelled() {
                return Ok(false);
            }
            if self.shared.client.completed(base_url, &prompt_id).await? {
                tracing::info!(prompt_id = %prompt_id, "Workflow completed");
                return Ok(true);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(false),
                _ = tokio::time::sleep(self.shared.config.poll_interval) => {}
            }
        }
    }

    /// Apply a mutation and persist, holding the lock for both.
    /// Persistence failures here are logged, not fatal -- the loop keeps
    /// the in-memory record authoritative.
    async fn update(&self, mutate: impl FnOnce(&mut RepeatState)) {
        let mut inner = self.shared.inner.lock().await;
        mutate(&mut inner.state);
        persist_logged(&self.shared.store, &inner.state).await;
    }

    async fn is_active(&self) -> bool {
        self.shared.inner.lock().await.state.active
    }
}

async fn persist_logged(store: &RepeatStateStore, state: &RepeatState) {
    if let Err(e) = store.save(state).await {
        tracing::error!(error = %e, "Failed to persist repeat state");
    }
}
