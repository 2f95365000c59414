//! Persisted state for the recurring-job runner.
//!
//! [`RepeatState`] is the single durable record the runner owns: operator
//! intent (`active`), the job configuration, and the accounting for the
//! most recent cycle. [`RepeatSnapshot`] is the payload-redacted view
//! returned by every public runner operation -- the workflow itself never
//! leaves the process through a status response.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Durable record for the recurring-job runner.
///
/// Serialized wholesale to `repeat_state.json`; missing fields take their
/// defaults so older or hand-edited records still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatState {
    /// Operator intent: the loop should keep running.
    pub active: bool,
    /// Upstream base URL for the recurring job. Empty when inactive.
    pub base_url: String,
    /// The workflow JSON to resubmit each cycle.
    pub prompt: Option<serde_json::Value>,
    /// Identifier returned by the most recent submission.
    pub last_prompt_id: Option<String>,
    /// Message from the most recent failed cycle. Cleared when a new
    /// cycle begins.
    pub last_error: Option<String>,
    /// When the most recent cycle began.
    pub last_started_at: Option<Timestamp>,
    /// When the most recent cycle completed successfully.
    pub last_finished_at: Option<Timestamp>,
    /// Number of cycles that ran to completion. Only ever increases.
    pub runs: u64,
}

impl Default for RepeatState {
    fn default() -> Self {
        Self {
            active: false,
            base_url: String::new(),
            prompt: None,
            last_prompt_id: None,
            last_error: None,
            last_started_at: None,
            last_finished_at: None,
            runs: 0,
        }
    }
}

impl RepeatState {
    /// Redacted view of this record: everything except the workflow body.
    pub fn snapshot(&self) -> RepeatSnapshot {
        RepeatSnapshot {
            active: self.active,
            base_url: self.base_url.clone(),
            last_prompt_id: self.last_prompt_id.clone(),
            last_error: self.last_error.clone(),
            last_started_at: self.last_started_at,
            last_finished_at: self.last_finished_at,
            runs: self.runs,
        }
    }
}

/// What `start`/`stop`/`status` return: [`RepeatState`] minus the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSnapshot {
    pub active: bool,
    pub base_url: String,
    pub last_prompt_id: Option<String>,
    pub last_error: Option<String>,
    pub last_started_at: Option<Timestamp>,
    pub last_finished_at: Option<Timestamp>,
    pub runs: u64,
}
