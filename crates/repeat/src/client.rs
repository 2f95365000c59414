//! The runner's seam to the upstream service.
//!
//! [`RepeatRunner`](crate::RepeatRunner) talks to upstream exclusively
//! through [`JobClient`] so tests can substitute a scripted fake. The
//! production implementation is [`ComfyApi`].

use async_trait::async_trait;
use serde_json::Value;

use pylon_comfyui::{ComfyApi, ComfyApiError};

/// Submit-and-poll operations the runner needs from upstream.
///
/// Implementations must not retry; the runner decides what happens after
/// a failure.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit the workflow, returning the upstream job id.
    async fn submit(
        &self,
        base_url: &str,
        client_id: &str,
        prompt: &Value,
    ) -> Result<String, ComfyApiError>;

    /// Whether the job has reached the completed-jobs ledger.
    async fn completed(&self, base_url: &str, prompt_id: &str) -> Result<bool, ComfyApiError>;
}

#[async_trait]
impl JobClient for ComfyApi {
    async fn submit(
        &self,
        base_url: &str,
        client_id: &str,
        prompt: &Value,
    ) -> Result<String, ComfyApiError> {
        self.submit_prompt(base_url, prompt, client_id).await
    }

    async fn completed(&self, base_url: &str, prompt_id: &str) -> Result<bool, ComfyApiError> {
        self.history_contains(base_url, prompt_id).await
    }
}
