//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission, history retrieval, node metadata, and file
//! retrieval using [`reqwest`]. Every call carries an explicit timeout and
//! no call is ever retried here -- the repeat runner owns retry policy.

use std::time::Duration;

use serde_json::Value;

/// Timeout for workflow submission.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for history and node-metadata queries.
const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for file retrieval (`/view`).
const VIEW_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the ComfyUI REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyApiError {
    /// The caller-supplied base URL is empty or unusable.
    #[error("invalid base URL: {0:?}")]
    InvalidBaseUrl(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("upstream request failed: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("upstream returned {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response was missing something we depend on.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// HTTP client for a ComfyUI instance.
///
/// Stateless apart from the connection pool; the target base URL is
/// passed per call because callers talk to whichever instance the
/// operator configured.
pub struct ComfyApi {
    client: reqwest::Client,
}

impl ComfyApi {
    /// Create an API client with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Submit a workflow for execution.
    ///
    /// Sends `POST {base}/prompt` with the workflow JSON and client ID.
    /// Returns the server-assigned job id, read from `prompt_id` or `id`
    /// in the response body.
    pub async fn submit_prompt(
        &self,
        base_url: &str,
        prompt: &Value,
        client_id: &str,
    ) -> Result<String, ComfyApiError> {
        let base = normalize_base_url(base_url)?;
        let body = serde_json::json!({
            "prompt": prompt,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{base}/prompt"))
            .timeout(SUBMIT_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let data: Value = Self::parse_response(response).await?;
        extract_prompt_id(&data)
            .map(str::to_owned)
            .ok_or_else(|| ComfyApiError::Malformed("no prompt_id or id field".into()))
    }

    /// Retrieve execution history for a specific job.
    ///
    /// Sends `GET {base}/history/{prompt_id}`. The returned JSON is keyed
    /// by prompt id and contains outputs and timing data.
    pub async fn history(&self, base_url: &str, prompt_id: &str) -> Result<Value, ComfyApiError> {
        let base = normalize_base_url(base_url)?;
        let response = self
            .client
            .get(format!("{base}/history/{prompt_id}"))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Whether a job has finished: ComfyUI records completed jobs in the
    /// history ledger, keyed by prompt id.
    pub async fn history_contains(
        &self,
        base_url: &str,
        prompt_id: &str,
    ) -> Result<bool, ComfyApiError> {
        let history = self.history(base_url, prompt_id).await?;
        Ok(history_has_entry(&history, prompt_id))
    }

    /// Fetch node metadata for every registered node class.
    pub async fn object_info(&self, base_url: &str) -> Result<Value, ComfyApiError> {
        let base = normalize_base_url(base_url)?;
        let response = self
            .client
            .get(format!("{base}/object_info"))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch node metadata for a single node class.
    pub async fn object_info_class(
        &self,
        base_url: &str,
        node_class: &str,
    ) -> Result<Value, ComfyApiError> {
        let base = normalize_base_url(base_url)?;
        let response = self
            .client
            .get(format!("{base}/object_info/{node_class}"))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve a generated file via `GET {base}/view`.
    ///
    /// Returns the raw [`reqwest::Response`] (already checked for a
    /// success status) so the caller can stream the body and propagate
    /// the upstream content type.
    pub async fn view(
        &self,
        base_url: &str,
        filename: &str,
        subfolder: Option<&str>,
        file_type: Option<&str>,
    ) -> Result<reqwest::Response, ComfyApiError> {
        let base = normalize_base_url(base_url)?;

        let mut params = vec![("filename", filename)];
        if let Some(subfolder) = subfolder {
            params.push(("subfolder", subfolder));
        }
        if let Some(file_type) = file_type {
            params.push(("type", file_type));
        }

        let response = self
            .client
            .get(format!("{base}/view"))
            .timeout(VIEW_TIMEOUT)
            .query(&params)
            .send()
            .await?;

        Self::ensure_success(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or [`ComfyApiError::Rejected`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComfyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

impl Default for ComfyApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim and validate a caller-supplied base URL.
///
/// Trailing slashes are stripped so path concatenation stays predictable.
pub fn normalize_base_url(base_url: &str) -> Result<&str, ComfyApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ComfyApiError::InvalidBaseUrl(base_url.to_string()));
    }
    Ok(trimmed)
}

/// Read the job id out of a submission response.
///
/// ComfyUI proper answers with `prompt_id`; some forks use `id`.
fn extract_prompt_id(data: &Value) -> Option<&str> {
    data.get("prompt_id")
        .and_then(Value::as_str)
        .or_else(|| data.get("id").and_then(Value::as_str))
}

/// A job is complete iff the history object contains its id as a key.
fn history_has_entry(history: &Value, prompt_id: &str) -> bool {
    history
        .as_object()
        .is_some_and(|obj| obj.contains_key(prompt_id))
}
