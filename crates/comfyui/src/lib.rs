//! ComfyUI upstream client library.
//!
//! Wraps the ComfyUI HTTP API (workflow submission, history, node
//! metadata, file retrieval) and the WebSocket endpoint (address
//! derivation and connect). Deliberately retry-free: retry policy belongs
//! to the callers.

pub mod api;
pub mod client;

pub use api::{ComfyApi, ComfyApiError};
pub use client::{connect, ws_url, ComfyWsError, UpstreamSocket};
