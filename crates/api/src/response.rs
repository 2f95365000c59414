//! Shared response envelope types for API handlers.
//!
//! Resources owned by Pylon use a `{ "data": ... }` envelope. Responses
//! forwarded verbatim from the upstream instance (history, node metadata,
//! files) are intentionally not wrapped.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
