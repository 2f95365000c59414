//! Core domain types shared across the Pylon workspace.
//!
//! Plain data only: the persisted repeat-runner record, its redacted
//! snapshot view, and common type aliases. No I/O lives here.

pub mod repeat;
pub mod types;
