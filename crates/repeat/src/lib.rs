//! The recurring-job runner.
//!
//! [`RepeatRunner`] owns a persisted, cancellable, single-flight
//! background loop: submit a fixed workflow upstream, poll until it lands
//! in the history ledger, record the outcome durably, repeat. Transient
//! upstream faults are absorbed with a fixed backoff; the loop only ends
//! when an operator stops it (or its configuration turns out to be
//! unusable).

pub mod client;
pub mod runner;

pub use client::JobClient;
pub use runner::{RepeatConfig, RepeatError, RepeatRunner};
