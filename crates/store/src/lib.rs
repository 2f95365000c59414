//! File-backed persistence for Pylon.
//!
//! Three small stores, all JSON-on-disk and all replace-on-write:
//!
//! - [`RepeatStateStore`] -- the repeat runner's single durable record.
//! - [`SettingsStore`] -- a flat settings document.
//! - [`WorkflowTemplateStore`] -- named workflow templates, one file each.
//!
//! Every write goes through a temp-file-then-rename so a reader never
//! observes a half-written record.

mod error;
mod fs;
pub mod repeat_state;
pub mod settings;
pub mod templates;

pub use error::StoreError;
pub use repeat_state::RepeatStateStore;
pub use settings::SettingsStore;
pub use templates::{TemplateSummary, UpsertTemplate, WorkflowTemplate, WorkflowTemplateStore};
