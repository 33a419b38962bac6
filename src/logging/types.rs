//! The [`Log`] trait and the event vocabulary shared by the console and the
//! run log.
use std::fmt;

use tracing::field::{Field, Visit};

/// Target of stage headers.
pub(super) const STAGE_TARGET: &str = "provision::stage";
/// Target of changes a dry run would have made.
pub(super) const PLAN_TARGET: &str = "provision::plan";

/// Name of the span the orchestrator holds open while reconciling a unit.
///
/// Its `id` field is the unit id; the run log tags every event emitted
/// inside it with that id.
pub const UNIT_SPAN: &str = "unit";

/// Abstraction over logging backends.
///
/// [`Logger`](super::Logger) forwards to `tracing`; tests use an in-memory
/// recorder.  Reconcile code logs through `&dyn Log` only.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (hidden on the console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a change a dry run would have made.
    fn dry_run(&self, msg: &str);
}

/// The `message` of an event and the `id` of a unit span.
#[derive(Debug, Default)]
pub(super) struct EventFields {
    pub(super) message: String,
    pub(super) id: Option<String>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "id" => self.id = Some(format!("{value:?}")),
            _ => {}
        }
    }
}
