//! [`Log`] implementation that emits `tracing` events.
use std::path::{Path, PathBuf};

use super::types::{Log, PLAN_TARGET, STAGE_TARGET};

/// Logger behind every real command.
///
/// Events reach whatever subscriber is installed; in the binary that is the
/// console formatter plus the run log opened by
/// [`init_subscriber`](super::init_subscriber), whose path this logger
/// carries for the end-of-run summary.
#[derive(Debug, Default)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger; `log_file` is the run log, if one was opened.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self { log_file }
    }

    /// Path of the run log, if one was opened.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: PLAN_TARGET, "{msg}");
    }
}
