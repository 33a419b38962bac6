//! Shared state for one reconcile run.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::units::expand_home;
use crate::logging::Log;
use crate::system::Host;

/// Everything a reconcile run needs beyond the units themselves.
pub struct Context {
    /// Logger for progress and warnings.
    pub log: Arc<dyn Log>,
    /// Probe and diff only; never mutate or restart services.
    pub dry_run: bool,
    /// User's home directory, for `~` expansion.
    pub home: PathBuf,
    /// OS collaborators.
    pub host: Host,
    /// Directory catalog-relative paths resolve against.
    pub base_dir: PathBuf,
    /// Set by the interrupt handler; checked before each unit.
    pub interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("host", &self.host)
            .field("base_dir", &self.base_dir)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Context {
    /// Create a context for a real (non dry-run) run.
    #[must_use]
    pub fn new(log: Arc<dyn Log>, host: Host, home: PathBuf, base_dir: PathBuf) -> Self {
        Self {
            log,
            dry_run: false,
            home,
            host,
            base_dir,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Toggle dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Share an interrupt flag with a signal handler.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    /// Whether an interrupt has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Expand a leading `~` in a catalog path.
    #[must_use]
    pub fn expand(&self, path: &str) -> PathBuf {
        expand_home(path, &self.home)
    }

    /// Expand `~`, then resolve relative paths against the catalog directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let expanded = self.expand(&path.to_string_lossy());
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }
}
