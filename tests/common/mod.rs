// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed catalog and an in-memory logger so
// each integration test can load and validate catalogs without touching the
// real home directory.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use provision_cli::cli::GlobalOpts;
use provision_cli::config::Catalog;
use provision_cli::logging::Log;

/// A catalog file in an isolated temporary directory.
///
/// The directory is automatically deleted when dropped (via the underlying
/// [`tempfile::TempDir`]).
pub struct TestCatalog {
    /// Temporary directory holding `catalog.toml` and any referenced files.
    pub root: tempfile::TempDir,
}

impl TestCatalog {
    /// Write `content` as `catalog.toml` in a fresh temporary directory.
    pub fn new(content: &str) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::write(root.path().join("catalog.toml"), content).expect("write catalog.toml");
        Self { root }
    }

    /// Create a file next to the catalog, for units with a relative `source`.
    pub fn with_file(self, name: &str, content: &str) -> Self {
        let path = self.root.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write catalog file");
        self
    }

    /// Path to `catalog.toml`.
    pub fn path(&self) -> PathBuf {
        self.root.path().join("catalog.toml")
    }

    /// Directory containing the catalog.
    pub fn dir(&self) -> &Path {
        self.root.path()
    }

    /// Global options pointing at this catalog.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            catalog: Some(self.path()),
            ..GlobalOpts::default()
        }
    }

    /// Load the catalog without validating it.
    pub fn load(&self) -> Catalog {
        Catalog::from_path(&self.path()).expect("load catalog")
    }
}

/// [`Log`] implementation that keeps every line in memory.
#[derive(Default)]
pub struct CollectingLog {
    lines: Mutex<Vec<String>>,
}

impl CollectingLog {
    fn push(&self, prefix: &str, msg: &str) {
        self.lines
            .lock()
            .expect("log lock")
            .push(format!("{prefix} {msg}"));
    }

    /// Every recorded line as `"<level> <message>"`.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("log lock").clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Log for CollectingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry-run", msg);
    }
}
