//! Command: check the catalog without touching the system.
use std::collections::BTreeMap;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Catalog;
use crate::logging::Log;

/// Run the validate command.  Works on any host OS.
///
/// # Errors
///
/// Returns an error listing every problem if the catalog is invalid.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let catalog = super::load_catalog(global, log)?;
    describe(&catalog, global, log);
    log.info("catalog is valid");
    Ok(())
}

/// Log unit counts per domain and the units the selectors keep.
fn describe(catalog: &Catalog, global: &GlobalOpts, log: &dyn Log) {
    let mut per_domain: BTreeMap<String, usize> = BTreeMap::new();
    for unit in &catalog.units {
        *per_domain.entry(unit.domain().to_string()).or_default() += 1;
    }
    for (domain, count) in &per_domain {
        log.info(&format!("{domain}: {count}"));
    }

    let selected = super::select(catalog, global, log);
    for unit in selected {
        let restarts = unit
            .restarts
            .as_deref()
            .map_or_else(String::new, |s| format!(", restarts {s}"));
        log.debug(&format!(
            "{} [{}] {}{restarts}",
            unit.id,
            unit.group(),
            unit.domain()
        ));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::test_helpers::{Level, RecordingLog};

    fn write_catalog(content: &str) -> (tempfile::TempDir, GlobalOpts) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, content).unwrap();
        let global = GlobalOpts {
            catalog: Some(path),
            ..GlobalOpts::default()
        };
        (dir, global)
    }

    #[test]
    fn valid_catalog_reports_domain_counts() {
        let (_dir, global) = write_catalog(
            r#"
[[unit]]
id = "keyboard.repeat"
kind = "preference"
domain = "NSGlobalDomain"
key = "KeyRepeat"
value = 2

[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = true
restarts = "Dock"
"#,
        );
        let log = RecordingLog::default();
        run(&global, &log).unwrap();
        assert!(log.contains(Level::Info, "preferences: 2"));
        assert!(log.contains(Level::Debug, "dock.autohide [dock] preferences, restarts Dock"));
        assert!(log.contains(Level::Info, "catalog is valid"));
    }

    #[test]
    fn invalid_catalog_lists_every_problem() {
        let (_dir, global) = write_catalog(
            r#"
[[unit]]
id = "runtimes.nodejs"
kind = "plugin-versions"
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = []

[[unit]]
id = "apps.rectangle"
kind = "login-item"
name = "Rectangle"
path = "/Applications/Rectangle.app"
depends-on = ["tools.missing"]
"#,
        );
        let err = run(&global, &RecordingLog::default()).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("2 catalog problem(s)"), "{text}");
        assert!(text.contains("runtimes.nodejs"));
        assert!(text.contains("unknown unit 'tools.missing'"));
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let global = GlobalOpts {
            catalog: Some("/nonexistent/catalog.toml".into()),
            ..GlobalOpts::default()
        };
        assert!(run(&global, &RecordingLog::default()).is_err());
    }
}
