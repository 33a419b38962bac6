//! Per-run record of unit outcomes and the end-of-run summary.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::Outcome;
use super::tolerance::Resolution;
use crate::config::units::{ConfigUnit, Domain};
use crate::logging::Log;

/// Outcome of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Unit id.
    pub id: String,
    /// Catalog group.
    pub group: String,
    /// OS subsystem.
    pub domain: Domain,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Diff text, remediation, or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything that happened in one run, in catalog order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Whether the run only probed and diffed.
    pub dry_run: bool,
    /// One entry per processed unit.
    pub units: Vec<UnitReport>,
    /// Services restarted (or, in a dry run, that would have been).
    pub restarts: Vec<String>,
    /// Warnings raised by degraded outcomes and failed restarts.
    pub warnings: Vec<String>,
    /// Whether the run stopped on an interrupt.
    pub interrupted: bool,
}

/// JSON shape: the report plus per-outcome totals.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    totals: BTreeMap<String, usize>,
}

impl RunReport {
    /// Start an empty report.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Record a unit's resolution.
    pub fn record(&mut self, unit: &ConfigUnit, resolution: Resolution) {
        if let Some(warning) = resolution.warning {
            self.warnings.push(warning);
        }
        self.units.push(UnitReport {
            id: unit.id.clone(),
            group: unit.group().to_string(),
            domain: unit.domain(),
            outcome: resolution.outcome,
            detail: resolution.detail,
        });
    }

    /// Outcome recorded for `id`, if it has been processed.
    #[must_use]
    pub fn outcome_of(&self, id: &str) -> Option<Outcome> {
        self.units.iter().find(|u| u.id == id).map(|u| u.outcome)
    }

    /// Number of units with `outcome`.
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.units.iter().filter(|u| u.outcome == outcome).count()
    }

    /// One-line totals, e.g. `3 units: 1 applied, 2 satisfied`.
    ///
    /// Outcomes with a zero count are left out.
    #[must_use]
    pub fn totals(&self) -> String {
        let parts: Vec<String> = Outcome::ALL
            .iter()
            .map(|&o| (o, self.count(o)))
            .filter(|&(_, n)| n > 0)
            .map(|(o, n)| format!("{n} {o}"))
            .collect();
        if parts.is_empty() {
            return "0 units".to_string();
        }
        format!("{} units: {}", self.units.len(), parts.join(", "))
    }

    /// Summary lines: one per unit, then totals, restarts, and interruption.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .units
            .iter()
            .map(|u| {
                let icon = icon(u.outcome);
                match &u.detail {
                    Some(detail) => format!("{icon} {} ({detail})", u.id),
                    None => format!("{icon} {}", u.id),
                }
            })
            .collect();
        lines.push(String::new());
        lines.push(self.totals());
        if !self.restarts.is_empty() {
            let verb = if self.dry_run {
                "would restart"
            } else {
                "restarted"
            };
            lines.push(format!("{verb}: {}", self.restarts.join(", ")));
        }
        if self.interrupted {
            lines.push("interrupted; re-run to resume".to_string());
        }
        lines
    }

    /// Emit [`summary_lines`](Self::summary_lines) through `log`, followed
    /// by the log file location.
    pub fn print_summary(&self, log: &dyn Log, log_file: Option<&Path>) {
        if self.units.is_empty() {
            log.info("no units selected");
            return;
        }
        log.stage("Summary");
        for line in self.summary_lines() {
            log.info(&line);
        }
        if let Some(path) = log_file {
            log.info(&format!("log: {}", path.display()));
        }
    }

    /// Serialize the report, with totals, as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let totals = Outcome::ALL
            .iter()
            .map(|&o| (o.key().to_string(), self.count(o)))
            .collect();
        let json = serde_json::to_string_pretty(&JsonReport {
            report: self,
            totals,
        })?;
        Ok(json)
    }

    /// Write the JSON report to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized or written.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing report to {}", path.display()))
    }
}

const fn icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Applied => "✓",
        Outcome::Satisfied => "·",
        Outcome::WouldApply => "~",
        Outcome::SkippedPrivilege | Outcome::SkippedUnavailable => "○",
        Outcome::FailedFatal => "✗",
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_helpers::catalog;
    use crate::logging::test_helpers::{Level, RecordingLog};

    const UNITS: &str = r#"
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

[[unit]]
id = "security.firewall"
kind = "preference"
domain = "/Library/Preferences/com.apple.alf"
key = "globalstate"
value = 1
requires-privilege = true

[[unit]]
id = "runtimes.nodejs"
kind = "plugin-versions"
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = ["20.11.0"]
"#;

    fn sample() -> RunReport {
        let c = catalog(UNITS);
        let mut report = RunReport::new(false);
        report.record(&c.units[0], Resolution::satisfied());
        report.record(
            &c.units[1],
            Resolution {
                outcome: Outcome::Applied,
                detail: Some("currently 0".to_string()),
                warning: None,
            },
        );
        report.record(
            &c.units[2],
            Resolution {
                outcome: Outcome::SkippedPrivilege,
                detail: Some("run manually: sudo defaults write".to_string()),
                warning: Some("security.firewall: permission denied".to_string()),
            },
        );
        report.record(
            &c.units[3],
            Resolution {
                outcome: Outcome::SkippedUnavailable,
                detail: Some("required tool 'asdf' is not installed".to_string()),
                warning: Some("runtimes.nodejs: asdf missing".to_string()),
            },
        );
        report.restarts.push("Dock".to_string());
        report
    }

    #[test]
    fn summary_lines_snapshot() {
        insta::assert_snapshot!(sample().summary_lines().join("\n"), @r"
        · keyboard.repeat
        ✓ dock.autohide (currently 0)
        ○ security.firewall (run manually: sudo defaults write)
        ○ runtimes.nodejs (required tool 'asdf' is not installed)

        4 units: 1 applied, 1 satisfied, 1 skipped (privilege), 1 skipped (unavailable)
        restarted: Dock
        ");
    }

    #[test]
    fn record_collects_warnings_and_groups() {
        let report = sample();
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.units[1].group, "dock");
        assert_eq!(report.outcome_of("dock.autohide"), Some(Outcome::Applied));
        assert_eq!(report.outcome_of("missing"), None);
        assert_eq!(report.count(Outcome::FailedFatal), 0);
    }

    #[test]
    fn totals_for_empty_report() {
        assert_eq!(RunReport::new(true).totals(), "0 units");
    }

    #[test]
    fn dry_run_summary_says_would_restart() {
        let mut report = sample();
        report.dry_run = true;
        report.interrupted = true;
        let lines = report.summary_lines();
        assert!(lines.contains(&"would restart: Dock".to_string()));
        assert_eq!(lines.last().unwrap(), "interrupted; re-run to resume");
    }

    #[test]
    fn json_contains_units_and_totals() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["units"].as_array().unwrap().len(), 4);
        assert_eq!(json["units"][2]["outcome"], "skipped-privilege");
        assert_eq!(json["units"][0]["domain"], "preferences");
        assert!(json["units"][0].get("detail").is_none());
        assert_eq!(json["totals"]["applied"], 1);
        assert_eq!(json["totals"]["skipped-unavailable"], 1);
        assert_eq!(json["restarts"][0], "Dock");
    }

    #[test]
    fn write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        sample().write_json(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("dock.autohide"));
    }

    #[test]
    fn print_summary_emits_summary_lines_then_log_path() {
        let report = sample();
        let log = RecordingLog::default();
        report.print_summary(&log, Some(Path::new("/tmp/provision/apply.log")));

        assert_eq!(log.messages(Level::Stage), vec!["Summary".to_string()]);
        let mut expected = report.summary_lines();
        expected.push("log: /tmp/provision/apply.log".to_string());
        assert_eq!(log.messages(Level::Info), expected);
    }

    #[test]
    fn print_summary_without_units() {
        let log = RecordingLog::default();
        RunReport::new(false).print_summary(&log, None);
        assert_eq!(log.messages(Level::Info), vec!["no units selected".to_string()]);
        assert!(log.messages(Level::Stage).is_empty());
    }
}
