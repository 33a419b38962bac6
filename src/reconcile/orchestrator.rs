//! Sequential reconcile loop.
//!
//! Units run strictly in catalog order.  For each unit the orchestrator
//! probes, diffs, and (outside a dry run) applies, then hands any failure to
//! the [`tolerance`](super::tolerance) layer.  A fatal failure stops the
//! loop immediately; every other outcome moves on to the next unit.
//!
//! Services named by `restarts` are restarted once, after the last selected
//! unit naming them, and only if at least one of those units was applied.
use std::collections::{BTreeSet, HashMap};

use super::tolerance::{self, Resolution};
use super::{Context, Outcome, Phase, RunReport, Step};
use crate::config::units::{ConfigUnit, InstallerCheck, UnitSpec};
use crate::error::ReconcileError;
use crate::logging::UNIT_SPAN;
use crate::resources::bundle::BundleResource;
use crate::resources::dock::DockResource;
use crate::resources::file::{FileResource, FileSource};
use crate::resources::installer::{InstallerResource, Presence};
use crate::resources::login_item::LoginItemResource;
use crate::resources::plugin::PluginResource;
use crate::resources::preference::PreferenceResource;
use crate::resources::{Drift as _, Resource, ResourceError};

/// Tracks which services still need a restart and when they are due.
#[derive(Debug, Default)]
struct RestartPlan {
    /// Index of the last selected unit naming each service.
    last_unit: HashMap<String, usize>,
    /// Services with at least one applied unit, awaiting restart.
    dirty: BTreeSet<String>,
}

impl RestartPlan {
    fn new(units: &[&ConfigUnit]) -> Self {
        let last_unit = units
            .iter()
            .enumerate()
            .filter_map(|(i, u)| u.restarts.as_ref().map(|s| (s.clone(), i)))
            .collect();
        Self {
            last_unit,
            dirty: BTreeSet::new(),
        }
    }

    /// Note a processed unit; returns the service if its restart is now due.
    fn processed(&mut self, index: usize, unit: &ConfigUnit, outcome: Outcome) -> Option<String> {
        let service = unit.restarts.as_ref()?;
        if matches!(outcome, Outcome::Applied | Outcome::WouldApply) {
            self.dirty.insert(service.clone());
        }
        if self.last_unit.get(service) == Some(&index) && self.dirty.remove(service) {
            return Some(service.clone());
        }
        None
    }

    /// Services still owed a restart when the run stops early.
    fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

/// Drives units through probe, diff, and apply.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    ctx: &'a Context,
    phase: Phase,
    report: RunReport,
    restarts: RestartPlan,
}

impl<'a> Orchestrator<'a> {
    /// Create an idle orchestrator.
    #[must_use]
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            phase: Phase::Idle,
            report: RunReport::new(ctx.dry_run),
            restarts: RestartPlan::default(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Consume the orchestrator, yielding its report.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Reconcile `units` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Fatal`] when a unit fails in a way the
    /// tolerance layer does not downgrade, and
    /// [`ReconcileError::Interrupted`] when an interrupt arrives between
    /// units.  Either way the report covers every unit processed so far and
    /// services owed a restart have been restarted.
    pub fn run(&mut self, units: &[&ConfigUnit]) -> Result<(), ReconcileError> {
        self.restarts = RestartPlan::new(units);
        let mode = if self.ctx.dry_run { " (dry run)" } else { "" };
        self.ctx
            .log
            .debug(&format!("reconciling {} unit(s){mode}", units.len()));

        for (index, unit) in units.iter().enumerate() {
            if self.ctx.is_interrupted() {
                let remaining = units.len() - index;
                self.ctx
                    .log
                    .warn(&format!("interrupted before {}", unit.id));
                self.report.interrupted = true;
                self.flush_restarts();
                self.enter("run", Phase::Done);
                return Err(ReconcileError::Interrupted { remaining });
            }

            let outcome = match self.process(unit) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.ctx.log.error(&err.to_string());
                    self.report.record(
                        unit,
                        Resolution {
                            outcome: Outcome::FailedFatal,
                            detail: Some(err.to_string()),
                            warning: None,
                        },
                    );
                    self.flush_restarts();
                    self.enter("run", Phase::Done);
                    return Err(err);
                }
            };

            if let Some(service) = self.restarts.processed(index, unit, outcome) {
                self.enter(&unit.id, Phase::ServiceRestartPending);
                self.restart(&service);
            }
            self.enter(&unit.id, Phase::Idle);
        }

        self.enter("run", Phase::Done);
        Ok(())
    }

    /// Run one unit to a terminal outcome and record it.
    fn process(&mut self, unit: &ConfigUnit) -> Result<Outcome, ReconcileError> {
        let _unit = tracing::info_span!(UNIT_SPAN, id = %unit.id).entered();
        self.enter(&unit.id, Phase::ProbePending);

        let resolution = match self.unmet_dependency(unit) {
            Some(dep) => Resolution::blocked(&unit.id, &dep),
            None => self.dispatch(unit)?,
        };

        if let Some(warning) = &resolution.warning {
            self.ctx.log.warn(warning);
        }
        let outcome = resolution.outcome;
        self.report.record(unit, resolution);
        Ok(outcome)
    }

    /// First dependency of `unit` that ran in this run without completing.
    ///
    /// Dependencies filtered out of the run are assumed satisfied.
    fn unmet_dependency(&self, unit: &ConfigUnit) -> Option<String> {
        unit.depends_on
            .iter()
            .find(|dep| {
                self.report
                    .outcome_of(dep)
                    .is_some_and(|o| !o.is_complete())
            })
            .cloned()
    }

    /// Build the resource for a unit's domain and reconcile it.
    fn dispatch(&mut self, unit: &ConfigUnit) -> Result<Resolution, ReconcileError> {
        let ctx = self.ctx;
        let host = &ctx.host;
        match &unit.spec {
            UnitSpec::Preference(pref) => self.reconcile(
                unit,
                &PreferenceResource::new(pref, host.preferences.as_ref(), unit.requires_privilege),
            ),
            UnitSpec::DockEntry(spec) => self.reconcile(
                unit,
                &DockResource::new(spec.entry(&ctx.home), spec.section, host.dock.as_ref()),
            ),
            UnitSpec::PluginVersions(set) => {
                self.reconcile(unit, &PluginResource::new(set, host.versions.as_ref()))
            }
            UnitSpec::LoginItem(item) => self.reconcile(
                unit,
                &LoginItemResource::new(item, ctx.expand(&item.path), host.login_items.as_ref()),
            ),
            UnitSpec::PackageManifest(spec) => self.reconcile(
                unit,
                &BundleResource::new(ctx.resolve(&spec.manifest), host.executor.as_ref()),
            ),
            UnitSpec::Installer(spec) => {
                let presence = match &spec.check {
                    InstallerCheck::Program(program) => Presence::Program(program.clone()),
                    InstallerCheck::Path(path) => Presence::Path(ctx.expand(path)),
                };
                self.reconcile(
                    unit,
                    &InstallerResource::new(presence, &spec.command, host.executor.as_ref()),
                )
            }
            UnitSpec::File(spec) => {
                let source = match (&spec.content, &spec.source) {
                    (Some(text), _) => FileSource::Inline(text.clone()),
                    (None, Some(path)) => FileSource::Path(ctx.resolve(path)),
                    (None, None) => {
                        return tolerance::classify_error(
                            unit,
                            Step::Probe,
                            ResourceError::InvalidState {
                                resource: spec.target.clone(),
                                reason: "file unit has neither source nor content".to_string(),
                            },
                        );
                    }
                };
                self.reconcile(unit, &FileResource::new(source, ctx.expand(&spec.target)))
            }
        }
    }

    /// Probe, diff, and apply one resource under the tolerance layer.
    fn reconcile<R: Resource>(
        &mut self,
        unit: &ConfigUnit,
        resource: &R,
    ) -> Result<Resolution, ReconcileError> {
        let current = match resource.probe() {
            Ok(current) => current,
            Err(err) => return self.tolerate(unit, Step::Probe, err),
        };
        let drift = resource.diff(&current);
        self.enter(&unit.id, Phase::Diffed);

        if !drift.needs_change() {
            self.enter(&unit.id, Phase::Satisfied);
            self.ctx.log.debug(&format!("{}: already satisfied", unit.id));
            return Ok(Resolution::satisfied());
        }

        let diff = drift.to_string();
        if self.ctx.dry_run {
            self.ctx.log.dry_run(&format!(
                "{}: would apply {} ({diff})",
                unit.id,
                resource.description()
            ));
            return Ok(Resolution::would_apply(diff));
        }

        self.enter(&unit.id, Phase::Applying);
        self.ctx
            .log
            .info(&format!("{}: {} ({diff})", unit.id, resource.description()));
        match resource.apply(&drift) {
            Ok(change) => {
                let resolution = tolerance::classify_change(unit, change, &diff);
                self.enter(&unit.id, Phase::Applied);
                Ok(resolution)
            }
            Err(err) => self.tolerate(unit, Step::Apply, err),
        }
    }

    /// Classify a failure, moving to the matching terminal phase.
    fn tolerate(
        &mut self,
        unit: &ConfigUnit,
        step: Step,
        err: ResourceError,
    ) -> Result<Resolution, ReconcileError> {
        match tolerance::classify_error(unit, step, err) {
            Ok(resolution) => {
                if resolution.outcome == Outcome::SkippedPrivilege {
                    self.enter(&unit.id, Phase::SkippedPrivilege);
                }
                Ok(resolution)
            }
            Err(fatal) => {
                self.enter(&unit.id, Phase::FailedFatal);
                Err(fatal)
            }
        }
    }

    /// Restart every service still owed one.
    fn flush_restarts(&mut self) {
        for service in self.restarts.drain() {
            self.enter("run", Phase::ServiceRestartPending);
            self.restart(&service);
        }
    }

    fn restart(&mut self, service: &str) {
        if self.ctx.dry_run {
            self.ctx.log.dry_run(&format!("would restart {service}"));
            self.report.restarts.push(service.to_string());
            return;
        }
        match self.ctx.host.services.restart(service) {
            Ok(()) => {
                self.ctx.log.info(&format!("restarted {service}"));
                self.report.restarts.push(service.to_string());
            }
            Err(err) => {
                let warning = format!("could not restart {service}: {err}");
                self.ctx.log.warn(&warning);
                self.report.warnings.push(warning);
            }
        }
    }

    fn enter(&mut self, subject: &str, next: Phase) {
        self.ctx
            .log
            .debug(&format!("{subject}: {} -> {next}", self.phase));
        self.phase = next;
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::config::Catalog;
    use crate::config::test_helpers::catalog;
    use crate::config::units::{Arrangement, DisplayAs, DockEntry, DockSection, ShowAs, TileKind};
    use crate::exec::test_helpers::MockExecutor;
    use crate::logging::test_helpers::{Level, RecordingLog};
    use crate::resources::dock::{decode, encode};
    use crate::system::fake::{FakeHost, FakeLoginItems, FakeVersions};

    struct Harness {
        fake: FakeHost,
        log: Arc<RecordingLog>,
        home: tempfile::TempDir,
    }

    impl Harness {
        fn new(fake: FakeHost) -> Self {
            Self {
                fake,
                log: Arc::new(RecordingLog::default()),
                home: tempfile::tempdir().unwrap(),
            }
        }

        fn ctx(&self, dry_run: bool) -> Context {
            Context::new(
                self.log.clone(),
                self.fake.host(),
                self.home.path().to_path_buf(),
                PathBuf::from("/catalog"),
            )
            .with_dry_run(dry_run)
        }

        fn run(&self, catalog: &Catalog, dry_run: bool) -> (Result<(), ReconcileError>, RunReport) {
            let ctx = self.ctx(dry_run);
            let units: Vec<&ConfigUnit> = catalog.units.iter().collect();
            let mut orchestrator = Orchestrator::new(&ctx);
            let result = orchestrator.run(&units);
            assert_eq!(orchestrator.phase(), Phase::Done);
            (result, orchestrator.into_report())
        }
    }

    const DOCK_AND_FINDER: &str = r#"
[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = true
restarts = "Dock"

[[unit]]
id = "finder.path-bar"
kind = "preference"
domain = "com.apple.finder"
key = "ShowPathbar"
value = true
restarts = "Finder"

[[unit]]
id = "dock.tile-size"
kind = "preference"
domain = "com.apple.dock"
key = "tilesize"
value = 48
restarts = "Dock"

[[unit]]
id = "dock.downloads-stack"
kind = "dock-entry"
url = "file:///Users/x/Downloads/"
arrangement = "date-created"
display-as = "folder"
show-as = "fan"
restarts = "Dock"
"#;

    fn outcomes(report: &RunReport) -> Vec<(String, Outcome)> {
        report
            .units
            .iter()
            .map(|u| (u.id.clone(), u.outcome))
            .collect()
    }

    // ------------------------------------------------------------------
    // Idempotence
    // ------------------------------------------------------------------

    #[test]
    fn second_run_is_satisfied_everywhere() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(DOCK_AND_FINDER);

        let (first, report1) = h.run(&c, false);
        first.unwrap();
        assert!(report1.units.iter().all(|u| u.outcome == Outcome::Applied));

        let (second, report2) = h.run(&c, false);
        second.unwrap();
        assert!(
            report2.units.iter().all(|u| u.outcome == Outcome::Satisfied),
            "{:?}",
            outcomes(&report2)
        );
        assert!(report2.restarts.is_empty());
    }

    #[test]
    fn downloads_stack_applied_once_then_satisfied() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(DOCK_AND_FINDER);

        h.run(&c, false).0.unwrap();
        let writes_after_first = h.fake.dock.writes();
        assert_eq!(writes_after_first, 1);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(
            report.outcome_of("dock.downloads-stack"),
            Some(Outcome::Satisfied)
        );
        assert_eq!(h.fake.dock.writes(), writes_after_first);

        let entries = h.fake.dock.entries(DockSection::Others);
        let matching: Vec<_> = entries
            .iter()
            .filter_map(decode)
            .filter(|e| e.url == "file:///Users/x/Downloads/")
            .collect();
        assert_eq!(matching.len(), 1, "exactly one downloads tile");
    }

    #[test]
    fn ghost_tiles_are_purged_while_installing() {
        let h = Harness::new(FakeHost::default());
        let ghost = {
            let mut dict = plist::Dictionary::new();
            dict.insert("tile-type".into(), "directory-tile".into());
            plist::Value::Dictionary(dict)
        };
        let unrelated = encode(&DockEntry {
            url: "file:///Applications/".to_string(),
            tile: TileKind::Directory,
            arrangement: Arrangement::Name,
            display_as: DisplayAs::Stack,
            show_as: ShowAs::Grid,
        });
        h.fake
            .dock
            .seed(DockSection::Others, vec![ghost, unrelated.clone()]);

        let c = catalog(DOCK_AND_FINDER);
        h.run(&c, false).0.unwrap();

        let entries = h.fake.dock.entries(DockSection::Others);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], unrelated);
        assert_eq!(
            decode(&entries[1]).unwrap().url,
            "file:///Users/x/Downloads/"
        );
    }

    // ------------------------------------------------------------------
    // Service restarts
    // ------------------------------------------------------------------

    #[test]
    fn each_service_restarts_once_after_its_last_unit() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(DOCK_AND_FINDER);
        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(h.fake.services.restarts(), vec!["Finder", "Dock"]);
        assert_eq!(report.restarts, vec!["Finder", "Dock"]);
    }

    #[test]
    fn service_not_restarted_when_nothing_changed() {
        let h = Harness::new(FakeHost::default());
        h.fake.preferences.set("com.apple.finder", "ShowPathbar", "1");
        let c = catalog(DOCK_AND_FINDER);
        h.run(&c, false).0.unwrap();
        assert_eq!(h.fake.services.restarts(), vec!["Dock"]);
    }

    // ------------------------------------------------------------------
    // Dry run
    // ------------------------------------------------------------------

    #[test]
    fn dry_run_mutates_nothing() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(DOCK_AND_FINDER);
        let (result, report) = h.run(&c, true);
        result.unwrap();

        assert!(report.dry_run);
        assert!(report.units.iter().all(|u| u.outcome == Outcome::WouldApply));
        assert_eq!(h.fake.preferences.writes(), 0);
        assert_eq!(h.fake.dock.writes(), 0);
        assert!(h.fake.services.restarts().is_empty());
        assert_eq!(report.restarts, vec!["Finder", "Dock"]);
        assert!(h.log.contains(Level::DryRun, "would restart Dock"));
        assert!(h.log.contains(Level::DryRun, "dock.autohide: would apply"));
    }

    // ------------------------------------------------------------------
    // Tolerance: privilege vs fatal
    // ------------------------------------------------------------------

    const PRIVILEGED: &str = r#"
[[unit]]
id = "security.firewall"
kind = "preference"
domain = "/Library/Preferences/com.apple.alf"
key = "globalstate"
value = 1
requires-privilege = true

[[unit]]
id = "keyboard.repeat"
kind = "preference"
domain = "NSGlobalDomain"
key = "KeyRepeat"
value = 2
"#;

    #[test]
    fn privilege_denied_is_skipped_and_run_continues() {
        let h = Harness::new(FakeHost::default());
        h.fake.preferences.deny("/Library/Preferences/com.apple.alf");
        let c = catalog(PRIVILEGED);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(
            outcomes(&report),
            vec![
                ("security.firewall".to_string(), Outcome::SkippedPrivilege),
                ("keyboard.repeat".to_string(), Outcome::Applied),
            ]
        );
        assert!(
            report.units[0]
                .detail
                .as_deref()
                .unwrap()
                .contains("sudo defaults write")
        );
        assert!(h.log.contains(Level::Warn, "security.firewall"));
    }

    #[test]
    fn unexpected_failure_halts_before_later_units() {
        let fake = FakeHost::with_executor(
            MockExecutor::with_responses(vec![
                (false, "", "brew bundle can't satisfy your Brewfile's dependencies."),
                (false, "", "Error: Invalid Brewfile syntax"),
            ])
            .with_available(&["brew"]),
        );
        let h = Harness::new(fake);
        let manifest = h.home.path().join("Brewfile");
        std::fs::write(&manifest, "brew \"jq\"\n").unwrap();
        let c = catalog(&format!(
            r#"
[[unit]]
id = "packages.brewfile"
kind = "package-manifest"
manifest = "{}"

[[unit]]
id = "keyboard.repeat"
kind = "preference"
domain = "NSGlobalDomain"
key = "KeyRepeat"
value = 2
"#,
            manifest.display()
        ));

        let (result, report) = h.run(&c, false);
        match result.unwrap_err() {
            ReconcileError::Fatal { unit, step, .. } => {
                assert_eq!(unit, "packages.brewfile");
                assert_eq!(step, "apply");
            }
            other => panic!("expected fatal, got {other:?}"),
        }
        assert_eq!(
            outcomes(&report),
            vec![("packages.brewfile".to_string(), Outcome::FailedFatal)]
        );
        assert_eq!(h.fake.preferences.writes(), 0, "later unit never ran");
    }

    #[test]
    fn fatal_failure_still_restarts_services_already_changed() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(
            r#"
[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = true
restarts = "Dock"

[[unit]]
id = "shell.zshrc"
kind = "file"
target = "/nonexistent-root-dir/.zshrc"

[[unit]]
id = "dock.tile-size"
kind = "preference"
domain = "com.apple.dock"
key = "tilesize"
value = 48
restarts = "Dock"
"#,
        );
        let (result, report) = h.run(&c, false);
        assert!(matches!(result, Err(ReconcileError::Fatal { .. })));
        assert_eq!(h.fake.services.restarts(), vec!["Dock"]);
        assert_eq!(report.count(Outcome::Applied), 1);
    }

    // ------------------------------------------------------------------
    // Dependencies and unavailable tools
    // ------------------------------------------------------------------

    const RUNTIMES: &str = r#"
[[unit]]
id = "tools.asdf"
kind = "installer"
check = { program = "asdf" }
command = ["brew", "install", "asdf"]

[[unit]]
id = "runtimes.nodejs"
kind = "plugin-versions"
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = ["18.19.0", "20.11.0"]
depends-on = ["tools.asdf"]

[[unit]]
id = "login.rectangle"
kind = "login-item"
name = "Rectangle"
path = "/Applications/Rectangle.app"
"#;

    #[test]
    fn missing_tool_skips_unit_and_its_dependants() {
        let fake = FakeHost::with_executor(MockExecutor::default())
            .with_versions(FakeVersions::unavailable());
        let h = Harness::new(fake);
        let c = catalog(RUNTIMES);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(
            report.outcome_of("tools.asdf"),
            Some(Outcome::SkippedUnavailable)
        );
        assert_eq!(
            report.outcome_of("runtimes.nodejs"),
            Some(Outcome::SkippedUnavailable)
        );
        assert!(
            report.units[1]
                .detail
                .as_deref()
                .unwrap()
                .contains("dependency 'tools.asdf'")
        );
        assert!(report.outcome_of("login.rectangle").is_some());
    }

    #[test]
    fn plugin_versions_installed_and_global_set_to_last() {
        let fake = FakeHost::with_executor(MockExecutor::default().with_available(&["asdf"]));
        let h = Harness::new(fake);
        let c = catalog(RUNTIMES);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(report.outcome_of("tools.asdf"), Some(Outcome::Satisfied));
        assert_eq!(
            report.outcome_of("runtimes.nodejs"),
            Some(Outcome::Applied)
        );
        assert_eq!(h.fake.versions.installed("nodejs"), vec!["18.19.0", "20.11.0"]);
        assert_eq!(h.fake.versions.global("nodejs").as_deref(), Some("20.11.0"));

        let (_, second) = h.run(&c, false);
        assert_eq!(
            second.outcome_of("runtimes.nodejs"),
            Some(Outcome::Satisfied)
        );
        assert_eq!(h.fake.versions.global_sets(), 1);
    }

    #[test]
    fn partial_version_failure_is_applied_with_warning() {
        let versions = FakeVersions::default();
        versions.fail_install("18.19.0");
        let fake = FakeHost::with_executor(MockExecutor::default().with_available(&["asdf"]))
            .with_versions(versions);
        let h = Harness::new(fake);
        let c = catalog(RUNTIMES);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(
            report.outcome_of("runtimes.nodejs"),
            Some(Outcome::Applied)
        );
        assert_eq!(h.fake.versions.installed("nodejs"), vec!["20.11.0"]);
        assert_eq!(h.fake.versions.global("nodejs").as_deref(), Some("20.11.0"));
        assert!(h.log.contains(Level::Warn, "18.19.0"));
    }

    #[test]
    fn login_item_without_automation_consent_is_skipped() {
        let fake = FakeHost::with_executor(MockExecutor::default().with_available(&["asdf"]))
            .with_login_items(FakeLoginItems::denied());
        let h = Harness::new(fake);
        let c = catalog(RUNTIMES);

        let (result, report) = h.run(&c, false);
        result.unwrap();
        assert_eq!(
            report.outcome_of("login.rectangle"),
            Some(Outcome::SkippedPrivilege)
        );
    }

    // ------------------------------------------------------------------
    // Interrupt
    // ------------------------------------------------------------------

    #[test]
    fn interrupt_stops_before_next_unit() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(DOCK_AND_FINDER);
        let ctx = h.ctx(false);
        ctx.interrupted.store(true, Ordering::SeqCst);
        let units: Vec<&ConfigUnit> = c.units.iter().collect();

        let mut orchestrator = Orchestrator::new(&ctx);
        let err = orchestrator.run(&units).unwrap_err();
        assert!(matches!(err, ReconcileError::Interrupted { remaining: 4 }));
        let report = orchestrator.into_report();
        assert!(report.interrupted);
        assert!(report.units.is_empty());
        assert_eq!(h.fake.preferences.writes(), 0);
    }

    #[test]
    fn phase_transitions_are_logged_at_debug() {
        let h = Harness::new(FakeHost::default());
        let c = catalog(PRIVILEGED);
        h.run(&c, false).0.unwrap();
        assert!(h.log.contains(Level::Debug, "keyboard.repeat: Idle -> ProbePending"));
        assert!(h.log.contains(Level::Debug, "keyboard.repeat: Diffed -> Applying"));
        assert!(h.log.contains(Level::Debug, "run: Idle -> Done"));
    }

    #[test]
    fn run_log_attributes_events_to_their_unit() {
        let (logger, _tmp, _guard) = crate::logging::capture_run_log();
        let path = logger.log_path().unwrap().to_path_buf();
        let fake = FakeHost::default();
        let ctx = Context::new(
            Arc::new(logger),
            fake.host(),
            PathBuf::from("/Users/x"),
            PathBuf::from("/catalog"),
        );
        let c = catalog(DOCK_AND_FINDER);
        let units: Vec<&ConfigUnit> = c.units.iter().collect();
        Orchestrator::new(&ctx).run(&units).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let in_unit = |id: &str, needle: &str| {
            text.lines()
                .any(|l| l.split_whitespace().nth(2) == Some(id) && l.contains(needle))
        };
        assert!(in_unit("finder.path-bar", "finder.path-bar: Idle -> ProbePending"));
        assert!(in_unit("dock.downloads-stack", "Diffed -> Applying"));
        assert!(in_unit("-", "run: Idle -> Done"));
        assert!(!in_unit("dock.autohide", "finder.path-bar"));
    }
}
