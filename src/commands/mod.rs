//! Subcommand orchestration: catalog loading, unit selection, and the
//! reconcile run shared by `apply` and `plan`.
pub mod apply;
pub mod completions;
pub mod plan;
pub mod validate;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Catalog;
use crate::config::units::ConfigUnit;
use crate::error::ReconcileError;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::reconcile::{Context, Orchestrator, RunReport};
use crate::system::Host;

/// Load and validate the catalog named by the global options.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read, parsed, or validated.
pub fn load_catalog(global: &GlobalOpts, log: &dyn Log) -> Result<Catalog> {
    log.stage("Loading catalog");
    let catalog = Catalog::resolve(global.catalog.as_deref())?.validated()?;
    log.info(&format!(
        "loaded {} unit(s) from {}",
        catalog.units.len(),
        catalog.origin
    ));
    Ok(catalog)
}

/// The user's home directory.
///
/// # Errors
///
/// Returns an error if `$HOME` is not set.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .context("HOME environment variable not set")
}

/// Units selected by `--only` / `--skip`, logging how many were kept.
#[must_use]
pub fn select<'c>(catalog: &'c Catalog, global: &GlobalOpts, log: &dyn Log) -> Vec<&'c ConfigUnit> {
    let units = catalog.select(&global.only, &global.skip);
    if units.len() < catalog.units.len() {
        log.info(&format!(
            "selected {} of {} unit(s)",
            units.len(),
            catalog.units.len()
        ));
    }
    units
}

/// Reconcile `units` and print the summary.
///
/// The report is returned even when the run stopped early so callers can
/// persist it before surfacing the error.
pub fn reconcile(
    ctx: &Context,
    units: &[&ConfigUnit],
    log_file: Option<&Path>,
) -> (RunReport, Result<(), ReconcileError>) {
    let title = if ctx.dry_run {
        "Planning changes"
    } else {
        "Reconciling"
    };
    ctx.log.stage(title);
    let mut orchestrator = Orchestrator::new(ctx);
    let result = orchestrator.run(units);
    let report = orchestrator.into_report();
    report.print_summary(ctx.log.as_ref(), log_file);
    (report, result)
}

/// Load the catalog, check the host, and reconcile against the real system.
///
/// # Errors
///
/// Returns an error if the host is not macOS or the catalog is invalid.
/// Reconcile failures are returned inside the tuple alongside the report.
pub fn run_on_host(
    global: &GlobalOpts,
    log: &Arc<Logger>,
    dry_run: bool,
    interrupt: Arc<AtomicBool>,
) -> Result<(RunReport, Result<(), ReconcileError>)> {
    log.info(&format!("provision {}", version::version()));
    Platform::detect().ensure_supported()?;

    let catalog = load_catalog(global, log.as_ref())?;
    let units = select(&catalog, global, log.as_ref());
    let home = home_dir()?;

    let host = Host::system(Arc::new(SystemExecutor), &home);
    let ctx = Context::new(log.clone(), host, home, catalog.base_dir.clone())
        .with_dry_run(dry_run)
        .with_interrupt(interrupt);

    Ok(reconcile(&ctx, &units, log.log_path()))
}
