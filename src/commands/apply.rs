use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::cli::{ApplyOpts, GlobalOpts};
use crate::logging::{Log, Logger};

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if the host is unsupported, the catalog is invalid, a
/// unit fails fatally, or the run is interrupted.
pub fn run(
    global: &GlobalOpts,
    opts: &ApplyOpts,
    log: &Arc<Logger>,
    interrupt: Arc<AtomicBool>,
) -> Result<()> {
    let (report, result) = super::run_on_host(global, log, global.dry_run, interrupt)?;

    if let Some(path) = &opts.json {
        report.write_json(path)?;
        log.info(&format!("report written to {}", path.display()));
    }

    result?;
    Ok(())
}
