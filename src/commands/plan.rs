use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;

/// Run the plan command: probe and diff every selected unit, never mutate.
///
/// # Errors
///
/// Returns an error if the host is unsupported, the catalog is invalid, a
/// probe fails fatally, or the run is interrupted.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>, interrupt: Arc<AtomicBool>) -> Result<()> {
    let (_, result) = super::run_on_host(global, log, true, interrupt)?;
    result?;
    Ok(())
}
