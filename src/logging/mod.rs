//! Logging: a [`Log`] trait for reconcile code, rendered to the console and
//! to a per-run log file through `tracing`.

mod console;
mod logger;
mod run_log;
mod types;

use std::path::PathBuf;

pub use logger::Logger;
pub use types::{Log, UNIT_SPAN};

/// Install the global subscriber and open the run log for `command`.
///
/// The console shows INFO and above (DEBUG with `verbose`; `RUST_LOG`
/// overrides both), warnings and errors on stderr.  The run log at
/// `$XDG_CACHE_HOME/provision/<command>.log` records DEBUG and above
/// whatever the console level.
///
/// Returns the path of the run log, or `None` when it could not be opened.
/// Must be called once, before anything is logged.
pub fn init_subscriber(verbose: bool, command: &str) -> Option<PathBuf> {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_filter = EnvFilter::builder()
        .with_default_directive(
            if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            }
            .into(),
        )
        .from_env_lossy();
    let console = fmt::layer()
        .event_format(console::ConsoleFormat::detect())
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .or_else(std::io::stdout),
        )
        .with_filter(console_filter);

    let (run_log, log_file) = run_log::log_dir()
        .map(|dir| dir.join(format!("{command}.log")))
        .and_then(|path| {
            let layer = run_log::RunLogLayer::create(&path, command).ok()?;
            Some((layer, path))
        })
        .map_or((None, None), |(layer, path)| {
            (Some(layer.with_filter(LevelFilter::DEBUG)), Some(path))
        });

    tracing_subscriber::registry()
        .with(console)
        .with(run_log)
        .init();
    log_file
}

/// A [`Logger`] whose events go to a fresh run log in a temporary directory,
/// through a subscriber installed for the current thread only.
///
/// Keep the returned guard alive for the duration of the test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn capture_run_log() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("test.log");
    let layer = run_log::RunLogLayer::create(&path, "test").expect("open run log");
    let subscriber = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::new(Some(path)), tmp, guard)
}
