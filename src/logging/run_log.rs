//! The per-run log file.
//!
//! Every event at DEBUG and above becomes one line:
//!
//! ```text
//! 2026-10-16T09:41:07.512Z WARN  security.firewall        permission denied ...
//! ```
//!
//! The third column is the unit being reconciled when the event was emitted
//! (taken from the enclosing [`UNIT_SPAN`]), or `-` outside any unit.
//! Control characters in messages are escaped so a multi-line tool error
//! stays on one line.
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::types::{EventFields, PLAN_TARGET, STAGE_TARGET, UNIT_SPAN};
use crate::commands::version::version;

/// Directory holding run logs: `$XDG_CACHE_HOME/provision`, falling back to
/// `~/.cache/provision`.
#[must_use]
pub fn log_dir() -> Option<PathBuf> {
    log_dir_from(std::env::var_os("XDG_CACHE_HOME"), std::env::var_os("HOME"))
}

fn log_dir_from(xdg_cache_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let xdg = xdg_cache_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute());
    let base = match xdg {
        Some(dir) => dir,
        None => PathBuf::from(home.filter(|h| !h.is_empty())?).join(".cache"),
    };
    Some(base.join("provision"))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Unit id stored on a [`UNIT_SPAN`] when it is created.
struct UnitId(String);

/// Layer that appends every event to the run log.
#[derive(Debug)]
pub struct RunLogLayer {
    file: Mutex<File>,
}

impl RunLogLayer {
    /// Truncate `path`, write the run header, and keep it open for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(path: &Path, command: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        writeln!(file, "# provision {} {command} {}", version(), timestamp())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S> Layer<S> for RunLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != UNIT_SPAN {
            return;
        }
        let mut fields = EventFields::default();
        attrs.record(&mut fields);
        if let (Some(span), Some(unit)) = (ctx.span(id), fields.id) {
            span.extensions_mut().insert(UnitId(unit));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        let unit = ctx.event_scope(event).and_then(|mut scope| {
            scope.find_map(|span| span.extensions().get::<UnitId>().map(|u| u.0.clone()))
        });
        let metadata = event.metadata();
        let line = record(
            *metadata.level(),
            metadata.target(),
            unit.as_deref(),
            &fields.message,
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{} {line}", timestamp());
        }
    }
}

/// One run-log record without its timestamp.
fn record(level: Level, target: &str, unit: Option<&str>, message: &str) -> String {
    let tag = match (level, target) {
        (Level::INFO, STAGE_TARGET) => "STAGE",
        (Level::INFO, PLAN_TARGET) => "PLAN",
        (Level::INFO, _) => "INFO",
        (Level::WARN, _) => "WARN",
        (Level::ERROR, _) => "ERROR",
        _ => "DEBUG",
    };
    format!("{tag:<5} {:<24} {}", unit.unwrap_or("-"), single_line(message))
}

fn single_line(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.trim_end().chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
