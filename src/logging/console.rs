//! Terminal rendering of log events.
use std::fmt;
use std::io::IsTerminal as _;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::types::{EventFields, PLAN_TARGET, STAGE_TARGET};

/// Console event format: `==>` stage headers, indented progress, `~` for
/// planned changes, and labelled warnings and errors.
///
/// Colour is used only on a terminal and only when `NO_COLOR` is unset.
#[derive(Debug, Clone, Copy)]
pub(super) struct ConsoleFormat {
    color: bool,
}

impl ConsoleFormat {
    pub(super) fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self {
            color: !no_color && std::io::stdout().is_terminal(),
        }
    }

    fn paint(self, sgr: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{sgr}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn render(self, level: Level, target: &str, msg: &str) -> String {
        match (level, target) {
            (Level::ERROR, _) => format!("{} {msg}", self.paint("1;31", "error:")),
            (Level::WARN, _) => format!("{} {msg}", self.paint("1;33", "warning:")),
            (Level::INFO, STAGE_TARGET) => {
                format!("{} {}", self.paint("1;34", "==>"), self.paint("1", msg))
            }
            (Level::INFO, PLAN_TARGET) => format!("  {} {msg}", self.paint("33", "~")),
            (Level::INFO, _) => format!("  {msg}"),
            _ => format!("  {}", self.paint("2", msg)),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        let metadata = event.metadata();
        writeln!(
            writer,
            "{}",
            self.render(*metadata.level(), metadata.target(), &fields.message)
        )
    }
}
