//! Command: generate shell completions.
use std::io::Write;

use clap::CommandFactory;

use crate::cli::{Cli, CompletionsOpts};

/// Write completions for `opts.shell` to `out`.
pub fn generate(opts: &CompletionsOpts, out: &mut dyn Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(opts.shell, &mut command, name, out);
}

/// Print completions to stdout.
pub fn run(opts: &CompletionsOpts) {
    generate(opts, &mut std::io::stdout());
}
