use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use provision_cli::{cli, commands, logging};
use provision_cli::logging::Log;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match &args.command {
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
        cli::Command::Completions(opts) => {
            commands::completions::run(opts);
            return Ok(());
        }
        _ => {}
    }

    let command = args.command.log_name();
    let log_file = logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(log_file));

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupt);
        let handler_log = Arc::clone(&log);
        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            handler_log.warn("interrupt received; stopping after the current unit");
        })?;
    }

    match &args.command {
        cli::Command::Apply(opts) => commands::apply::run(&args.global, opts, &log, interrupt),
        cli::Command::Plan => commands::plan::run(&args.global, &log, interrupt),
        cli::Command::Validate => commands::validate::run(&args.global, log.as_ref()),
        cli::Command::Version | cli::Command::Completions(_) => Ok(()),
    }
}
