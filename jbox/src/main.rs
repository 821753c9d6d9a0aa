//! jbox - Unix tools over structured JSON.
//!
//! `jbox <tool> [args...]`, or a link named `<tool>` / `j<tool>` pointing at
//! this binary.

mod cli;
mod logging;

use cli::Launch;
use jbox_kernel::{CommandRegistry, EXIT_FAILURE, EXIT_USAGE, RunError};
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    let registry = CommandRegistry::new();

    let launch = match Launch::from_argv(&argv, &registry) {
        Ok(launch) => launch,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(launch.verbose);

    let Some(tool) = launch.tool else {
        eprintln!("usage: jbox [-v] <tool> [args...]\n");
        eprintln!("tools: {}", registry.names().join(", "));
        return ExitCode::from(EXIT_USAGE);
    };

    tracing::debug!(tool = %tool, args = ?launch.args, "starting");

    let result = {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        registry.run(&tool, &launch.args, &mut stdin)
    };

    match result {
        Ok(out) => {
            let mut stdout = io::stdout().lock();
            match writeln!(stdout, "{out}").and_then(|()| stdout.flush()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::warn!("failed to write output: {e}");
                    ExitCode::from(EXIT_FAILURE)
                }
            }
        }
        Err(e) => {
            report(&tool, &e, &registry);
            ExitCode::from(e.exit_code())
        }
    }
}

fn report(tool: &str, error: &RunError, registry: &CommandRegistry) {
    match error {
        RunError::UnknownCommand(_) => {
            eprintln!("jbox: {error}");
            eprintln!("tools: {}", registry.names().join(", "));
        }
        RunError::Usage { .. } | RunError::Failed(_) => eprintln!("{tool}: {error}"),
    }
}
