//! Drives one tool through its lifecycle.

use super::{CommandContext, InputMode, JboxCommand, Output};
use crate::JboxError;
use crate::args::Invocation;
use std::io::BufRead;
use thiserror::Error;
use tracing::debug;

/// Exit status for usage failures (-2 as an unsigned byte).
pub const EXIT_USAGE: u8 = 254;
/// Exit status for fatal errors in the exec stages.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    /// Validation failed; nothing was executed.
    #[error("{reason}\n{usage}")]
    Usage { reason: String, usage: &'static str },

    #[error("unknown tool {0:?}")]
    UnknownCommand(String),

    #[error("{0:#}")]
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for RunError {
    fn from(error: anyhow::Error) -> Self {
        RunError::Failed(error)
    }
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Usage { .. } | RunError::UnknownCommand(_) => EXIT_USAGE,
            RunError::Failed(_) => EXIT_FAILURE,
        }
    }
}

/// Run `command` over raw `tokens` (program name excluded).
///
/// Returns the rendered output. Opened inputs are dropped before returning,
/// on success and on every error path.
pub fn run(
    command: &dyn JboxCommand,
    tokens: &[String],
    stdin: &mut dyn BufRead,
) -> Result<String, RunError> {
    let name = command.name();
    let invocation = Invocation::parse_with_switches(tokens, command.switches())
        .map_err(anyhow::Error::from)?;
    debug!(
        command = name,
        positional = invocation.positional().len(),
        "parsed invocation"
    );

    let mut seed = command.before_exec(&invocation)?;

    if let Err(e) = command.validate(&invocation, &seed) {
        debug!(command = name, error = %e, "validation failed");
        return Err(RunError::Usage {
            reason: e.to_string(),
            usage: command.usage(),
        });
    }

    let mut ctx = CommandContext {
        invocation: &invocation,
        stdin,
    };

    let output = match command.input_mode() {
        InputMode::ParamsOnly => {
            debug!(command = name, "exec over params");
            command
                .exec_over_params(&mut seed, &mut ctx)?
                .ok_or(JboxError::NoOutput(name))
                .map_err(anyhow::Error::from)?
        }
        InputMode::ParamsOrStdin => {
            let from_params = if invocation.positional().is_empty() {
                None
            } else {
                debug!(command = name, "exec over params");
                command.exec_over_params(&mut seed, &mut ctx)?
            };
            match from_params {
                Some(output) => output,
                None => {
                    debug!(command = name, "exec over stdin");
                    command.exec_over_stdin(&mut seed, &mut ctx)?
                }
            }
        }
    };

    let rendered = command.after_exec(output)?;
    debug!(command = name, bytes = rendered.len(), "after exec");
    Ok(rendered)
}

/// Convenience for commands that always produce a value.
pub(crate) fn value(v: impl Into<jbox_api::Value>) -> Output {
    Output::Value(v.into())
}
