//! The `prtprn` command - pretty-print JSON.
//!
//! Best used last in a pipeline: `array` expects compact input.

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed};
use anyhow::Context;

pub struct PrtprnCommand;

impl JboxCommand for PrtprnCommand {
    fn name(&self) -> &'static str {
        "prtprn"
    }

    fn usage(&self) -> &'static str {
        "usage: prtprn [values...]\n\nRenders JSON in a human readable form."
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        Ok(Some(value(ctx.invocation.positional().to_vec())))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        Ok(value(ctx.read_stdin_value()?))
    }

    fn after_exec(&self, output: Output) -> anyhow::Result<String> {
        match output {
            Output::Value(v) => v.to_json_pretty().context("failed to render JSON"),
            lines => Ok(lines.render()),
        }
    }
}
