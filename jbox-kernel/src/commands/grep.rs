//! The `grep` command - select parts of JSON documents with a path query.
//!
//! `grep PATTERN values...` queries each value and returns one result per
//! value; `grep PATTERN` queries the document on stdin. A query that matches
//! exactly once yields the match itself rather than a one-element array, and a
//! single queried value yields its result unwrapped.

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed};
use crate::JboxError;
use crate::args::Invocation;
use crate::query::PathQuery;
use jbox_api::Value;

pub struct GrepCommand;

fn pattern(invocation: &Invocation) -> Result<PathQuery, JboxError> {
    match invocation.positional().first() {
        Some(Value::String(source)) => PathQuery::parse(source),
        Some(other) => PathQuery::parse(&other.to_json()),
        None => Err(JboxError::Usage("grep: missing PATTERN".into())),
    }
}

fn matches(query: &PathQuery, document: &Value) -> Value {
    let mut found: Vec<Value> = query.select(document).into_iter().cloned().collect();
    if found.len() == 1 {
        found.remove(0)
    } else {
        Value::Array(found)
    }
}

impl JboxCommand for GrepCommand {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn usage(&self) -> &'static str {
        "usage: grep PATTERN [values...]\n\nApplies a JSONPath query (e.g. $.items[*].name) to each value, or to the document on stdin."
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        pattern(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let documents = &ctx.invocation.positional()[1..];
        if documents.is_empty() {
            return Ok(None);
        }
        let query = pattern(ctx.invocation)?;
        let mut results: Vec<Value> = documents.iter().map(|doc| matches(&query, doc)).collect();
        if results.len() == 1 {
            return Ok(Some(value(results.remove(0))));
        }
        Ok(Some(value(results)))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        let query = pattern(ctx.invocation)?;
        let document = ctx.read_stdin_value()?;
        Ok(value(matches(&query, &document)))
    }
}
