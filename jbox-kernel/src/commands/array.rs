//! The `array` and `unarray` commands - pack values into an array and back.
//!
//! `array` reads newline-delimited JSON from stdin; `unarray` writes it, so
//! `unarray | array` reproduces the original array.

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed, expect_stdin_array, require_kind};
use crate::JboxError;
use crate::args::Invocation;
use anyhow::Context;
use jbox_api::{Kind, Value};

pub struct ArrayCommand;

impl JboxCommand for ArrayCommand {
    fn name(&self) -> &'static str {
        "array"
    }

    fn usage(&self) -> &'static str {
        "usage: array [values...]\n\nPacks its arguments, or newline-delimited JSON on stdin, into an array."
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
        let text = ctx.read_stdin_text()?;
        let items = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                Value::from_json_str(line)
                    .with_context(|| format!("invalid JSON on line {}", n + 1))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(value(items))
    }
}

pub struct UnarrayCommand;

impl JboxCommand for UnarrayCommand {
    fn name(&self) -> &'static str {
        "unarray"
    }

    fn usage(&self) -> &'static str {
        "usage: unarray [arrays...]\n\nConcatenates array arguments, or unpacks the array on stdin one item per line."
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        require_kind(self.name(), invocation, Kind::Array)
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let joined: Vec<Value> = ctx
            .invocation
            .positional()
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .cloned()
            .collect();
        Ok(Some(value(joined)))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        let items = expect_stdin_array(self.name(), ctx.read_stdin_value()?)?;
        Ok(Output::Lines(items.iter().map(Value::to_json).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{json, run_json, run_tool};

    #[test]
    fn test_array_of_params() {
        let out = run_json(&ArrayCommand, &["a", "1", ":null", r#":{"k":[]}"#], "");
        assert_eq!(out, json(r#"["a",1,null,{"k":[]}]"#));
    }

    #[test]
    fn test_array_of_stdin_lines() {
        let out = run_json(&ArrayCommand, &[], "{\"a\":1}\n\n2\n\"x\"\n");
        assert_eq!(out, json(r#"[{"a":1},2,"x"]"#));
    }

    #[test]
    fn test_array_reports_bad_line() {
        let err = run_tool(&ArrayCommand, &[], "1\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_unarray_params_concatenate() {
        let out = run_json(&UnarrayCommand, &[":[1,2]", ":[]", r#":["a"]"#], "");
        assert_eq!(out, json(r#"[1,2,"a"]"#));
    }

    #[test]
    fn test_unarray_stdin_lines() {
        let out = run_tool(&UnarrayCommand, &[], r#"[1,{"a":"b"},"s"]"#).unwrap();
        assert_eq!(out, "1\n{\"a\":\"b\"}\n\"s\"");
    }

    #[test]
    fn test_unarray_then_array_round_trip() {
        let doc = r#"[1,{"a":[true,null]},"s"]"#;
        let lines = run_tool(&UnarrayCommand, &[], doc).unwrap();
        assert_eq!(run_json(&ArrayCommand, &[], &lines), json(doc));
    }

    #[test]
    fn test_unarray_rejects_non_arrays() {
        let err = run_tool(&UnarrayCommand, &["x"], "").unwrap_err();
        assert_eq!(err.exit_code(), 254);
        let err = run_tool(&UnarrayCommand, &[], "{}").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
