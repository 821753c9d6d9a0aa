//! The `keys` command - list the keys of objects.

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed, require_kind};
use crate::JboxError;
use crate::args::Invocation;
use jbox_api::{Kind, Value};

pub struct KeysCommand;

fn object_keys(map: &jbox_api::Map) -> Value {
    Value::Array(map.keys().map(|k| Value::from(k.as_str())).collect())
}

impl JboxCommand for KeysCommand {
    fn name(&self) -> &'static str {
        "keys"
    }

    fn usage(&self) -> &'static str {
        "usage: keys [objects...]\n\nReturns the keys of each object, or of the object on stdin."
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        require_kind(self.name(), invocation, Kind::Object)
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let keys: Vec<Value> = ctx
            .invocation
            .positional()
            .iter()
            .filter_map(Value::as_object)
            .map(object_keys)
            .collect();
        Ok(Some(value(keys)))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        match ctx.read_stdin_value()? {
            Value::Object(map) => Ok(value(object_keys(&map))),
            other => Err(JboxError::stdin_mismatch(self.name(), Kind::Object, other.kind()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{json, run_json, run_tool};

    #[test]
    fn test_keys_of_params() {
        let out = run_json(&KeysCommand, &[r#":{"b":1,"a":2}"#, r#":{"c":3}"#], "");
        assert_eq!(out, json(r#"[["b","a"],["c"]]"#));
    }

    #[test]
    fn test_keys_of_stdin() {
        let out = run_json(&KeysCommand, &[], r#"{"x":1,"y":{"z":2}}"#);
        assert_eq!(out, json(r#"["x","y"]"#));
    }

    #[test]
    fn test_non_object_param_is_usage_error() {
        let err = run_tool(&KeysCommand, &[":[1]"], "").unwrap_err();
        assert_eq!(err.exit_code(), 254);
        assert!(err.to_string().contains("expected object, received array"));
    }

    #[test]
    fn test_non_object_stdin_is_fatal() {
        let err = run_tool(&KeysCommand, &[], "[1,2]").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("through stdin"));
    }
}
