//! The `sort` command - sort structured values.
//!
//! Without a key, values sort by their natural order
//! (null < boolean < number < string < array < object). With `-k PATH` each
//! value is keyed by the result of a path query:
//! - `sort -k name` - records by their `name` field
//! - `sort -k '$.stats[0]'` - by the first element of `stats`
//!
//! The sort is stable and `-r` only flips the comparison, so values with equal
//! keys keep their input order in both directions.

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed, expect_stdin_array};
use crate::JboxError;
use crate::args::Invocation;
use crate::query::PathQuery;
use jbox_api::Value;
use std::cmp::Ordering;

pub struct SortCommand;

struct SortOptions {
    key: Option<PathQuery>,
    reverse: bool,
}

impl SortOptions {
    fn parse(invocation: &Invocation) -> Result<Self, JboxError> {
        let key = invocation
            .param_str(&["k", "key"])?
            .map(|source| PathQuery::parse(&source))
            .transpose()?;
        Ok(SortOptions {
            key,
            reverse: invocation.flag(&["r", "reverse"]),
        })
    }
}

/// The sort key of `item`: Null without matches, the match itself when
/// there is one, an array of all matches otherwise.
fn sort_key(query: &PathQuery, item: &Value) -> Value {
    let mut found = query.select(item);
    match found.len() {
        0 => Value::Null,
        1 => found.remove(0).clone(),
        _ => Value::Array(found.into_iter().cloned().collect()),
    }
}

fn sort_values(items: Vec<Value>, opts: &SortOptions) -> Vec<Value> {
    let direction = |ord: Ordering| if opts.reverse { ord.reverse() } else { ord };

    match &opts.key {
        None => {
            let mut items = items;
            items.sort_by(|a, b| direction(a.cmp(b)));
            items
        }
        Some(query) => {
            let mut keyed: Vec<(Value, Value)> = items
                .into_iter()
                .map(|item| (sort_key(query, &item), item))
                .collect();
            keyed.sort_by(|a, b| direction(a.0.cmp(&b.0)));
            keyed.into_iter().map(|(_, item)| item).collect()
        }
    }
}

impl JboxCommand for SortCommand {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn usage(&self) -> &'static str {
        "usage: sort [-k PATH] [-r] [values...]\n\n\
         Sorts its arguments, or the array on stdin.\n\
         \x20 -k, --key PATH   sort by the result of a JSONPath query\n\
         \x20 -r, --reverse    reverse the order (ties keep input order)"
    }

    fn switches(&self) -> &'static [&'static str] {
        &["r", "reverse"]
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        SortOptions::parse(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = SortOptions::parse(ctx.invocation)?;
        let items = ctx.invocation.positional().to_vec();
        Ok(Some(value(sort_values(items, &opts))))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        let opts = SortOptions::parse(ctx.invocation)?;
        let items = expect_stdin_array(self.name(), ctx.read_stdin_value()?)?;
        Ok(value(sort_values(items, &opts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{arb_small_value, json, run_json, run_tool};
    use proptest::prelude::*;

    fn opts(key: Option<&str>, reverse: bool) -> SortOptions {
        SortOptions {
            key: key.map(|k| PathQuery::parse(k).unwrap()),
            reverse,
        }
    }

    #[test]
    fn test_natural_order_across_kinds() {
        let out = run_json(&SortCommand, &[], r#"[{"a":1},[1],"b",2,true,null,1.5,"a"]"#);
        assert_eq!(out, json(r#"[null,true,1.5,2,"a","b",[1],{"a":1}]"#));
    }

    #[test]
    fn test_sort_params() {
        let out = run_json(&SortCommand, &["-r", "3", "1", "2"], "");
        assert_eq!(out, json("[3,2,1]"));
    }

    #[test]
    fn test_sort_by_key() {
        let stdin = r#"[{"n":"c","v":2},{"n":"a","v":3},{"n":"b","v":1}]"#;
        let out = run_json(&SortCommand, &["-k", "v"], stdin);
        assert_eq!(out, json(r#"[{"n":"b","v":1},{"n":"c","v":2},{"n":"a","v":3}]"#));
    }

    #[test]
    fn test_missing_key_sorts_first() {
        let stdin = r#"[{"v":1},{"w":0},{"v":0}]"#;
        let out = run_json(&SortCommand, &["-k", "$.v"], stdin);
        assert_eq!(out, json(r#"[{"w":0},{"v":0},{"v":1}]"#));
    }

    #[test]
    fn test_reverse_keeps_ties_in_input_order() {
        let stdin = r#"[{"k":1,"id":"a"},{"k":2,"id":"b"},{"k":1,"id":"c"},{"k":2,"id":"d"}]"#;
        let out = run_json(&SortCommand, &["-r", "-k", "k"], stdin);
        let ids: Vec<_> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap()["id"].clone())
            .collect();
        assert_eq!(
            ids,
            vec![Value::from("b"), Value::from("d"), Value::from("a"), Value::from("c")]
        );
    }

    #[test]
    fn test_non_array_stdin_is_type_mismatch() {
        let err = run_tool(&SortCommand, &[], r#"{"a":1}"#).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("sort: expected array, received object through stdin"));
    }

    #[test]
    fn test_bad_key_is_usage_error() {
        let err = run_tool(&SortCommand, &["-k", "$[", "1"], "").unwrap_err();
        assert_eq!(err.exit_code(), 254);
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable(
            keys in prop::collection::vec(arb_small_value(), 0..24),
            reverse in any::<bool>(),
        ) {
            let items: Vec<Value> = keys
                .iter()
                .enumerate()
                .map(|(i, k)| json(&format!(r#"{{"k":{},"i":{}}}"#, k.to_json(), i)))
                .collect();
            let sorted = sort_values(items, &opts(Some("k"), reverse));

            for pair in sorted.windows(2) {
                let (a, b) = (pair[0].as_object().unwrap(), pair[1].as_object().unwrap());
                let order = if reverse { b["k"].cmp(&a["k"]) } else { a["k"].cmp(&b["k"]) };
                prop_assert_ne!(order, Ordering::Greater);
                if a["k"] == b["k"] {
                    prop_assert!(a["i"] < b["i"]);
                }
            }
        }

        #[test]
        fn prop_sort_is_permutation(keys in prop::collection::vec(arb_small_value(), 0..24)) {
            let mut expected = keys.clone();
            expected.sort();
            prop_assert_eq!(sort_values(keys, &opts(None, false)), expected);
        }
    }
}
