//! The `uniq` command - collapse equal values.
//!
//! Unlike the line-oriented `uniq`, input does not need to be sorted: every
//! value is bucketed by its content fingerprint, so equal values anywhere in
//! the input collapse into one. Buckets keep first-seen order.
//!
//! - `-c` returns an object mapping each value to its count
//! - `-d` keeps only values seen more than once
//! - `-u` keeps only values seen exactly once (ignored with `-d`)

use super::runner::value;
use super::{CommandContext, JboxCommand, Output, Seed, expect_stdin_array};
use crate::args::Invocation;
use indexmap::IndexMap;
use jbox_api::{Fingerprint, Map, Value};

pub struct UniqCommand;

struct UniqOptions {
    count: bool,
    repeated: bool,
    unique_only: bool,
}

impl UniqOptions {
    fn parse(invocation: &Invocation) -> Self {
        UniqOptions {
            count: invocation.flag(&["c", "count"]),
            repeated: invocation.flag(&["d", "repeated"]),
            unique_only: invocation.flag(&["u", "unique"]),
        }
    }

    fn keeps(&self, count: usize) -> bool {
        if self.repeated {
            count > 1
        } else if self.unique_only {
            count == 1
        } else {
            true
        }
    }
}

struct Bucket {
    representative: Value,
    count: usize,
}

fn buckets(items: Vec<Value>) -> IndexMap<Fingerprint, Bucket> {
    let mut buckets: IndexMap<Fingerprint, Bucket> = IndexMap::new();
    for item in items {
        buckets
            .entry(item.fingerprint())
            .and_modify(|b| b.count += 1)
            .or_insert(Bucket {
                representative: item,
                count: 1,
            });
    }
    buckets
}

/// Object key used for a value under `-c`.
fn count_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_json(),
    }
}

fn uniq_values(items: Vec<Value>, opts: &UniqOptions) -> Value {
    let kept = buckets(items)
        .into_values()
        .filter(|bucket| opts.keeps(bucket.count));

    if opts.count {
        let mut counts = Map::new();
        for bucket in kept {
            let slot = counts
                .entry(count_key(&bucket.representative))
                .or_insert(Value::Int(0));
            let total = slot.as_i64().unwrap_or(0) + bucket.count as i64;
            *slot = Value::Int(total);
        }
        Value::Object(counts)
    } else {
        Value::Array(kept.map(|bucket| bucket.representative).collect())
    }
}

impl JboxCommand for UniqCommand {
    fn name(&self) -> &'static str {
        "uniq"
    }

    fn usage(&self) -> &'static str {
        "usage: uniq [-c] [-d] [-u] [values...]\n\n\
         Returns one of each distinct value in its arguments, or in the array on stdin.\n\
         \x20 -c, --count      map each value to its number of occurrences\n\
         \x20 -d, --repeated   only values that occur more than once\n\
         \x20 -u, --unique     only values that occur exactly once"
    }

    fn switches(&self) -> &'static [&'static str] {
        &["c", "count", "d", "repeated", "u", "unique"]
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = UniqOptions::parse(ctx.invocation);
        let items = ctx.invocation.positional().to_vec();
        Ok(Some(value(uniq_values(items, &opts))))
    }

    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        let opts = UniqOptions::parse(ctx.invocation);
        let items = expect_stdin_array(self.name(), ctx.read_stdin_value()?)?;
        Ok(value(uniq_values(items, &opts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{
        arb_small_value, arb_value, json, run_json, run_tool,
    };
    use proptest::prelude::*;

    fn opts(count: bool, repeated: bool, unique_only: bool) -> UniqOptions {
        UniqOptions {
            count,
            repeated,
            unique_only,
        }
    }

    #[test]
    fn test_count_scenario() {
        let out = run_json(&UniqCommand, &["-c"], r#"[{"a":1},{"a":1},{"a":2}]"#);
        assert_eq!(out, json(r#"{"{\"a\":1}":2,"{\"a\":2}":1}"#));
    }

    #[test]
    fn test_unsorted_input_collapses() {
        let out = run_json(&UniqCommand, &[], r#"[1,"a",1,{"x":[1]},"a",{"x":[1]}]"#);
        assert_eq!(out, json(r#"[1,"a",{"x":[1]}]"#));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let out = run_json(&UniqCommand, &["-c"], r#"[{"a":1,"b":2},{"b":2,"a":1}]"#);
        assert_eq!(out, json(r#"{"{\"a\":1,\"b\":2}":2}"#));
    }

    #[test]
    fn test_repeated_and_unique() {
        let stdin = "[1,2,2,3,3,3]";
        assert_eq!(run_json(&UniqCommand, &["-d"], stdin), json("[2,3]"));
        assert_eq!(run_json(&UniqCommand, &["-u"], stdin), json("[1]"));
        // -d wins over -u
        assert_eq!(run_json(&UniqCommand, &["-d", "-u"], stdin), json("[2,3]"));
        assert_eq!(run_json(&UniqCommand, &["-c", "-d"], stdin), json(r#"{"2":2,"3":3}"#));
    }

    #[test]
    fn test_params_input() {
        let out = run_json(&UniqCommand, &["-c", "x", "y", "x"], "");
        assert_eq!(out, json(r#"{"x":2,"y":1}"#));
    }

    #[test]
    fn test_non_array_stdin() {
        let err = run_tool(&UniqCommand, &[], "7").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    proptest! {
        #[test]
        fn prop_uniq_idempotent(items in prop::collection::vec(arb_value(), 0..16)) {
            let once = uniq_values(items, &opts(false, false, false));
            let twice = uniq_values(once.as_array().unwrap().clone(), &opts(false, false, false));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_uniq_counts_sum_to_input(items in prop::collection::vec(arb_small_value(), 0..32)) {
            let len = items.len() as i64;
            let buckets = buckets(items.clone());
            let total: usize = buckets.values().map(|b| b.count).sum();
            prop_assert_eq!(total as i64, len);
            for bucket in buckets.values() {
                let expected = items.iter().filter(|v| **v == bucket.representative).count();
                prop_assert_eq!(bucket.count, expected);
            }
        }
    }
}
