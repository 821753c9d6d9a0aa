//! The `diff` command - structural comparison of two JSON documents.
//!
//! Differences are grouped by category and addressed by path, e.g.
//! `root['users'][2]['name']`. Arrays are compared as multisets: order is
//! ignored and an item counts as unchanged while the other side still holds
//! an equal one.

use super::runner::value;
use super::{CommandContext, Input, InputMode, JboxCommand, Output, Seed, file_names};
use crate::JboxError;
use crate::args::Invocation;
use indexmap::IndexMap;
use jbox_api::{Fingerprint, Map, Value};
use std::collections::VecDeque;

pub struct DiffCommand;

#[derive(Debug, Default)]
struct Report {
    type_changes: Map,
    values_changed: Map,
    dictionary_item_added: Vec<Value>,
    dictionary_item_removed: Vec<Value>,
    iterable_item_added: Map,
    iterable_item_removed: Map,
}

impl Report {
    /// Only non-empty categories are kept, so equal documents give `{}`.
    fn into_value(self) -> Value {
        let mut out = Map::new();
        let categories = [
            ("type_changes", Value::Object(self.type_changes)),
            ("values_changed", Value::Object(self.values_changed)),
            ("dictionary_item_added", Value::Array(self.dictionary_item_added)),
            ("dictionary_item_removed", Value::Array(self.dictionary_item_removed)),
            ("iterable_item_added", Value::Object(self.iterable_item_added)),
            ("iterable_item_removed", Value::Object(self.iterable_item_removed)),
        ];
        for (name, category) in categories {
            let empty = match &category {
                Value::Object(map) => map.is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => true,
            };
            if !empty {
                out.insert(name.into(), category);
            }
        }
        Value::Object(out)
    }
}

fn key_path(path: &str, key: &str) -> String {
    format!("{path}['{}']", key.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

fn compare(path: &str, old: &Value, new: &Value, report: &mut Report) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => compare_objects(path, a, b, report),
        (Value::Array(a), Value::Array(b)) => compare_arrays(path, a, b, report),
        _ if old.kind() != new.kind() => {
            let mut change = Map::new();
            change.insert("old_type".into(), Value::from(old.kind().to_string()));
            change.insert("new_type".into(), Value::from(new.kind().to_string()));
            change.insert("old_value".into(), old.clone());
            change.insert("new_value".into(), new.clone());
            report.type_changes.insert(path.to_string(), Value::Object(change));
        }
        _ => {
            let mut change = Map::new();
            change.insert("new_value".into(), new.clone());
            change.insert("old_value".into(), old.clone());
            report.values_changed.insert(path.to_string(), Value::Object(change));
        }
    }
}

fn compare_objects(path: &str, old: &Map, new: &Map, report: &mut Report) {
    for (key, old_value) in old {
        match new.get(key) {
            Some(new_value) => compare(&key_path(path, key), old_value, new_value, report),
            None => report
                .dictionary_item_removed
                .push(Value::from(key_path(path, key))),
        }
    }
    for key in new.keys().filter(|k| !old.contains_key(*k)) {
        report
            .dictionary_item_added
            .push(Value::from(key_path(path, key)));
    }
}

/// Pair up equal items; whatever is left on either side was removed or added.
fn compare_arrays(path: &str, old: &[Value], new: &[Value], report: &mut Report) {
    let mut available: IndexMap<Fingerprint, VecDeque<usize>> = IndexMap::new();
    for (index, item) in new.iter().enumerate() {
        available.entry(item.fingerprint()).or_default().push_back(index);
    }

    for (index, item) in old.iter().enumerate() {
        let paired = available
            .get_mut(&item.fingerprint())
            .and_then(VecDeque::pop_front)
            .is_some();
        if !paired {
            report
                .iterable_item_removed
                .insert(index_path(path, index), item.clone());
        }
    }

    let mut added: Vec<usize> = available.into_values().flatten().collect();
    added.sort_unstable();
    for index in added {
        report
            .iterable_item_added
            .insert(index_path(path, index), new[index].clone());
    }
}

fn diff_values(old: &Value, new: &Value) -> Value {
    let mut report = Report::default();
    compare("root", old, new, &mut report);
    report.into_value()
}

impl JboxCommand for DiffCommand {
    fn name(&self) -> &'static str {
        "diff"
    }

    fn usage(&self) -> &'static str {
        "usage: diff FILE1 FILE2\n\n\
         Reports the structural differences between two JSON documents.\n\
         Array order is ignored. `-` reads one of the documents from stdin."
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn before_exec(&self, invocation: &Invocation) -> anyhow::Result<Seed> {
        let inputs = file_names(invocation)
            .iter()
            .map(|name| Input::open(name))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Seed::with_inputs(inputs))
    }

    fn validate(&self, _invocation: &Invocation, seed: &Seed) -> Result<(), JboxError> {
        if seed.inputs.len() != 2 {
            return Err(JboxError::Usage(format!(
                "diff: expected FILE1 and FILE2, received {} file(s)",
                seed.inputs.len()
            )));
        }
        if seed.inputs.iter().all(Input::is_stdin) {
            return Err(JboxError::ConfigurationConflict(
                "both inputs point to stdin".into(),
            ));
        }
        Ok(())
    }

    fn exec_over_params(
        &self,
        seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let mut documents = Vec::with_capacity(2);
        for input in &mut seed.inputs {
            documents.push(input.read_value(ctx.stdin)?);
        }
        let new = documents.pop().unwrap_or_default();
        let old = documents.pop().unwrap_or_default();
        Ok(Some(value(diff_values(&old, &new))))
    }
}
