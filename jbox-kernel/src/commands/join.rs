//! The `join` command - relational join of two JSON tables.
//!
//! Each input is an array of records (arrays or objects). Records are paired
//! when their keys are equal, and every pair is emitted as the left record
//! followed by the right record without its key field:
//!
//! - `join -1 0 -2 0 left.json right.json` - arrays keyed on their first field
//! - `join -1 id -2 '$.owner.id' users.json -` - objects keyed by path, right side piped
//! - `-a 1` also emits unpaired left records, `-a :[1,2]` unpaired records of both sides
//! - `-v 2` emits only the unpaired right records

use super::runner::value;
use super::{CommandContext, Input, InputMode, JboxCommand, Output, Seed, expect_array};
use crate::JboxError;
use crate::args::Invocation;
use crate::query::PathQuery;
use anyhow::bail;
use indexmap::IndexMap;
use jbox_api::{Kind, Value};
use tracing::debug;

pub struct JoinCommand;

/// How the key of a record is found.
#[derive(Debug, Clone)]
enum Locator {
    /// Position in an array record.
    Index(i64),
    /// Path query; a plain name is an object field.
    Path(PathQuery),
}

impl Locator {
    fn from_param(value: Option<&Value>) -> Result<Self, JboxError> {
        match value {
            None => Ok(Locator::Index(0)),
            Some(Value::String(source)) => PathQuery::parse(source).map(Locator::Path),
            Some(v) => v.as_i64().map(Locator::Index).ok_or_else(|| {
                JboxError::Usage(format!("join: key must be a field index or a path, received {v}"))
            }),
        }
    }

    fn key_of(&self, record: &Value) -> anyhow::Result<Value> {
        match (self, record) {
            (Locator::Index(i), Value::Array(items)) => match resolve(*i, items.len()) {
                Some(at) => Ok(items[at].clone()),
                None => bail!("join: record {record} has no field {i}"),
            },
            (Locator::Index(_), other) => {
                Err(JboxError::mismatch("join", Kind::Array, other.kind()).into())
            }
            (Locator::Path(query), _) => {
                let mut found = query.select(record);
                match found.len() {
                    0 => bail!("join: record {record} has no key {query}"),
                    1 => Ok(found.remove(0).clone()),
                    _ => Ok(Value::Array(found.into_iter().cloned().collect())),
                }
            }
        }
    }

    /// `record` with its key field removed, when the key is a direct field.
    fn strip_key(&self, record: &Value) -> Value {
        match (self, record) {
            (Locator::Index(i), Value::Array(items)) => without_index(items, *i),
            (Locator::Path(query), Value::Array(items)) => match query.as_index() {
                Some(i) => without_index(items, i),
                None => record.clone(),
            },
            (Locator::Path(query), Value::Object(map)) => match query.as_field_name() {
                Some(name) => {
                    let mut map = map.clone();
                    map.shift_remove(name);
                    Value::Object(map)
                }
                None => record.clone(),
            },
            _ => record.clone(),
        }
    }
}

fn resolve(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let at = if index < 0 { index + len } else { index };
    (0..len).contains(&at).then_some(at as usize)
}

fn without_index(items: &[Value], index: i64) -> Value {
    let skip = resolve(index, items.len());
    Value::Array(
        items
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(_, v)| v.clone())
            .collect(),
    )
}

/// Sides named by `-a` / `-v`: 1, 2 or `:[1,2]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Sides {
    left: bool,
    right: bool,
}

impl Sides {
    fn from_param(flag: &str, value: Option<&Value>) -> Result<Self, JboxError> {
        let mut sides = Sides::default();
        let Some(value) = value else {
            return Ok(sides);
        };
        let listed = match value {
            Value::Array(items) => items.clone(),
            single => vec![single.clone()],
        };
        for side in &listed {
            match side.as_i64() {
                Some(1) => sides.left = true,
                Some(2) => sides.right = true,
                _ => {
                    return Err(JboxError::Usage(format!(
                        "join: -{flag} expects 1, 2 or :[1,2], received {value}"
                    )));
                }
            }
        }
        Ok(sides)
    }

    fn any(&self) -> bool {
        self.left || self.right
    }
}

struct JoinOptions {
    left_key: Locator,
    right_key: Locator,
    unpaired: Sides,
    emit_matched: bool,
}

impl JoinOptions {
    fn parse(invocation: &Invocation) -> Result<Self, JboxError> {
        let include = Sides::from_param("a", invocation.param(&["a"]))?;
        let suppress = Sides::from_param("v", invocation.param(&["v"]))?;
        Ok(JoinOptions {
            left_key: Locator::from_param(invocation.param(&["1"]))?,
            right_key: Locator::from_param(invocation.param(&["2"]))?,
            unpaired: if suppress.any() { suppress } else { include },
            emit_matched: !suppress.any(),
        })
    }
}

type JoinIndex = IndexMap<Value, Vec<Value>>;

fn build_index(records: Vec<Value>, key: &Locator) -> anyhow::Result<JoinIndex> {
    let mut index = JoinIndex::new();
    for record in records {
        index.entry(key.key_of(&record)?).or_default().push(record);
    }
    Ok(index)
}

fn merge(left: &Value, right: Value) -> Result<Value, JboxError> {
    match (left, right) {
        (Value::Array(l), Value::Array(r)) => {
            let mut out = l.clone();
            out.extend(r);
            Ok(Value::Array(out))
        }
        (Value::Object(l), Value::Object(r)) => {
            let mut out = l.clone();
            for (k, v) in r {
                out.entry(k).or_insert(v);
            }
            Ok(Value::Object(out))
        }
        (l, r) => Err(JboxError::mismatch("join", l.kind(), r.kind())),
    }
}

fn join_tables(
    left: Vec<Value>,
    right: Vec<Value>,
    opts: &JoinOptions,
) -> anyhow::Result<Vec<Value>> {
    let left_index = build_index(left, &opts.left_key)?;
    let right_index = build_index(right, &opts.right_key)?;
    debug!(
        left_keys = left_index.len(),
        right_keys = right_index.len(),
        "join indices built"
    );

    let mut out = Vec::new();

    if opts.emit_matched {
        for (key, left_records) in &left_index {
            let Some(right_records) = right_index.get(key) else {
                continue;
            };
            for l in left_records {
                for r in right_records {
                    out.push(merge(l, opts.right_key.strip_key(r))?);
                }
            }
        }
    }

    if opts.unpaired.left {
        for (key, records) in &left_index {
            if !right_index.contains_key(key) {
                out.extend(records.iter().cloned());
            }
        }
    }
    if opts.unpaired.right {
        for (key, records) in &right_index {
            if !left_index.contains_key(key) {
                out.extend(records.iter().cloned());
            }
        }
    }

    Ok(out)
}

impl JboxCommand for JoinCommand {
    fn name(&self) -> &'static str {
        "join"
    }

    fn usage(&self) -> &'static str {
        "usage: join [-1 KEY] [-2 KEY] [-a SIDE] [-v SIDE] FILE1 FILE2\n\n\
         Joins two arrays of records on equal keys. One FILE may be `-` for stdin.\n\
         \x20 -1 KEY    key of FILE1 records: field index (default 0) or JSONPath\n\
         \x20 -2 KEY    key of FILE2 records: field index (default 0) or JSONPath\n\
         \x20 -a SIDE   also emit unpaired records from SIDE (1, 2 or :[1,2])\n\
         \x20 -v SIDE   emit only unpaired records from SIDE"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn before_exec(&self, invocation: &Invocation) -> anyhow::Result<Seed> {
        let inputs = super::file_names(invocation)
            .iter()
            .map(|name| Input::open(name))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Seed::with_inputs(inputs))
    }

    fn validate(&self, invocation: &Invocation, seed: &Seed) -> Result<(), JboxError> {
        if seed.inputs.len() != 2 {
            return Err(JboxError::Usage(format!(
                "join: expected FILE1 and FILE2, received {} file(s)",
                seed.inputs.len()
            )));
        }
        if seed.inputs.iter().all(Input::is_stdin) {
            return Err(JboxError::ConfigurationConflict(
                "both inputs point to stdin".into(),
            ));
        }
        JoinOptions::parse(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = JoinOptions::parse(ctx.invocation)?;
        let mut tables = Vec::with_capacity(2);
        for input in &mut seed.inputs {
            tables.push(expect_array(self.name(), input.read_value(ctx.stdin)?)?);
        }
        let right = tables.pop().unwrap_or_default();
        let left = tables.pop().unwrap_or_default();
        Ok(Some(value(join_tables(left, right, &opts)?)))
    }
}
