//! The `paste` command - merge JSON tables row by row.
//!
//! Row k of the output is row k of every file joined together: array rows are
//! concatenated, object rows are merged (later files win on key clashes).
//! Shorter files simply stop contributing.

use super::runner::value;
use super::{CommandContext, Input, InputMode, JboxCommand, Output, Seed, expect_array, file_names};
use crate::JboxError;
use crate::args::Invocation;
use jbox_api::{Kind, Value};

pub struct PasteCommand;

/// Merge the k-th rows of several tables.
fn paste_rows(command: &'static str, tables: Vec<Vec<Value>>) -> Result<Vec<Value>, JboxError> {
    let height = tables.iter().map(Vec::len).max().unwrap_or(0);
    let mut columns: Vec<_> = tables.into_iter().map(Vec::into_iter).collect();
    let mut rows = Vec::with_capacity(height);

    for _ in 0..height {
        let mut row: Option<Value> = None;
        for cell in columns.iter_mut().filter_map(|column| column.next()) {
            row = Some(match (row, cell) {
                (None, Value::Array(items)) => Value::Array(items),
                (None, Value::Object(map)) => Value::Object(map),
                (Some(Value::Array(mut acc)), Value::Array(items)) => {
                    acc.extend(items);
                    Value::Array(acc)
                }
                (Some(Value::Object(mut acc)), Value::Object(map)) => {
                    acc.extend(map);
                    Value::Object(acc)
                }
                (Some(acc), other) => {
                    return Err(JboxError::mismatch(command, acc.kind(), other.kind()));
                }
                (None, other) => {
                    return Err(JboxError::mismatch(command, Kind::Array, other.kind()));
                }
            });
        }
        rows.extend(row);
    }
    Ok(rows)
}

impl JboxCommand for PasteCommand {
    fn name(&self) -> &'static str {
        "paste"
    }

    fn usage(&self) -> &'static str {
        "usage: paste FILE...\n\nMerges the rows (arrays or objects) of FILEs side by side."
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
        if seed.inputs.is_empty() {
            return Err(JboxError::Usage("paste: at least one FILE is required".into()));
        }
        if seed.inputs.iter().filter(|i| i.is_stdin()).count() > 1 {
            return Err(JboxError::ConfigurationConflict(
                "stdin can be read only once".into(),
            ));
        }
        Ok(())
    }

    fn exec_over_params(
        &self,
        seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let mut tables = Vec::with_capacity(seed.inputs.len());
        for input in &mut seed.inputs {
            tables.push(expect_array(self.name(), input.read_value(ctx.stdin)?)?);
        }
        Ok(Some(value(paste_rows(self.name(), tables)?)))
    }
}
