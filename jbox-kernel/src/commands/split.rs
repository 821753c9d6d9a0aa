//! The `split` command - chunk a JSON array into files.
//!
//! `split FILE [PREFIX]` writes consecutive runs of at most `-l N` items to
//! `PREFIXaa`, `PREFIXab`, ... (or `PREFIX00`, `PREFIX01`, ... with `-d`) and
//! returns the names written. Every name is generated before the first file
//! is created, so running out of suffixes writes nothing.

use super::runner::value;
use super::{CommandContext, Input, InputMode, JboxCommand, Output, Seed, expect_array, file_names};
use crate::JboxError;
use crate::args::Invocation;
use anyhow::{Context, bail};
use jbox_api::Value;
use std::fs;
use tracing::debug;

pub struct SplitCommand;

/// Already far more names than any file system holds.
const MAX_SUFFIX_LENGTH: usize = 64;

struct SplitOptions {
    prefix: String,
    lines: usize,
    numeric: bool,
    suffix_length: usize,
    additional_suffix: String,
}

impl SplitOptions {
    fn parse(invocation: &Invocation) -> Result<Self, JboxError> {
        let positive = |names: &[&str], default: i64| -> Result<usize, JboxError> {
            let n = invocation.param_i64(names)?.unwrap_or(default);
            usize::try_from(n).ok().filter(|n| *n > 0).ok_or_else(|| {
                JboxError::Usage(format!("-{} must be positive, received {n}", names[0]))
            })
        };
        let suffix_length = positive(&["a", "suffix-length"], 2)?;
        if suffix_length > MAX_SUFFIX_LENGTH {
            return Err(JboxError::Usage(format!(
                "-a must be at most {MAX_SUFFIX_LENGTH}, received {suffix_length}"
            )));
        }
        Ok(SplitOptions {
            prefix: file_names(invocation)
                .get(1)
                .cloned()
                .unwrap_or_else(|| "x".to_string()),
            lines: positive(&["l", "lines"], 1000)?,
            numeric: invocation.flag(&["d", "numeric-suffixes"]),
            suffix_length,
            additional_suffix: invocation
                .param_str(&["additional-suffix"])?
                .unwrap_or_default(),
        })
    }

    fn file_name(&self, index: usize) -> Option<String> {
        let suffix = suffix(index, self.suffix_length, self.numeric)?;
        Some(format!("{}{suffix}{}", self.prefix, self.additional_suffix))
    }
}

/// The `index`-th suffix of `width` characters, or `None` once they run out.
fn suffix(index: usize, width: usize, numeric: bool) -> Option<String> {
    let (radix, first) = if numeric { (10, b'0') } else { (26, b'a') };
    let mut digits = vec![first; width];
    let mut rest = index;
    for slot in digits.iter_mut().rev() {
        *slot = first + (rest % radix) as u8;
        rest /= radix;
    }
    if rest > 0 {
        return None;
    }
    String::from_utf8(digits).ok()
}

impl JboxCommand for SplitCommand {
    fn name(&self) -> &'static str {
        "split"
    }

    fn usage(&self) -> &'static str {
        "usage: split [-l N] [-d] [-a LEN] [--additional-suffix S] FILE [PREFIX]\n\n\
         Writes the array in FILE to PREFIXaa, PREFIXab, ... (PREFIX defaults to x).\n\
         \x20 -l, --lines N             items per output file (default 1000)\n\
         \x20 -d, --numeric-suffixes    use numeric suffixes\n\
         \x20 -a, --suffix-length LEN   suffix length (default 2)\n\
         \x20 --additional-suffix S     append S to every file name"
    }

    fn switches(&self) -> &'static [&'static str] {
        &["d", "numeric-suffixes"]
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn before_exec(&self, invocation: &Invocation) -> anyhow::Result<Seed> {
        let inputs = file_names(invocation)
            .first()
            .map(|name| Input::open(name))
            .transpose()?
            .into_iter()
            .collect();
        Ok(Seed::with_inputs(inputs))
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        let count = invocation.positional().len();
        if !(1..=2).contains(&count) {
            return Err(JboxError::Usage(format!(
                "split: expected FILE and an optional PREFIX, received {count} argument(s)"
            )));
        }
        SplitOptions::parse(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = SplitOptions::parse(ctx.invocation)?;
        let Some(input) = seed.inputs.first_mut() else {
            bail!("split: no input");
        };
        let items = expect_array(self.name(), input.read_value(ctx.stdin)?)?;

        let chunks: Vec<&[Value]> = items.chunks(opts.lines).collect();
        let names = (0..chunks.len())
            .map(|index| opts.file_name(index))
            .collect::<Option<Vec<_>>>()
            .with_context(|| {
                format!(
                    "split: {} files do not fit in suffixes of length {}",
                    chunks.len(),
                    opts.suffix_length
                )
            })?;

        for (name, chunk) in names.iter().zip(&chunks) {
            let body = Value::Array(chunk.to_vec()).to_json();
            fs::write(name, body).with_context(|| format!("cannot write {name}"))?;
            debug!(file = %name, items = chunk.len(), "split");
        }

        let written: Vec<Value> = names.into_iter().map(Value::from).collect();
        Ok(Some(value(written)))
    }
}
