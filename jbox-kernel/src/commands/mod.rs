//! The jbox tools and the lifecycle they share.
//!
//! Every tool implements [`JboxCommand`]. The [`runner`] drives a tool through
//! `before_exec -> validate -> exec_over_params | exec_over_stdin -> after_exec`
//! and turns the outcome into the text written to stdout.

mod array;
mod cat;
mod diff;
mod grep;
mod join;
mod keys;
mod last;
mod ls;
mod paste;
mod prtprn;
mod ps;
mod registry;
pub mod runner;
mod sort;
mod split;
mod uniq;

#[cfg(test)]
pub(crate) mod test_utils;

pub use registry::CommandRegistry;
pub use runner::RunError;

use crate::JboxError;
use crate::args::Invocation;
use anyhow::Context;
use jbox_api::{Kind, Value};
use nix::unistd::{Gid, Group, Uid, User};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

/// Context passed to the exec stages of a command.
pub struct CommandContext<'a> {
    /// The classified arguments of this invocation.
    pub invocation: &'a Invocation,
    /// The piped input stream. Read at most once, to completion.
    pub stdin: &'a mut dyn BufRead,
}

impl CommandContext<'_> {
    /// Read and parse the whole piped stream as one document.
    pub fn read_stdin_value(&mut self) -> anyhow::Result<Value> {
        read_value(&mut *self.stdin, "stdin")
    }

    /// Read the whole piped stream as text.
    pub fn read_stdin_text(&mut self) -> anyhow::Result<String> {
        let mut text = String::new();
        self.stdin
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        Ok(text)
    }
}

/// Where a tool's positional inputs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Positional values first; the piped stream when there are none, or
    /// when `exec_over_params` declines them.
    ParamsOrStdin,
    /// Only `exec_over_params` runs. Declining is an error, never a read.
    ParamsOnly,
}

/// A named input opened during `before_exec`.
pub enum Input {
    File { name: String, reader: BufReader<File> },
    /// `-`: the piped stream.
    Stdin,
}

impl Input {
    /// Open `name`, with `-` meaning the piped stream.
    pub fn open(name: &str) -> anyhow::Result<Self> {
        if name == "-" {
            return Ok(Input::Stdin);
        }
        let file = File::open(name).with_context(|| format!("cannot open {name}"))?;
        Ok(Input::File {
            name: name.to_string(),
            reader: BufReader::new(file),
        })
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Input::Stdin)
    }

    pub fn name(&self) -> &str {
        match self {
            Input::File { name, .. } => name,
            Input::Stdin => "-",
        }
    }

    /// Read and parse this input as one document.
    pub fn read_value(&mut self, stdin: &mut dyn BufRead) -> anyhow::Result<Value> {
        match self {
            Input::File { name, reader } => read_value(reader, name),
            Input::Stdin => read_value(stdin, "stdin"),
        }
    }
}

/// State produced by `before_exec` and threaded through the later stages.
#[derive(Default)]
pub struct Seed {
    pub inputs: Vec<Input>,
}

impl Seed {
    pub fn with_inputs(inputs: Vec<Input>) -> Self {
        Seed { inputs }
    }
}

/// What a tool produced, before `after_exec` renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Value(Value),
    /// Pre-rendered lines, joined with newlines.
    Lines(Vec<String>),
}

impl Output {
    /// Default rendering: compact JSON, or the lines as they are.
    pub fn render(&self) -> String {
        match self {
            Output::Value(value) => value.to_json(),
            Output::Lines(lines) => lines.join("\n"),
        }
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

/// A jbox tool.
///
/// Only `name`, `usage` and `exec_over_params` are required. The other stages
/// default to doing nothing, so a tool overrides just the ones it needs.
pub trait JboxCommand: Send + Sync {
    /// The tool name (e.g. "sort", "join").
    fn name(&self) -> &'static str;

    /// Usage text printed when validation fails.
    fn usage(&self) -> &'static str;

    /// Parameters that never take a value.
    fn switches(&self) -> &'static [&'static str] {
        &[]
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOrStdin
    }

    /// Setup before validation, e.g. opening the named files.
    fn before_exec(&self, _invocation: &Invocation) -> anyhow::Result<Seed> {
        Ok(Seed::default())
    }

    /// Check the arguments. An error here is reported with the usage text.
    fn validate(&self, _invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        Ok(())
    }

    /// Run over the positional values. `None` declines them.
    fn exec_over_params(
        &self,
        seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>>;

    /// Run over the piped stream.
    fn exec_over_stdin(
        &self,
        _seed: &mut Seed,
        _ctx: &mut CommandContext,
    ) -> anyhow::Result<Output> {
        Err(JboxError::NoOutput(self.name()).into())
    }

    /// Render the final output. Called exactly once.
    fn after_exec(&self, output: Output) -> anyhow::Result<String> {
        Ok(output.render())
    }
}

fn read_value(reader: &mut dyn BufRead, source: &str) -> anyhow::Result<Value> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {source}"))?;
    Value::from_json_str(&text).with_context(|| format!("invalid JSON in {source}"))
}

/// Unwrap an Array from a file or positional value.
pub(crate) fn expect_array(command: &'static str, value: Value) -> Result<Vec<Value>, JboxError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(JboxError::mismatch(command, Kind::Array, other.kind())),
    }
}

/// Unwrap an Array that arrived through the piped stream.
pub(crate) fn expect_stdin_array(
    command: &'static str,
    value: Value,
) -> Result<Vec<Value>, JboxError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(JboxError::stdin_mismatch(command, Kind::Array, other.kind())),
    }
}

/// Check that every positional value is of `kind`.
pub(crate) fn require_kind(
    command: &'static str,
    invocation: &Invocation,
    kind: Kind,
) -> Result<(), JboxError> {
    match invocation.positional().iter().find(|v| v.kind() != kind) {
        Some(bad) => Err(JboxError::mismatch(command, kind, bad.kind())),
        None => Ok(()),
    }
}

/// Positional values that name files, as strings.
pub(crate) fn file_names(invocation: &Invocation) -> Vec<String> {
    invocation
        .positional()
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_json(),
        })
        .collect()
}

/// Account name for `uid`, or the number itself when it has none.
pub(crate) fn user_name(uid: u32) -> String {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

/// Group name for `gid`, or the number itself when it has none.
pub(crate) fn group_name(gid: u32) -> String {
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}
