//! Command-line interpretation.
//!
//! Turns the raw tokens of one invocation (program name excluded) into an
//! immutable [`Invocation`]: positional values plus named parameters.

pub mod token;

pub use token::classify;

use crate::JboxError;
use jbox_api::Value;
use std::collections::BTreeMap;

/// The classified tokens of a single tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    positional: Vec<Value>,
    params: BTreeMap<String, Value>,
}

impl Invocation {
    /// Parse tokens where every parameter may take a value.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, JboxError> {
        Self::parse_with_switches(tokens, &[])
    }

    /// Parse tokens, treating the named `switches` as value-less flags.
    ///
    /// A parameter token (`-x`, `--long`) binds the classified value of the
    /// next token unless that token is itself a parameter; negative numbers
    /// such as `-1` still bind as values. Switches always bind `true` and
    /// leave the following token positional. `--` ends parameter parsing.
    pub fn parse_with_switches<S: AsRef<str>>(
        tokens: &[S],
        switches: &[&str],
    ) -> Result<Self, JboxError> {
        let mut invocation = Invocation::default();
        let mut options_done = false;
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i].as_ref();

            if !options_done && token == "--" {
                options_done = true;
                i += 1;
                continue;
            }

            if options_done || !is_parameter(token) {
                invocation.positional.push(classify(token)?);
                i += 1;
                continue;
            }

            let name = token.trim_start_matches('-').to_string();
            let next = tokens.get(i + 1).map(AsRef::as_ref);
            match next {
                Some(next)
                    if !switches.contains(&name.as_str())
                        && (!is_parameter(next) || token::is_json_number(next)) =>
                {
                    invocation.params.insert(name, classify(next)?);
                    i += 2;
                }
                _ => {
                    invocation.params.insert(name, Value::Bool(true));
                    i += 1;
                }
            }
        }

        Ok(invocation)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// First parameter present under any of `names` (e.g. `["k", "key"]`).
    pub fn param(&self, names: &[&str]) -> Option<&Value> {
        names.iter().find_map(|name| self.params.get(*name))
    }

    /// Whether a flag was given. A flag that captured a value still counts.
    pub fn flag(&self, names: &[&str]) -> bool {
        matches!(self.param(names), Some(v) if *v != Value::Bool(false))
    }

    /// Integer parameter; `Usage` error if present but not an integer.
    pub fn param_i64(&self, names: &[&str]) -> Result<Option<i64>, JboxError> {
        match self.param(names) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                JboxError::Usage(format!("-{} expects an integer, received {value}", names[0]))
            }),
        }
    }

    /// String parameter; numbers are rendered back to text.
    pub fn param_str(&self, names: &[&str]) -> Result<Option<String>, JboxError> {
        match self.param(names) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v @ (Value::Int(_) | Value::Float(_))) => Ok(Some(v.to_json())),
            Some(other) => Err(JboxError::Usage(format!(
                "-{} expects a value, received {other}",
                names[0]
            ))),
        }
    }
}

fn is_parameter(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1 && token != "--"
}
