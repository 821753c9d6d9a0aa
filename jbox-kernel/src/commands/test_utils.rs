//! Test utilities for command testing.
//!
//! Runs a tool through the full lifecycle with in-memory stdin, so tests see
//! exactly what the binary would print.

#[cfg(test)]
pub mod test_helpers {
    use crate::commands::runner::{self, RunError};
    use crate::commands::JboxCommand;
    use jbox_api::{Map, Value};
    use proptest::prelude::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Run `command` with `args`, feeding `stdin` as the piped stream.
    pub fn run_tool(
        command: &dyn JboxCommand,
        args: &[&str],
        stdin: &str,
    ) -> Result<String, RunError> {
        let tokens: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        runner::run(command, &tokens, &mut Cursor::new(stdin.as_bytes().to_vec()))
    }

    /// Run and parse the output as JSON.
    pub fn run_json(command: &dyn JboxCommand, args: &[&str], stdin: &str) -> Value {
        let out = run_tool(command, args, stdin)
            .unwrap_or_else(|e| panic!("{} failed: {e}", command.name()));
        Value::from_json_str(&out).unwrap_or_else(|e| panic!("bad output {out:?}: {e}"))
    }

    /// Parse a JSON fixture.
    pub fn json(text: &str) -> Value {
        Value::from_json_str(text).unwrap()
    }

    /// Helper to create a test file in a directory.
    pub fn create_test_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        use std::io::Write;
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    /// Arbitrary values that survive a JSON round trip exactly.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1_000_000i64..1_000_000).prop_map(|n| Value::Float(n as f64 / 4.0)),
            "[a-z0-9 ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map>())),
            ]
        })
    }

    /// Small scalars, so that generated collections contain duplicates.
    pub fn arb_small_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            (0i64..4).prop_map(Value::Int),
            "[ab]".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
        ]
    }
}
