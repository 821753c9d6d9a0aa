//! The `cat` command - concatenate JSON arrays from files.

use super::runner::value;
use super::{CommandContext, Input, InputMode, JboxCommand, Output, Seed, expect_array, file_names};
use crate::JboxError;
use crate::args::Invocation;
use tracing::debug;

pub struct CatCommand;

impl JboxCommand for CatCommand {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn usage(&self) -> &'static str {
        "usage: cat FILE...\n\nConcatenates the arrays stored in FILEs. `-` reads stdin."
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
            return Err(JboxError::Usage("cat: at least one FILE is required".into()));
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
        let mut joined = Vec::new();
        for input in &mut seed.inputs {
            let items = expect_array(self.name(), input.read_value(ctx.stdin)?)?;
            debug!(file = input.name(), items = items.len(), "cat");
            joined.extend(items);
        }
        Ok(Some(value(joined)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{create_test_file, json, run_json, run_tool};
    use tempfile::TempDir;

    #[test]
    fn test_cat_concatenates_files() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.json", b"[1,2]");
        let b = create_test_file(&dir, "b.json", br#"[{"x":3}]"#);
        let out = run_json(
            &CatCommand,
            &[a.to_str().unwrap(), b.to_str().unwrap()],
            "",
        );
        assert_eq!(out, json(r#"[1,2,{"x":3}]"#));
    }

    #[test]
    fn test_cat_reads_dash_from_stdin() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.json", b"[1]");
        let out = run_json(&CatCommand, &[a.to_str().unwrap(), "-"], "[2]");
        assert_eq!(out, json("[1,2]"));
    }

    #[test]
    fn test_cat_rejects_non_array_file() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.json", br#"{"x":1}"#);
        let err = run_tool(&CatCommand, &[a.to_str().unwrap()], "").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("expected array, received object"));
    }

    #[test]
    fn test_cat_missing_file_is_fatal() {
        let err = run_tool(&CatCommand, &["/nonexistent/jbox/a.json"], "").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("cannot open"));
    }

    #[test]
    fn test_cat_requires_a_file() {
        let err = run_tool(&CatCommand, &[], "[1]").unwrap_err();
        assert_eq!(err.exit_code(), 254);
    }
}
