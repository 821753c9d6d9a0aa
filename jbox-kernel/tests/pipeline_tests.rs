//! Integration tests for tool pipelines.
//!
//! Each stage runs through `CommandRegistry::run`, and its rendered output is
//! fed to the next stage as stdin, the same way a shell pipe connects the
//! `jbox` binaries.

use jbox_api::Value;
use jbox_kernel::{CommandRegistry, EXIT_USAGE, RunError};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tempfile::TempDir;

/// Runs `a | b | c` pipelines. Stages are split on ` | ` and tokens on
/// whitespace, so arguments in these tests never contain spaces.
struct PipelineTest {
    registry: CommandRegistry,
    dir: TempDir,
}

impl PipelineTest {
    fn new() -> Self {
        Self {
            registry: CommandRegistry::new(),
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write a fixture into the temp dir and return its path.
    fn file(&self, name: &str, content: &str) -> String {
        let path: PathBuf = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.display().to_string()
    }

    fn try_run(&self, pipeline: &str, input: &str) -> Result<String, RunError> {
        let mut carried = input.to_string();
        for stage in pipeline.split(" | ") {
            let mut words = stage.split_whitespace();
            let name = words.next().expect("empty stage");
            let tokens: Vec<String> = words.map(String::from).collect();
            carried = self
                .registry
                .run(name, &tokens, &mut Cursor::new(carried.into_bytes()))?;
        }
        Ok(carried)
    }

    /// Run and parse the final output.
    fn run(&self, pipeline: &str, input: &str) -> Value {
        let out = self
            .try_run(pipeline, input)
            .unwrap_or_else(|e| panic!("Pipeline failed: {pipeline}: {e}"));
        Value::from_json_str(&out)
            .unwrap_or_else(|e| panic!("Bad JSON {out:?} from {pipeline}: {e}"))
    }

    fn expect(&self, pipeline: &str, input: &str, expected: &str) {
        let expected = Value::from_json_str(expected).unwrap();
        assert_eq!(self.run(pipeline, input), expected, "Pipeline: {pipeline}");
    }
}

// ============================================================================
// Packing and unpacking
// ============================================================================

#[test]
fn test_array_collects_lines() {
    let t = PipelineTest::new();
    t.expect("array", "1\n\n{\"a\":2}\n\"x\"\n", r#"[1,{"a":2},"x"]"#);
}

#[test]
fn test_unarray_array_round_trip() {
    let t = PipelineTest::new();
    let doc = r#"[1,"two",{"three":[3]},null]"#;
    t.expect("unarray | array", doc, doc);
}

#[test]
fn test_unarray_emits_one_value_per_line() {
    let t = PipelineTest::new();
    let out = t.try_run("unarray", r#"[1,{"a":"b"}]"#).unwrap();
    assert_eq!(out, "1\n{\"a\":\"b\"}");
}

#[test]
fn test_prtprn_is_pretty_and_sorted() {
    let t = PipelineTest::new();
    let out = t.try_run("prtprn", r#"{"b":1,"a":[2]}"#).unwrap();
    assert_eq!(out, "{\n    \"a\": [\n        2\n    ],\n    \"b\": 1\n}");
}

// ============================================================================
// Querying and ordering
// ============================================================================

#[test]
fn test_grep_then_sort() {
    let t = PipelineTest::new();
    let people = r#"[{"name":"bo","age":40},{"name":"al","age":30},{"name":"cy","age":35}]"#;
    t.expect("grep $[*].name | sort", people, r#"["al","bo","cy"]"#);
    t.expect("grep $[*].age | sort -r", people, "[40,35,30]");
}

#[test]
fn test_sort_by_key_then_keys() {
    let t = PipelineTest::new();
    let rows = r#"[{"n":2,"z":1},{"n":1,"y":1}]"#;
    t.expect("sort -k n | grep $[0]", rows, r#"{"n":1,"y":1}"#);
}

#[test]
fn test_sort_then_uniq_count() {
    let t = PipelineTest::new();
    t.expect("sort | uniq -c", "[3,1,3,2,3]", r#"{"1":1,"2":1,"3":3}"#);
}

#[test]
fn test_uniq_counts_records() {
    let t = PipelineTest::new();
    t.expect(
        "uniq -c",
        r#"[{"a":1},{"a":1},{"a":2}]"#,
        r#"{"{\"a\":1}":2,"{\"a\":2}":1}"#,
    );
}

#[test]
fn test_keys_of_stdin_object() {
    let t = PipelineTest::new();
    t.expect("keys | sort", r#"{"b":1,"a":2,"c":3}"#, r#"["a","b","c"]"#);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_cat_then_uniq() {
    let t = PipelineTest::new();
    let a = t.file("a.json", "[1,2]");
    let b = t.file("b.json", "[2,3]");
    t.expect(&format!("cat {a} {b} | uniq"), "", "[1,2,3]");
}

#[test]
fn test_paste_rows() {
    let t = PipelineTest::new();
    let a = t.file("a.json", r#"[{"id":1},{"id":2}]"#);
    let b = t.file("b.json", r#"[{"name":"x"},{"name":"y"},{"name":"z"}]"#);
    t.expect(
        &format!("paste {a} {b}"),
        "",
        r#"[{"id":1,"name":"x"},{"id":2,"name":"y"},{"name":"z"}]"#,
    );
}

#[test]
fn test_join_with_piped_right_side() {
    let t = PipelineTest::new();
    let left = t.file("left.json", r#"[[1,"a"],[2,"b"]]"#);
    t.expect(
        &format!("join {left} -"),
        r#"[[1,"x"],[3,"y"]]"#,
        r#"[[1,"a","x"]]"#,
    );
}

#[test]
fn test_join_objects_by_field() {
    let t = PipelineTest::new();
    let users = t.file("users.json", r#"[{"id":1,"name":"al"},{"id":2,"name":"bo"}]"#);
    let posts = t.file("posts.json", r#"[{"id":2,"title":"hi"}]"#);
    t.expect(
        &format!("join -1 id -2 id {users} {posts}"),
        "",
        r#"[{"id":2,"name":"bo","title":"hi"}]"#,
    );
}

#[test]
fn test_diff_of_files() {
    let t = PipelineTest::new();
    let a = t.file("a.json", r#"{"v":[1,2],"k":"x"}"#);
    let b = t.file("b.json", r#"{"v":[2,1],"k":"y"}"#);
    t.expect(
        &format!("diff {a} {b}"),
        "",
        r#"{"values_changed":{"root['k']":{"new_value":"y","old_value":"x"}}}"#,
    );
}

#[test]
fn test_split_then_cat() {
    let t = PipelineTest::new();
    let src = t.file("in.json", "[1,2,3,4,5]");
    let prefix = format!("{}/chunk", t.dir.path().display());
    let names = t.run(&format!("split -l 2 {src} {prefix}"), "");
    let names: Vec<String> = names
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(names.len(), 3);
    t.expect(&format!("cat {}", names.join(" ")), "", "[1,2,3,4,5]");
}

#[test]
fn test_ls_then_grep_names() {
    let t = PipelineTest::new();
    t.file("b.json", "[]");
    t.file("a.json", "[]");
    let dir = t.dir.path().display().to_string();
    t.expect(&format!("ls {dir} | grep $[*].name"), "", r#"["a.json","b.json"]"#);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unknown_tool() {
    let t = PipelineTest::new();
    let err = t.try_run("frobnicate", "").unwrap_err();
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[test]
fn test_failure_stops_pipeline() {
    let t = PipelineTest::new();
    let err = t.try_run("keys | sort", "[1,2]").unwrap_err();
    assert_eq!(err.exit_code(), 1);
}
