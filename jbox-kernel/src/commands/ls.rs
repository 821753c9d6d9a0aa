//! The `ls` command - list directory contents as a tree of records.
//!
//! `ls [-maxdepth N] [PATH]` lists PATH (default `./`). Directories up to
//! depth N (default 1, `-1` for no limit) get an `entries` array holding their
//! own listing. Symbolic links are reported as links and never followed.

use super::runner::value;
use super::{CommandContext, InputMode, JboxCommand, Output, Seed, group_name, user_name};
use crate::JboxError;
use crate::args::Invocation;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use jbox_api::{Map, Value};
use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{trace, warn};

pub struct LsCommand;

struct LsOptions {
    path: PathBuf,
    maxdepth: i64,
}

impl LsOptions {
    fn parse(invocation: &Invocation) -> Result<Self, JboxError> {
        let path = match invocation.positional() {
            [] => PathBuf::from("./"),
            [Value::String(p)] => PathBuf::from(p),
            [other] => PathBuf::from(other.to_json()),
            _ => return Err(JboxError::Usage("ls: at most one PATH".into())),
        };
        Ok(LsOptions {
            path,
            maxdepth: invocation.param_i64(&["maxdepth"])?.unwrap_or(1),
        })
    }

    /// Whether a directory found at `depth` (root children are depth 1) is listed too.
    fn descends(&self, depth: usize) -> bool {
        self.maxdepth < 0 || (depth as i64) < self.maxdepth
    }
}

/// A directory waiting to be listed, with the index path of its record.
struct Pending {
    dir: PathBuf,
    trail: Vec<usize>,
}

fn walk(opts: &LsOptions) -> anyhow::Result<Vec<Value>> {
    let mut tree = Vec::new();
    let mut stack = vec![Pending {
        dir: opts.path.clone(),
        trail: Vec::new(),
    }];

    while let Some(pending) = stack.pop() {
        let names = match list_names(&pending.dir) {
            Ok(names) => names,
            Err(e) if pending.trail.is_empty() => {
                return Err(e).with_context(|| format!("cannot list {}", pending.dir.display()));
            }
            Err(e) => {
                warn!(path = %pending.dir.display(), error = %e, "cannot list directory");
                continue;
            }
        };
        let depth = pending.trail.len() + 1;

        for name in names {
            let path = pending.dir.join(&name);
            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping entry");
                    continue;
                }
            };
            trace!(path = %path.display(), depth, "stat");

            let descend = meta.is_dir() && opts.descends(depth);
            let mut record = entry_record(&name, &meta);
            if descend {
                record.insert("entries".to_string(), Value::Array(Vec::new()));
            }

            let Some(level) = entries_at(&mut tree, &pending.trail) else {
                continue;
            };
            level.push(Value::Object(record));

            if descend {
                let mut trail = pending.trail.clone();
                trail.push(level.len() - 1);
                stack.push(Pending { dir: path, trail });
            }
        }
    }

    Ok(tree)
}

fn list_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Follow `trail` from the root listing down to the `entries` it names.
fn entries_at<'a>(mut level: &'a mut Vec<Value>, trail: &[usize]) -> Option<&'a mut Vec<Value>> {
    for &i in trail {
        level = match level.get_mut(i)? {
            Value::Object(map) => match map.get_mut("entries")? {
                Value::Array(items) => items,
                _ => return None,
            },
            _ => return None,
        };
    }
    Some(level)
}

fn entry_record(name: &str, meta: &Metadata) -> Map {
    let mut record = Map::new();
    record.insert("name".into(), Value::from(name));
    record.insert("user".into(), Value::from(user_name(meta.uid())));
    record.insert("group".into(), Value::from(group_name(meta.gid())));
    record.insert("bytes".into(), Value::from(meta.len()));
    record.insert("created".into(), Value::from(created(meta)));
    record.insert("accessed".into(), Value::from(timestamp(meta.atime(), meta.atime_nsec())));
    record.insert("modified".into(), Value::from(timestamp(meta.mtime(), meta.mtime_nsec())));
    record.insert("permissions".into(), Value::from(format_permissions(meta)));
    record
}

/// Birth time where the platform records one, status-change time otherwise.
fn created(meta: &Metadata) -> String {
    match meta.created() {
        Ok(time) => format_system_time(time),
        Err(_) => timestamp(meta.ctime(), meta.ctime_nsec()),
    }
}

fn format_system_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn timestamp(secs: i64, nsecs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, nsecs.clamp(0, 999_999_999) as u32)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_permissions(meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        'l'
    } else if file_type.is_dir() {
        'd'
    } else {
        '-'
    };

    let mode = meta.mode();
    let perms = [
        if mode & 0o400 != 0 { 'r' } else { '-' },
        if mode & 0o200 != 0 { 'w' } else { '-' },
        if mode & 0o100 != 0 { 'x' } else { '-' },
        if mode & 0o040 != 0 { 'r' } else { '-' },
        if mode & 0o020 != 0 { 'w' } else { '-' },
        if mode & 0o010 != 0 { 'x' } else { '-' },
        if mode & 0o004 != 0 { 'r' } else { '-' },
        if mode & 0o002 != 0 { 'w' } else { '-' },
        if mode & 0o001 != 0 { 'x' } else { '-' },
    ];

    std::iter::once(kind).chain(perms).collect()
}

impl JboxCommand for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn usage(&self) -> &'static str {
        "usage: ls [-maxdepth N] [PATH]\n\n\
         Lists PATH (default ./) as JSON records.\n\
         \x20 -maxdepth N   descend N levels (default 1, -1 for no limit)"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        LsOptions::parse(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = LsOptions::parse(ctx.invocation)?;
        Ok(Some(value(walk(&opts)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::test_helpers::{create_test_file, run_json, run_tool};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn ls(dir: &Path, extra: &[&str]) -> Value {
        let mut args: Vec<&str> = extra.to_vec();
        args.push(dir.to_str().unwrap());
        run_json(&LsCommand, &args, "")
    }

    fn names(listing: &Value) -> Vec<String> {
        listing
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e.as_object().unwrap()["name"].as_str().unwrap().to_string())
            .collect()
    }

    fn find<'a>(listing: &'a Value, name: &str) -> &'a Map {
        listing
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_object)
            .find(|e| e["name"].as_str() == Some(name))
            .unwrap()
    }

    /// Deepest level of `entries` nesting below the root listing.
    fn nesting(listing: &Value) -> usize {
        listing
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e.as_object().unwrap().get("entries"))
            .map(|entries| 1 + nesting(entries))
            .max()
            .unwrap_or(0)
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "b.txt", b"hello");
        fs::create_dir_all(dir.path().join("a/inner/deep")).unwrap();
        fs::write(dir.path().join("a/one.json"), b"[]").unwrap();
        fs::write(dir.path().join("a/inner/two.json"), b"{}").unwrap();
        dir
    }

    #[test]
    fn test_default_lists_one_level() {
        let dir = fixture();
        let out = ls(dir.path(), &[]);
        assert_eq!(names(&out), vec!["a", "b.txt"]);
        assert!(!find(&out, "a").contains_key("entries"));

        let file = find(&out, "b.txt");
        assert_eq!(file["bytes"], Value::Int(5));
        assert!(file["permissions"].as_str().unwrap().starts_with('-'));
        assert_eq!(file["permissions"].as_str().unwrap().len(), 10);
        for field in ["user", "group", "created", "accessed", "modified"] {
            assert!(file.contains_key(field), "{field} missing");
        }
        let modified = file["modified"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(modified).is_ok());
    }

    #[test]
    fn test_maxdepth_two_nests_once() {
        let dir = fixture();
        let out = ls(dir.path(), &["-maxdepth", "2"]);
        let a = find(&out, "a");
        assert!(a["permissions"].as_str().unwrap().starts_with('d'));
        let entries = &a["entries"];
        assert_eq!(names(entries), vec!["inner", "one.json"]);
        assert!(!find(entries, "inner").contains_key("entries"));
        assert_eq!(nesting(&out), 1);
    }

    #[test]
    fn test_unbounded_walk() {
        let dir = fixture();
        let out = ls(dir.path(), &["-maxdepth", "-1"]);
        let inner = find(&find(&out, "a")["entries"], "inner");
        assert_eq!(names(&inner["entries"]), vec!["deep", "two.json"]);
        assert_eq!(nesting(&out), 3);
    }

    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        let out = ls(dir.path(), &["-maxdepth", "-1"]);
        let link = find(&out, "loop");
        assert!(link["permissions"].as_str().unwrap().starts_with('l'));
        assert!(!link.contains_key("entries"));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let err = run_tool(&LsCommand, &["/nonexistent/jbox/dir"], "").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("cannot list"));
    }

    #[test]
    fn test_non_integer_maxdepth_is_usage() {
        let err = run_tool(&LsCommand, &["-maxdepth", "deep", "/tmp"], "").unwrap_err();
        assert_eq!(err.exit_code(), 254);
    }

    #[test]
    fn test_permission_string() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "x", b"");
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o754)).unwrap();
        let meta = fs::symlink_metadata(&path).unwrap();
        assert_eq!(format_permissions(&meta), "-rwxr-xr--");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_depth_bound(chain in 1usize..5, maxdepth in 0i64..6) {
            let dir = TempDir::new().unwrap();
            let mut path = dir.path().to_path_buf();
            for i in 0..chain {
                path.push(format!("d{i}"));
            }
            fs::create_dir_all(&path).unwrap();

            let opts = LsOptions { path: dir.path().to_path_buf(), maxdepth };
            let tree = Value::Array(walk(&opts).unwrap());
            let expected = chain.min(maxdepth.saturating_sub(1).max(0) as usize);
            prop_assert_eq!(nesting(&tree), expected);
            prop_assert!(nesting(&tree) as i64 <= maxdepth);
        }
    }
}
