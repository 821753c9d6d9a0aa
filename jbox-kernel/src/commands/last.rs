//! The `last` command - login records from `wtmp`.
//!
//! Decodes the fixed-size glibc `utmp` records (384 bytes each, native byte
//! order) stored in `/var/log/wtmp`, or in the file given with `-f`.

use super::runner::value;
use super::{CommandContext, InputMode, JboxCommand, Output, Seed};
use crate::JboxError;
use crate::args::Invocation;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use jbox_api::{Map, Value};
use std::fs;
use tracing::{debug, warn};

pub struct LastCommand;

const DEFAULT_FILE: &str = "/var/log/wtmp";
const RECORD_SIZE: usize = 384;

const RECORD_TYPES: [&str; 10] = [
    "EMPTY",
    "RUN_LVL",
    "BOOT_TIME",
    "NEW_TIME",
    "OLD_TIME",
    "INIT_PROCESS",
    "LOGIN_PROCESS",
    "USER_PROCESS",
    "DEAD_PROCESS",
    "ACCOUNTING",
];

struct LastOptions {
    file: String,
    /// Negative means every record.
    limit: i64,
}

impl LastOptions {
    fn parse(invocation: &Invocation) -> Result<Self, JboxError> {
        Ok(LastOptions {
            file: invocation
                .param_str(&["f", "file"])?
                .unwrap_or_else(|| DEFAULT_FILE.to_string()),
            limit: invocation.param_i64(&["n", "limit"])?.unwrap_or(-1),
        })
    }
}

/// One decoded `struct utmp`.
#[derive(Debug, Clone, PartialEq)]
struct LoginRecord {
    kind: i16,
    pid: i32,
    line: String,
    id: String,
    user: String,
    host: String,
    exit: (i16, i16),
    session: i32,
    sec: i32,
    usec: i32,
    addr: [i32; 4],
}

fn i16_at(bytes: &[u8], offset: usize) -> i16 {
    i16::from_ne_bytes([bytes[offset], bytes[offset + 1]])
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_ne_bytes(word)
}

/// NUL-padded C string field.
fn text_at(bytes: &[u8], start: usize, end: usize) -> String {
    let field = &bytes[start..end];
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

impl LoginRecord {
    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_SIZE {
            return None;
        }
        Some(LoginRecord {
            kind: i16_at(bytes, 0),
            pid: i32_at(bytes, 4),
            line: text_at(bytes, 8, 40),
            id: text_at(bytes, 40, 44),
            user: text_at(bytes, 44, 76),
            host: text_at(bytes, 76, 332),
            exit: (i16_at(bytes, 332), i16_at(bytes, 334)),
            session: i32_at(bytes, 336),
            sec: i32_at(bytes, 340),
            usec: i32_at(bytes, 344),
            addr: [
                i32_at(bytes, 348),
                i32_at(bytes, 352),
                i32_at(bytes, 356),
                i32_at(bytes, 360),
            ],
        })
    }

    fn to_value(&self) -> Value {
        let kind = usize::try_from(self.kind)
            .ok()
            .and_then(|k| RECORD_TYPES.get(k))
            .map_or_else(|| Value::from(self.kind as i64), |name| Value::from(*name));
        let sec_date = DateTime::<Utc>::from_timestamp(self.sec as i64, 0)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut record = Map::new();
        record.insert("type".into(), kind);
        record.insert("pid".into(), Value::from(self.pid as i64));
        record.insert("line".into(), Value::from(self.line.as_str()));
        record.insert("id".into(), Value::from(self.id.as_str()));
        record.insert("user".into(), Value::from(self.user.as_str()));
        record.insert("host".into(), Value::from(self.host.as_str()));
        record.insert("exit0".into(), Value::from(self.exit.0 as i64));
        record.insert("exit1".into(), Value::from(self.exit.1 as i64));
        record.insert("session".into(), Value::from(self.session as i64));
        record.insert("sec".into(), Value::from(self.sec as i64));
        record.insert("sec_date".into(), Value::from(sec_date));
        record.insert("usec".into(), Value::from(self.usec as i64));
        for (i, part) in self.addr.iter().enumerate() {
            record.insert(format!("addr{i}"), Value::from(*part as i64));
        }
        Value::Object(record)
    }
}

fn decode_records(data: &[u8], limit: i64) -> Vec<LoginRecord> {
    let chunks = data.chunks_exact(RECORD_SIZE);
    if !chunks.remainder().is_empty() {
        warn!(
            trailing = chunks.remainder().len(),
            "ignoring incomplete trailing utmp record"
        );
    }
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    chunks.filter_map(LoginRecord::decode).take(take).collect()
}

impl JboxCommand for LastCommand {
    fn name(&self) -> &'static str {
        "last"
    }

    fn usage(&self) -> &'static str {
        "usage: last [-n LIMIT] [-f FILE]\n\n\
         Lists login records.\n\
         \x20 -n, --limit LIMIT   return at most LIMIT records\n\
         \x20 -f, --file FILE     read FILE instead of /var/log/wtmp"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn validate(&self, invocation: &Invocation, _seed: &Seed) -> Result<(), JboxError> {
        LastOptions::parse(invocation).map(|_| ())
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let opts = LastOptions::parse(ctx.invocation)?;
        let data = fs::read(&opts.file).with_context(|| format!("cannot read {}", opts.file))?;
        let records = decode_records(&data, opts.limit);
        debug!(file = %opts.file, records = records.len(), "last");
        let records: Vec<Value> = records.iter().map(LoginRecord::to_value).collect();
        Ok(Some(value(records)))
    }
}
