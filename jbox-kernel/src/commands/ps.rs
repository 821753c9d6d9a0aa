//! The `ps` command - list processes.
//!
//! By default only the processes of the current user on the current terminal
//! are listed, with `pid`, `terminal`, `create_time` and `exe`. `-e` lists
//! every process with the full set of fields:
//! - `ps -e | grep '$[*].name'` - all process names
//! - `ps -e | sort -k memory_rss -r` - largest resident set first

use super::runner::value;
use super::{CommandContext, InputMode, JboxCommand, Output, Seed};
use jbox_api::{Map, Value};

pub struct PsCommand;

/// One process, as read from the process table.
#[derive(Debug, Clone, PartialEq)]
struct ProcessRecord {
    pid: u32,
    ppid: u32,
    name: String,
    exe: Option<String>,
    cmdline: Vec<String>,
    uid: u32,
    username: String,
    status: &'static str,
    terminal: Option<String>,
    create_time: String,
    num_threads: u64,
    memory_rss: u64,
}

impl ProcessRecord {
    fn to_value(&self, full: bool) -> Value {
        let mut record = Map::new();
        record.insert("pid".into(), Value::from(self.pid));
        if full {
            record.insert("ppid".into(), Value::from(self.ppid));
            record.insert("name".into(), Value::from(self.name.as_str()));
        }
        record.insert("exe".into(), Value::from(self.exe.clone()));
        if full {
            record.insert("cmdline".into(), Value::from(self.cmdline.clone()));
            record.insert("username".into(), Value::from(self.username.as_str()));
            record.insert("status".into(), Value::from(self.status));
        }
        record.insert("terminal".into(), Value::from(self.terminal.clone()));
        record.insert("create_time".into(), Value::from(self.create_time.as_str()));
        if full {
            record.insert("num_threads".into(), Value::from(self.num_threads));
            record.insert("memory_rss".into(), Value::from(self.memory_rss));
        }
        Value::Object(record)
    }
}

/// Fields of `/proc/<pid>/stat` used here.
#[derive(Debug, Clone, PartialEq)]
struct Stat {
    name: String,
    state: char,
    ppid: u32,
    tty_nr: u32,
    num_threads: u64,
    start_ticks: u64,
}

/// Parse `pid (comm) state ppid ...`. The command name may contain spaces
/// and parentheses, so it spans from the first '(' to the last ')'.
fn parse_stat(text: &str) -> Option<Stat> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    let name = text.get(open + 1..close)?.to_string();
    let fields: Vec<&str> = text.get(close + 1..)?.split_whitespace().collect();

    Some(Stat {
        name,
        state: fields.first()?.chars().next()?,
        ppid: fields.get(1)?.parse().ok()?,
        tty_nr: fields.get(4)?.parse().ok()?,
        num_threads: fields.get(17)?.parse().ok()?,
        start_ticks: fields.get(19)?.parse().ok()?,
    })
}

fn status_name(state: char) -> &'static str {
    match state {
        'R' => "running",
        'S' => "sleeping",
        'D' => "disk-sleep",
        'T' => "stopped",
        't' => "tracing-stop",
        'Z' => "zombie",
        'X' | 'x' => "dead",
        'I' => "idle",
        'P' => "parked",
        _ => "unknown",
    }
}

/// Device path of a controlling terminal number, if it names one.
fn terminal_name(tty_nr: u32) -> Option<String> {
    let major = (tty_nr >> 8) & 0xfff;
    let minor = ((tty_nr >> 12) & 0xfff00) | (tty_nr & 0xff);
    match major {
        0 => None,
        136..=143 => Some(format!("/dev/pts/{}", (major - 136) * 256 + minor)),
        4 if minor < 64 => Some(format!("/dev/tty{minor}")),
        4 => Some(format!("/dev/ttyS{}", minor - 64)),
        _ => None,
    }
}

#[cfg(target_os = "linux")]
fn list_processes() -> anyhow::Result<Vec<ProcessRecord>> {
    use anyhow::Context;
    use chrono::{DateTime, SecondsFormat, Utc};
    use std::fs;
    use tracing::trace;

    let boot_time: i64 = fs::read_to_string("/proc/stat")
        .context("cannot read /proc/stat")?
        .lines()
        .find_map(|l| l.strip_prefix("btime "))
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let ticks_per_sec = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1) as u64;
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) }.max(0) as u64;

    let mut processes = Vec::new();

    for entry in fs::read_dir("/proc").context("cannot read /proc")? {
        let entry = entry?;
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        let proc_path = entry.path();

        // Processes can exit between read_dir and here.
        let Some(stat) = fs::read_to_string(proc_path.join("stat"))
            .ok()
            .as_deref()
            .and_then(parse_stat)
        else {
            trace!(pid, "process vanished");
            continue;
        };

        let uid: u32 = fs::read_to_string(proc_path.join("status"))
            .unwrap_or_default()
            .lines()
            .find(|l| l.starts_with("Uid:"))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let rss_pages: u64 = fs::read_to_string(proc_path.join("statm"))
            .ok()
            .and_then(|s| s.split_whitespace().nth(1).and_then(|n| n.parse().ok()))
            .unwrap_or(0);

        let cmdline: Vec<String> = fs::read_to_string(proc_path.join("cmdline"))
            .unwrap_or_default()
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let exe = fs::read_link(proc_path.join("exe"))
            .ok()
            .map(|p| p.to_string_lossy().into_owned());

        let started = boot_time + (stat.start_ticks / ticks_per_sec) as i64;
        let create_time = DateTime::<Utc>::from_timestamp(started, 0)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        processes.push(ProcessRecord {
            pid,
            ppid: stat.ppid,
            username: super::user_name(uid),
            name: stat.name,
            exe,
            cmdline,
            uid,
            status: status_name(stat.state),
            terminal: terminal_name(stat.tty_nr),
            create_time,
            num_threads: stat.num_threads,
            memory_rss: rss_pages * page_size,
        });
    }

    Ok(processes)
}

#[cfg(not(target_os = "linux"))]
fn list_processes() -> anyhow::Result<Vec<ProcessRecord>> {
    Ok(vec![])
}

/// Keep the processes of the current user on the current terminal.
fn own_processes(processes: Vec<ProcessRecord>, uid: u32, own_pid: u32) -> Vec<ProcessRecord> {
    let terminal = processes
        .iter()
        .find(|p| p.pid == own_pid)
        .and_then(|p| p.terminal.clone());
    processes
        .into_iter()
        .filter(|p| p.uid == uid && p.terminal == terminal)
        .collect()
}

impl JboxCommand for PsCommand {
    fn name(&self) -> &'static str {
        "ps"
    }

    fn usage(&self) -> &'static str {
        "usage: ps [-e]\n\n\
         Lists the current user's processes on this terminal.\n\
         \x20 -e   list every process, with all fields"
    }

    fn switches(&self) -> &'static [&'static str] {
        &["e"]
    }

    fn input_mode(&self) -> InputMode {
        InputMode::ParamsOnly
    }

    fn exec_over_params(
        &self,
        _seed: &mut Seed,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<Option<Output>> {
        let show_all = ctx.invocation.flag(&["e"]);
        let mut processes = list_processes()?;
        if !show_all {
            let uid = unsafe { libc::getuid() };
            processes = own_processes(processes, uid, std::process::id());
        }
        let records: Vec<Value> = processes.iter().map(|p| p.to_value(show_all)).collect();
        Ok(Some(value(records)))
    }
}
