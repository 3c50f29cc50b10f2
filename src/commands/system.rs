//! System information command handlers.

use crate::error::{Error, Result};
use crate::session::Session;

use super::{expect_args, Outcome, Terminal};

const BYTES_PER_MB: u64 = 1024 * 1024;
const NAME_WIDTH: usize = 25;

pub(super) fn sysinfo(terminal: &Terminal, _session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("sysinfo", args, 0, 0)?;
    let snapshot = terminal.probe().snapshot();

    Ok(Outcome::Output(format!(
        "CPU: {:.1}%\nMemory: {:.1}% ({}MB used of {}MB)",
        snapshot.cpu_percent,
        snapshot.memory_percent(),
        snapshot.memory_used / BYTES_PER_MB,
        snapshot.memory_total / BYTES_PER_MB
    )))
}

pub(super) fn ps(terminal: &Terminal, _session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("ps", args, 0, 1)?;
    let limit = match args.first() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "ps: invalid limit '{}'",
                    raw
                )))
            }
        },
        None => terminal.config().ps_default_limit,
    };

    let mut processes = terminal.probe().processes();
    processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));

    let lines: Vec<String> = processes
        .iter()
        .take(limit)
        .map(|p| {
            let name: String = p.name.chars().take(NAME_WIDTH).collect();
            format!(
                "{:>6} {:<width$} user={} cpu={:.1}% mem={:.1}%",
                p.pid,
                name,
                p.user.as_deref().unwrap_or("N/A"),
                p.cpu_percent,
                p.memory_percent,
                width = NAME_WIDTH
            )
        })
        .collect();
    Ok(Outcome::Output(lines.join("\n")))
}
