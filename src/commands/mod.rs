//! Command dispatch.
//!
//! A command line is split into shell words; the first word is looked up in
//! the static [`COMMANDS`] table and the rest are handed to its handler.

mod fs;
mod system;

use std::sync::Arc;

use crate::config::CommandsConfig;
use crate::error::{Error, Result};
use crate::sandbox::SandboxRoot;
use crate::session::Session;
use crate::system::{SysinfoProbe, SystemProbe};

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show the user; may be empty.
    Output(String),
    /// The user asked to end the session.
    Exit,
}

impl Outcome {
    /// Returns the text to show, empty for [`Outcome::Exit`].
    pub fn text(&self) -> &str {
        match self {
            Outcome::Output(text) => text,
            Outcome::Exit => "",
        }
    }
}

type Handler = fn(&Terminal, &mut Session, &[String]) -> Result<Outcome>;

/// One entry of the command table.
pub struct CommandSpec {
    /// Primary command name.
    pub name: &'static str,
    /// Alternative names accepted by the dispatcher.
    pub aliases: &'static [&'static str],
    /// Usage line shown by `help`.
    pub usage: &'static str,
    /// One-line description shown by `help`.
    pub summary: &'static str,
    handler: Handler,
}

impl CommandSpec {
    fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.contains(&token)
    }
}

/// Every command the terminal understands.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "ls",
        aliases: &["dir"],
        usage: "ls [path]",
        summary: "List directory contents",
        handler: fs::ls,
    },
    CommandSpec {
        name: "pwd",
        aliases: &[],
        usage: "pwd",
        summary: "Print the working directory",
        handler: fs::pwd,
    },
    CommandSpec {
        name: "cd",
        aliases: &[],
        usage: "cd [path]",
        summary: "Change the working directory",
        handler: fs::cd,
    },
    CommandSpec {
        name: "mkdir",
        aliases: &[],
        usage: "mkdir <path>",
        summary: "Create a directory and its parents",
        handler: fs::mkdir,
    },
    CommandSpec {
        name: "rm",
        aliases: &["del"],
        usage: "rm [-r] <path>",
        summary: "Remove a file or directory",
        handler: fs::rm,
    },
    CommandSpec {
        name: "touch",
        aliases: &[],
        usage: "touch <path>",
        summary: "Create an empty file or update its timestamp",
        handler: fs::touch,
    },
    CommandSpec {
        name: "cat",
        aliases: &[],
        usage: "cat <path>",
        summary: "Print a file",
        handler: fs::cat,
    },
    CommandSpec {
        name: "mv",
        aliases: &[],
        usage: "mv <src> <dst>",
        summary: "Move or rename a file or directory",
        handler: fs::mv,
    },
    CommandSpec {
        name: "cp",
        aliases: &[],
        usage: "cp <src> <dst>",
        summary: "Copy a file or directory tree",
        handler: fs::cp,
    },
    CommandSpec {
        name: "stat",
        aliases: &[],
        usage: "stat <path>",
        summary: "Show file metadata",
        handler: fs::stat,
    },
    CommandSpec {
        name: "sysinfo",
        aliases: &[],
        usage: "sysinfo",
        summary: "Show CPU and memory usage",
        handler: system::sysinfo,
    },
    CommandSpec {
        name: "ps",
        aliases: &[],
        usage: "ps [limit]",
        summary: "List the busiest processes",
        handler: system::ps,
    },
    CommandSpec {
        name: "help",
        aliases: &["?"],
        usage: "help [command]",
        summary: "Show available commands",
        handler: help,
    },
    CommandSpec {
        name: "exit",
        aliases: &["quit"],
        usage: "exit",
        summary: "End the session",
        handler: exit,
    },
];

/// Finds the command registered under `token` (name or alias).
pub fn lookup(token: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(token))
}

/// Returns the names of every command starting with `prefix`.
pub fn complete(prefix: &str) -> Vec<&'static str> {
    COMMANDS
        .iter()
        .map(|spec| spec.name)
        .filter(|name| name.starts_with(prefix))
        .collect()
}

/// Splits a command line into words using POSIX shell quoting rules.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    shell_words::split(line).map_err(|e| Error::InvalidArgument(format!("parse error: {}", e)))
}

/// Checks the operand count for `command`.
fn expect_args(command: &str, args: &[String], min: usize, max: usize) -> Result<()> {
    if args.len() < min {
        return Err(Error::missing_operand(command));
    }
    if args.len() > max {
        return Err(Error::InvalidArgument(format!(
            "{}: too many arguments",
            command
        )));
    }
    Ok(())
}

/// Executes command lines against sessions rooted in one sandbox.
///
/// Cheap to clone; the web front end shares one across request handlers.
#[derive(Clone)]
pub struct Terminal {
    root: Arc<SandboxRoot>,
    config: CommandsConfig,
    probe: Arc<dyn SystemProbe>,
}

impl Terminal {
    /// Creates a terminal using the `sysinfo`-backed system probe.
    pub fn new(root: SandboxRoot, config: CommandsConfig) -> Self {
        Self {
            root: Arc::new(root),
            config,
            probe: Arc::new(SysinfoProbe::new()),
        }
    }

    /// Replaces the system probe.
    pub fn with_probe(mut self, probe: Arc<dyn SystemProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Returns the sandbox root.
    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// Returns the command configuration.
    pub fn config(&self) -> &CommandsConfig {
        &self.config
    }

    pub(crate) fn probe(&self) -> &dyn SystemProbe {
        self.probe.as_ref()
    }

    /// Opens a new session at the sandbox root.
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.root))
    }

    /// Parses and runs one command line in `session`.
    ///
    /// A blank line produces empty output. Errors are returned for the front
    /// end to render; none of them invalidate the session.
    pub fn execute(&self, session: &mut Session, line: &str) -> Result<Outcome> {
        let tokens = tokenize(line)?;
        let Some((command, args)) = tokens.split_first() else {
            return Ok(Outcome::Output(String::new()));
        };

        let spec = lookup(command).ok_or_else(|| Error::UnknownCommand(command.clone()))?;
        tracing::debug!(command = spec.name, args = ?args, cwd = %session.pwd(), "dispatching command");

        let result = (spec.handler)(self, session, args);
        if let Err(e) = &result {
            tracing::debug!(command = spec.name, error = %e, "command failed");
        }
        result
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn help(_terminal: &Terminal, _session: &mut Session, args: &[String]) -> Result<Outcome> {
    expect_args("help", args, 0, 1)?;

    if let Some(name) = args.first() {
        let Some(spec) = lookup(name) else {
            let matches = complete(name);
            if matches.is_empty() {
                return Err(Error::UnknownCommand(name.clone()));
            }
            return Ok(Outcome::Output(format!(
                "Commands starting with '{}': {}",
                name,
                matches.join(" ")
            )));
        };
        let mut text = format!("usage: {}\n{}", spec.usage, spec.summary);
        if !spec.aliases.is_empty() {
            text.push_str(&format!("\naliases: {}", spec.aliases.join(", ")));
        }
        return Ok(Outcome::Output(text));
    }

    let width = COMMANDS.iter().map(|spec| spec.usage.len()).max().unwrap_or(0);
    let lines: Vec<String> = COMMANDS
        .iter()
        .map(|spec| format!("  {:width$}  {}", spec.usage, spec.summary, width = width))
        .collect();
    Ok(Outcome::Output(format!(
        "Available commands:\n{}",
        lines.join("\n")
    )))
}

fn exit(_terminal: &Terminal, _session: &mut Session, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Exit)
}
