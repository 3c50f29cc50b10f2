//! Sandbox Terminal - a command terminal confined to one directory tree.
//!
//! This library provides the path sandbox guard, the command dispatcher with
//! its filesystem and system-information handlers, and the interactive and
//! web front ends that drive them.

pub mod commands;
pub mod config;
pub mod error;
pub mod frontend;
pub mod sandbox;
pub mod session;
pub mod system;

pub use commands::{lookup, CommandSpec, Outcome, Terminal, COMMANDS};
pub use config::{
    CommandsConfig, SandboxConfig, ShellConfig, TerminalConfig, Validate, ValidationResult,
    WebConfig,
};
pub use error::{Error, ErrorKind, Result};
pub use frontend::{Shell, WebState};
pub use sandbox::{FollowMode, ResolvedPath, SandboxRoot};
pub use session::Session;
pub use system::{ProcessInfo, SysinfoProbe, SystemProbe, SystemSnapshot};
