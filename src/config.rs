//! Terminal configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing file or
//! a partial one is fine. Validation runs before the sandbox root is opened.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the current directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "sandbox-terminal.toml";

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// Sandbox root settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory confining all file operations.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Create the root directory at startup if it does not exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from("sandbox")
}

fn default_true() -> bool {
    true
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            create_if_missing: true,
        }
    }
}

/// Interactive shell settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// History file; `None` disables persistence.
    #[serde(default = "default_history_file")]
    pub history_file: Option<PathBuf>,
    /// Maximum number of history lines kept.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".sandbox_terminal_history"))
}

fn default_history_limit() -> usize {
    1000
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            history_limit: default_history_limit(),
        }
    }
}

/// Command behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Number of processes `ps` shows without an argument.
    #[serde(default = "default_ps_limit")]
    pub ps_default_limit: usize,
    /// Largest file `cat` will print, in bytes.
    #[serde(default = "default_cat_max_bytes")]
    pub cat_max_bytes: u64,
}

fn default_ps_limit() -> usize {
    10
}

fn default_cat_max_bytes() -> u64 {
    1024 * 1024
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            ps_default_limit: default_ps_limit(),
            cat_max_bytes: default_cat_max_bytes(),
        }
    }
}

/// Web front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Separate sandbox root for the web front end; falls back to `sandbox.root`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Maximum number of live sessions before the oldest is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_sessions() -> usize {
    256
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root: None,
            max_sessions: default_max_sessions(),
        }
    }
}

/// Top-level terminal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Sandbox root configuration.
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Interactive shell configuration.
    #[serde(default)]
    pub shell: ShellConfig,
    /// Command configuration.
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Web front end configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl TerminalConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] if it
    /// exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    tracing::debug!("no configuration file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_toml(&text)
    }

    /// Returns the root the web front end serves.
    pub fn web_root(&self) -> &Path {
        self.web.root.as_deref().unwrap_or(&self.sandbox.root)
    }
}

impl Validate for SandboxConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.root.as_os_str().is_empty() {
            result.add_error("sandbox.root cannot be empty");
        }

        if self.root == Path::new("/") {
            result.add_warning("sandbox.root is '/', the sandbox confines nothing");
        }

        result
    }
}

impl Validate for ShellConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.history_limit == 0 {
            result.add_error("shell.history_limit must be at least 1");
        }

        result
    }
}

impl Validate for CommandsConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.ps_default_limit == 0 {
            result.add_error("commands.ps_default_limit must be at least 1");
        }

        if self.cat_max_bytes == 0 {
            result.add_error("commands.cat_max_bytes must be at least 1");
        }

        result
    }
}

impl Validate for WebConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.bind.parse::<SocketAddr>().is_err() {
            result.add_error(format!("web.bind '{}' is not a socket address", self.bind));
        }

        if self.max_sessions == 0 {
            result.add_error("web.max_sessions must be at least 1");
        }

        if let Some(root) = &self.root {
            if root == Path::new("/") {
                result.add_warning("web.root is '/', the sandbox confines nothing");
            }
        }

        result
    }
}

impl Validate for TerminalConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = self.sandbox.validate();
        result.merge(self.shell.validate());
        result.merge(self.commands.validate());
        result.merge(self.web.validate());
        result
    }
}
