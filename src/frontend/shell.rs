//! Interactive line-oriented shell built on `rustyline`.

use std::ops::ControlFlow;
use std::path::PathBuf;

use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Context, Editor, Helper};

use crate::commands::{complete, Outcome, Terminal};
use crate::config::ShellConfig;
use crate::error::{Error, Result};
use crate::session::Session;

/// Banner printed when the shell starts.
pub const BANNER: &str = "Sandbox Terminal - type 'help' for commands, 'exit' to quit.";

/// Tab completion of command names for the first word of a line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandCompleter;

impl CommandCompleter {
    /// Returns the start of the word being completed and its candidates.
    ///
    /// Only the command word is completed; arguments get no candidates.
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let head = line.get(..pos).unwrap_or(line);
        let start = head.len() - head.trim_start().len();
        let word = &head[start..];
        if word.contains(char::is_whitespace) {
            return (pos, Vec::new());
        }
        let names = complete(word).into_iter().map(str::to_string).collect();
        (start, names)
    }
}

impl Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

fn editor_err(e: ReadlineError) -> Error {
    Error::Editor(e.to_string())
}

/// Reads command lines, runs them and prints their output.
pub struct Shell {
    terminal: Terminal,
    session: Session,
    history_file: Option<PathBuf>,
    history_limit: usize,
}

impl Shell {
    /// Creates a shell with a fresh session at the sandbox root.
    pub fn new(terminal: Terminal, config: ShellConfig) -> Self {
        let session = terminal.session();
        Self {
            terminal,
            session,
            history_file: config.history_file,
            history_limit: config.history_limit,
        }
    }

    /// Returns the current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the prompt for the current working directory.
    pub fn prompt(&self) -> String {
        format!("{}> ", self.session.pwd())
    }

    /// Runs one line. Breaks on `exit`, otherwise continues with the text
    /// to print, which is empty when there is nothing to show.
    pub fn step(&mut self, line: &str) -> ControlFlow<(), String> {
        match self.terminal.execute(&mut self.session, line) {
            Ok(Outcome::Exit) => ControlFlow::Break(()),
            Ok(Outcome::Output(text)) => ControlFlow::Continue(text),
            Err(e) => ControlFlow::Continue(format!("Error: {}", e)),
        }
    }

    /// Runs until `exit` or end of input. History is saved on every way out.
    ///
    /// Ctrl-C discards the current line without leaving the shell. Command
    /// errors are printed and never end the loop.
    pub fn run(&mut self) -> Result<()> {
        let config = rustyline::Config::builder()
            .max_history_size(self.history_limit)
            .map_err(editor_err)?
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .build();
        let mut editor: Editor<CommandCompleter, DefaultHistory> =
            Editor::with_config(config).map_err(editor_err)?;
        editor.set_helper(Some(CommandCompleter));
        self.load_history(&mut editor);

        println!("{}", BANNER);
        let result = loop {
            match editor.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    match self.step(&line) {
                        ControlFlow::Break(()) => break Ok(()),
                        ControlFlow::Continue(text) if !text.is_empty() => println!("{}", text),
                        ControlFlow::Continue(_) => {}
                    }
                }
                Err(ReadlineError::Interrupted) => println!("^C"),
                Err(ReadlineError::Eof) => {
                    println!();
                    break Ok(());
                }
                Err(e) => break Err(editor_err(e)),
            }
        };

        self.save_history(&mut editor);
        result
    }

    fn load_history(&self, editor: &mut Editor<CommandCompleter, DefaultHistory>) {
        let Some(path) = self.history_file.as_deref() else {
            return;
        };
        if !path.exists() {
            return;
        }
        if let Err(e) = editor.load_history(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to read history file");
        }
    }

    fn save_history(&self, editor: &mut Editor<CommandCompleter, DefaultHistory>) {
        let Some(path) = self.history_file.as_deref() else {
            return;
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create history directory");
                return;
            }
        }
        match editor.save_history(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "saved history"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save history"),
        }
    }
}
