//! Sandbox Terminal CLI
//!
//! Runs the interactive shell or the web front end over a sandboxed root.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sandbox_terminal::frontend::{serve, Shell, WebState};
use sandbox_terminal::{
    Error, Result, SandboxRoot, Terminal, TerminalConfig, Validate,
};

#[derive(Debug, Parser)]
#[command(name = "sandbox-terminal", version, about = "Sandboxed file and system command terminal")]
struct Cli {
    /// Configuration file (default: ./sandbox-terminal.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sandbox root directory, overriding the configuration.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the interactive shell (default).
    Shell,
    /// Serve the web front end.
    Serve {
        /// Listen address, overriding the configuration.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Shell);

    // Shell output goes to stdout, so keep logging quiet there unless asked.
    let level = match command {
        Command::Serve { .. } => tracing::Level::INFO,
        Command::Shell => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(cli, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sandbox-terminal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, command: Command) -> Result<()> {
    let mut config = TerminalConfig::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.web.root = Some(root.clone());
        config.sandbox.root = root;
    }
    if let Command::Serve { bind: Some(bind) } = &command {
        config.web.bind = bind.clone();
    }

    for warning in config.validate().into_result()? {
        tracing::warn!(%warning, "configuration warning");
    }

    match command {
        Command::Shell => {
            let root = SandboxRoot::open(&config.sandbox.root, config.sandbox.create_if_missing)?;
            let terminal = Terminal::new(root, config.commands.clone());
            let mut shell = Shell::new(terminal, config.shell.clone());

            tokio::task::spawn_blocking(move || shell.run())
                .await
                .map_err(|e| Error::Editor(e.to_string()))?
        }
        Command::Serve { .. } => {
            let root = SandboxRoot::open(config.web_root(), config.sandbox.create_if_missing)?;
            let addr: SocketAddr = config
                .web
                .bind
                .parse()
                .map_err(|e| Error::Config(format!("web.bind: {}", e)))?;
            let terminal = Terminal::new(root, config.commands.clone());
            let state = WebState::new(terminal, config.web.max_sessions);

            serve(state, addr).await.map_err(|e| Error::Io {
                path: config.web.bind.clone(),
                source: e,
            })
        }
    }
}
