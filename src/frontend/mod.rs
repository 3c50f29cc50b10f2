//! Front ends that read commands and render their output.
//!
//! - [`shell`]: line-oriented interactive terminal
//! - [`web`]: HTML form and JSON endpoint served over HTTP

pub mod shell;
pub mod web;

pub use shell::Shell;
pub use web::{router, serve, WebState};
