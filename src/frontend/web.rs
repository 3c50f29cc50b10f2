//! Web front end using axum.
//!
//! Routes:
//! - `GET /` renders the command form
//! - `POST /` runs the form's `cmd` field and renders the output
//! - `POST /api/run` runs `{"command": ...}` and answers with JSON
//!
//! Each browser gets its own [`Session`], keyed by a cookie, so working
//! directories of different clients never interfere.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::commands::{Outcome, Terminal};
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "terminal_session";

type SharedSession = Arc<Mutex<Session>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct SessionStore {
    sessions: HashMap<String, SharedSession>,
    /// Session ids, oldest first.
    order: VecDeque<String>,
}

/// Shared state of the web server.
#[derive(Clone)]
pub struct WebState {
    terminal: Terminal,
    store: Arc<Mutex<SessionStore>>,
    max_sessions: usize,
}

impl WebState {
    /// Creates server state keeping at most `max_sessions` live sessions.
    pub fn new(terminal: Terminal, max_sessions: usize) -> Self {
        Self {
            terminal,
            store: Arc::new(Mutex::new(SessionStore::default())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the number of live sessions.
    pub fn session_count(&self) -> usize {
        lock(&self.store).sessions.len()
    }

    /// Returns the session for `id`, creating a new one if `id` is unknown.
    fn session_for(&self, id: Option<&str>) -> (String, SharedSession) {
        let mut store = lock(&self.store);
        if let Some(id) = id {
            if let Some(session) = store.sessions.get(id) {
                return (id.to_string(), Arc::clone(session));
            }
        }

        while store.sessions.len() >= self.max_sessions {
            let Some(oldest) = store.order.pop_front() else {
                break;
            };
            store.sessions.remove(&oldest);
            tracing::info!(session = %oldest, "evicted oldest web session");
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(self.terminal.session()));
        store.sessions.insert(id.clone(), Arc::clone(&session));
        store.order.push_back(id.clone());
        tracing::info!(session = %id, "opened web session");
        (id, session)
    }

    fn existing_cwd(&self, id: Option<&str>) -> Option<String> {
        let store = lock(&self.store);
        let session = store.sessions.get(id?)?;
        let cwd = lock(session).pwd();
        Some(cwd)
    }

    fn close(&self, id: &str) {
        let mut store = lock(&self.store);
        store.sessions.remove(id);
        store.order.retain(|existing| existing != id);
        tracing::info!(session = %id, "closed web session");
    }

    /// Runs `line` in session `id` on the blocking pool.
    ///
    /// Returns the session id actually used, the outcome and the session's
    /// working directory afterwards.
    async fn run(&self, id: Option<&str>, line: String) -> (String, Result<Outcome>, String) {
        let (id, session) = self.session_for(id);
        let terminal = self.terminal.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let mut session = lock(&session);
            let outcome = terminal.execute(&mut session, &line);
            (outcome, session.pwd())
        })
        .await;

        let (outcome, cwd) = match joined {
            Ok(result) => result,
            Err(e) => (
                Err(Error::Io {
                    path: String::new(),
                    source: std::io::Error::other(e.to_string()),
                }),
                "/".to_string(),
            ),
        };

        if matches!(outcome, Ok(Outcome::Exit)) {
            self.close(&id);
        }
        (id, outcome, cwd)
    }
}

/// Extracts the session id from the request's cookies.
fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(id: &str, closed: bool) -> String {
    if closed {
        format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", SESSION_COOKIE)
    } else {
        format!("{}={}; Path=/; HttpOnly; SameSite=Strict", SESSION_COOKIE, id)
    }
}

/// Escapes text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the terminal page.
pub fn render_page(cwd: &str, command: &str, output: &str) -> String {
    let echo = if command.is_empty() {
        String::new()
    } else {
        format!("{}&gt; {}\n", escape_html(cwd), escape_html(command))
    };
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sandbox Terminal</title></head>
<body>
<h2>Sandbox Terminal</h2>
<form method="post" action="/">
  <label>{cwd}&gt;</label>
  <input name="cmd" style="width:70%" autofocus placeholder="Type a command like: ls, pwd, mkdir test">
  <input type="submit" value="Run">
</form>
<pre>{echo}{output}</pre>
</body>
</html>
"#,
        cwd = escape_html(cwd),
        echo = echo,
        output = escape_html(output),
    )
}

fn render_outcome(outcome: &Result<Outcome>) -> String {
    match outcome {
        Ok(Outcome::Exit) => "Session closed.".to_string(),
        Ok(Outcome::Output(text)) => text.clone(),
        Err(e) => format!("Error: {}", e),
    }
}

#[derive(Debug, Deserialize)]
struct CommandForm {
    #[serde(default)]
    cmd: String,
}

/// Body of `POST /api/run`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunRequest {
    pub command: String,
}

/// Response of `POST /api/run`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    /// Command output; empty on error.
    pub output: String,
    /// Error message, if the command failed.
    pub error: Option<String>,
    /// Error classification, if the command failed.
    pub kind: Option<ErrorKind>,
    /// Working directory after the command.
    pub cwd: String,
    /// True if the command ended the session.
    pub exited: bool,
}

async fn index(State(state): State<WebState>, headers: HeaderMap) -> Html<String> {
    let cwd = state
        .existing_cwd(session_id(&headers).as_deref())
        .unwrap_or_else(|| "/".to_string());
    Html(render_page(&cwd, "", ""))
}

async fn run_form(
    State(state): State<WebState>,
    headers: HeaderMap,
    Form(form): Form<CommandForm>,
) -> impl IntoResponse {
    let requested = session_id(&headers);
    let (id, outcome, cwd) = state.run(requested.as_deref(), form.cmd.clone()).await;
    tracing::info!(session = %id, command = %form.cmd, ok = outcome.is_ok(), "web command");

    let exited = matches!(outcome, Ok(Outcome::Exit));
    let page = render_page(&cwd, &form.cmd, &render_outcome(&outcome));
    (
        [(header::SET_COOKIE, session_cookie(&id, exited))],
        Html(page),
    )
}

async fn run_api(
    State(state): State<WebState>,
    headers: HeaderMap,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    let requested = session_id(&headers);
    let (id, outcome, cwd) = state.run(requested.as_deref(), request.command.clone()).await;
    tracing::info!(session = %id, command = %request.command, ok = outcome.is_ok(), "api command");

    let exited = matches!(outcome, Ok(Outcome::Exit));
    let response = match outcome {
        Ok(outcome) => RunResponse {
            output: outcome.text().to_string(),
            error: None,
            kind: None,
            cwd,
            exited,
        },
        Err(e) => RunResponse {
            output: String::new(),
            error: Some(e.to_string()),
            kind: Some(e.kind()),
            cwd,
            exited,
        },
    };
    (
        [(header::SET_COOKIE, session_cookie(&id, exited))],
        Json(response),
    )
}

/// Creates the HTTP router.
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index).post(run_form))
        .route("/api/run", post(run_api))
        .with_state(state)
}

/// Serves the web front end on `addr` until the process ends.
pub async fn serve(state: WebState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, root = %state.terminal.root().path().display(), "web terminal listening");
    axum::serve(listener, router(state)).await
}
