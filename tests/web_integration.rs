//! Integration tests for the web front end's HTTP routes.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use sandbox_terminal::frontend::web::{router, RunResponse, SESSION_COOKIE};
use sandbox_terminal::{CommandsConfig, ErrorKind, SandboxRoot, Terminal, WebState};

fn app() -> (TempDir, axum::Router) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let root = SandboxRoot::open(dir.path(), false).expect("failed to open root");
    let state = WebState::new(Terminal::new(root, CommandsConfig::default()), 16);
    (dir, router(state))
}

fn cookie_of(response: &Response<Body>) -> String {
    let value = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing set-cookie")
        .to_str()
        .unwrap();
    value.split(';').next().unwrap().to_string()
}

async fn api(app: &axum::Router, cookie: Option<&str>, command: &str) -> (String, RunResponse) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/run")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let body = serde_json::json!({ "command": command }).to_string();
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = cookie_of(&response);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (cookie, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn index_renders_form() {
    let (_dir, app) = app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("<form method=\"post\""));
    assert!(page.contains("name=\"cmd\""));
}

#[tokio::test]
async fn api_runs_commands_in_cookie_session() {
    let (dir, app) = app();

    let (cookie, response) = api(&app, None, "mkdir projects").await;
    assert!(cookie.starts_with(SESSION_COOKIE));
    assert_eq!(response.output, "Created: /projects");
    assert!(dir.path().join("projects").is_dir());

    let (_, response) = api(&app, Some(&cookie), "cd projects").await;
    assert_eq!(response.cwd, "/projects");

    let (_, response) = api(&app, Some(&cookie), "pwd").await;
    assert_eq!(response.output, "/projects");
}

#[tokio::test]
async fn api_reports_sandbox_escape_as_permission_denied() {
    let (_dir, app) = app();

    let (_, response) = api(&app, None, "cat ../../etc/passwd").await;
    assert_eq!(response.kind, Some(ErrorKind::PermissionDenied));
    assert!(response.error.unwrap().contains("outside the sandbox"));
    assert!(response.output.is_empty());
}

#[tokio::test]
async fn api_reports_unknown_command() {
    let (_dir, app) = app();

    let (_, response) = api(&app, None, "reboot").await;
    assert_eq!(response.kind, Some(ErrorKind::UnknownCommand));
}

#[tokio::test]
async fn separate_clients_have_separate_directories() {
    let (_dir, app) = app();

    let (alice, _) = api(&app, None, "mkdir a").await;
    let (bob, _) = api(&app, None, "mkdir b").await;
    assert_ne!(alice, bob);

    api(&app, Some(&alice), "cd a").await;
    let (_, response) = api(&app, Some(&bob), "pwd").await;
    assert_eq!(response.output, "/");
}

#[tokio::test]
async fn exit_clears_session_cookie() {
    let (_dir, app) = app();

    let (cookie, _) = api(&app, None, "pwd").await;
    let (cleared, response) = api(&app, Some(&cookie), "exit").await;
    assert!(response.exited);
    assert_eq!(cleared, format!("{}=", SESSION_COOKIE));
}

#[tokio::test]
async fn form_post_renders_escaped_output() {
    let (dir, app) = app();
    std::fs::write(dir.path().join("page.html"), "<h1>hi</h1>\n").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("cmd=cat+page.html"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("&lt;h1&gt;hi&lt;/h1&gt;"));
    assert!(page.contains("/&gt; cat page.html"));
}

#[tokio::test]
async fn form_post_renders_errors() {
    let (_dir, app) = app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("cmd=cd+..%2F.."))
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("Error: permission denied"));
}
