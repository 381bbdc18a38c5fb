//! Full server round trip: HTTP on a real socket, file change, reload push.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hw_server::{
    HookError, RawChangeEvent, ReloadHook, ReloadMessage, ServerConfig, ServerError, SessionId,
    WatcherServer,
};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const RELOAD_TIMEOUT: Duration = Duration::from_secs(3);

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("index.html"),
        "<!DOCTYPE html><html><head><title>Hello world</title></head><body>Test</body></html>",
    )
    .unwrap();
    dir
}

fn config(root: PathBuf) -> ServerConfig {
    ServerConfig {
        static_root: root,
        host: "127.0.0.1".to_owned(),
        port: 0,
        interval: Duration::from_millis(100),
        ..ServerConfig::default()
    }
}

async fn http_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_serves_injected_page_over_tcp() {
    let dir = site();
    let mut server = WatcherServer::new(config(dir.path().to_path_buf()), None).unwrap();
    let addr = server.listen().await.unwrap();

    let response = http_get(addr.port(), "/").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("Hello world"));
    assert!(response.contains(&format!(
        "src=\"http://127.0.0.1:{}/httpwatcher.min.js\"",
        addr.port()
    )));
    assert!(response.contains(&format!(
        "activate(\"ws://127.0.0.1:{}/httpwatcher\")",
        addr.port()
    )));

    let missing = http_get(addr.port(), "/missing.html").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    server.shutdown().await;
}

#[tokio::test]
async fn test_file_change_broadcasts_reload() {
    let dir = site();
    let (hook_tx, mut hook_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
    let hook: ReloadHook = Arc::new(
        move |batch: &[RawChangeEvent]| -> Result<(), HookError> {
            let _ = hook_tx.send(batch.iter().map(|e| e.path.clone()).collect());
            Ok(())
        },
    );

    let mut server = WatcherServer::new(config(dir.path().to_path_buf()), Some(hook)).unwrap();
    server.listen().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    server.broadcaster().register_session(SessionId::new(), tx);

    fs::write(dir.path().join("page.html"), "<html><body>New</body></html>").unwrap();

    let message = tokio::time::timeout(RELOAD_TIMEOUT, rx.recv())
        .await
        .expect("no reload within timeout")
        .expect("session closed");
    assert_eq!(message, ReloadMessage::reload());
    assert_eq!(message.to_json().unwrap(), r#"{"command":"reload"}"#);

    let paths = hook_rx.recv().await.unwrap();
    assert!(
        paths.iter().any(|p| p.ends_with("page.html")),
        "hook saw {paths:?}"
    );

    server.shutdown().await;
}

/// Wait until the server reports `expected` connected sessions.
async fn wait_for_sessions(server: &WatcherServer, expected: usize) {
    tokio::time::timeout(RELOAD_TIMEOUT, async {
        while server.broadcaster().session_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session count never reached {expected}"));
}

#[tokio::test]
async fn test_push_channel_session_lifecycle() {
    let dir = site();
    let mut server = WatcherServer::new(config(dir.path().to_path_buf()), None).unwrap();
    let addr = server.listen().await.unwrap();

    let url = format!("ws://127.0.0.1:{}/httpwatcher", addr.port());
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    wait_for_sessions(&server, 1).await;

    // Inbound messages are ignored and keep the session open
    socket.send(Message::text("hello")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.broadcaster().session_count(), 1);

    fs::write(dir.path().join("page.html"), "<html><body>New</body></html>").unwrap();

    let frame = tokio::time::timeout(RELOAD_TIMEOUT, socket.next())
        .await
        .expect("no reload within timeout")
        .expect("socket closed")
        .unwrap();
    assert_eq!(frame.to_text().unwrap(), r#"{"command":"reload"}"#);

    socket.close(None).await.unwrap();
    wait_for_sessions(&server, 0).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_push_channel() {
    let dir = site();
    let mut server = WatcherServer::new(config(dir.path().to_path_buf()), None).unwrap();
    let addr = server.listen().await.unwrap();

    let url = format!("ws://127.0.0.1:{}/httpwatcher", addr.port());
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    wait_for_sessions(&server, 1).await;

    server.shutdown().await;

    let frame = tokio::time::timeout(RELOAD_TIMEOUT, socket.next())
        .await
        .expect("socket not closed on shutdown");
    assert!(
        matches!(frame, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "{frame:?}"
    );
}

#[tokio::test]
async fn test_failing_hook_does_not_block_reload() {
    let dir = site();
    let hook: ReloadHook = Arc::new(|_: &[RawChangeEvent]| -> Result<(), HookError> {
        Err("rebuild failed".into())
    });

    let mut server = WatcherServer::new(config(dir.path().to_path_buf()), Some(hook)).unwrap();
    server.listen().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    server.broadcaster().register_session(SessionId::new(), tx);

    fs::write(dir.path().join("index.html"), "<html><body>Edited</body></html>").unwrap();

    let message = tokio::time::timeout(RELOAD_TIMEOUT, rx.recv())
        .await
        .expect("no reload within timeout");
    assert_eq!(message, Some(ReloadMessage::reload()));

    server.shutdown().await;
}

#[tokio::test]
async fn test_extra_watch_path_triggers_reload() {
    let site_dir = site();
    let sources = tempfile::tempdir().unwrap();

    let mut server = WatcherServer::new(
        ServerConfig {
            watch_paths: Some(vec![sources.path().to_path_buf()]),
            ..config(site_dir.path().to_path_buf())
        },
        None,
    )
    .unwrap();
    server.listen().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    server.broadcaster().register_session(SessionId::new(), tx);

    fs::write(sources.path().join("main.scss"), "body {}").unwrap();

    let message = tokio::time::timeout(RELOAD_TIMEOUT, rx.recv())
        .await
        .expect("no reload within timeout");
    assert_eq!(message, Some(ReloadMessage::reload()));

    server.shutdown().await;
}

#[test]
fn test_missing_root_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let err = WatcherServer::new(config(missing.clone()), None)
        .err()
        .unwrap();
    assert!(matches!(err, ServerError::MissingRoot(ref p) if *p == missing));
    assert!(err.to_string().starts_with("Cannot find folder: "));
}

#[test]
fn test_invalid_base_path_rejected() {
    let dir = site();
    let err = WatcherServer::new(
        ServerConfig {
            base_path: "/docs/../secret".to_owned(),
            ..config(dir.path().to_path_buf())
        },
        None,
    )
    .err()
    .unwrap();
    assert!(matches!(err, ServerError::InvalidBasePath(_)));
}
