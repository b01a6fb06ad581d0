// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Development server with live reload
//!
//! Serves a directory over HTTP. HTML pages get a small client script that
//! opens a WebSocket; reload signals from finished tasks are pushed to every
//! connected browser as `reload` (full page) or `css` (stylesheets only).

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{ReloadScope, ServerConfig};

/// Path of the injected client script
pub const CLIENT_SCRIPT_PATH: &str = "/__assetflow/client.js";

/// Path of the reload WebSocket
pub const SOCKET_PATH: &str = "/__assetflow/ws";

const CLIENT_SCRIPT: &str = include_str!("client.js");

#[derive(Clone)]
struct AppState {
    root: PathBuf,
    reload: broadcast::Sender<ReloadScope>,
    shutdown: watch::Receiver<bool>,
}

/// Static file server with live reload
pub struct DevServer;

impl DevServer {
    /// Bind and start serving; `config.root` resolves against `project_root`
    pub async fn start(
        config: &ServerConfig,
        project_root: &Path,
        reload: broadcast::Sender<ReloadScope>,
    ) -> AssetflowResult<DevServerHandle> {
        let root = project_root.join(&config.root);
        if !root.is_dir() {
            return Err(AssetflowError::Server {
                message: format!("server root '{}' is not a directory", root.display()),
                help: Some("Set `develop.server.root` in your pipeline file".to_string()),
            });
        }

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| AssetflowError::Server {
                message: format!("failed to bind {}:{}: {}", config.host, config.port, e),
                help: Some("Is another server already using this port? Try --port".to_string()),
            })?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState {
            root,
            reload,
            shutdown: shutdown_rx.clone(),
        };

        let app = router(state);
        let mut stop = shutdown_rx;
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "dev server stopped unexpectedly");
            }
        });

        tracing::info!("Dev server listening on http://{}", addr);

        Ok(DevServerHandle {
            addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(CLIENT_SCRIPT_PATH, get(client_script))
        .route(SOCKET_PATH, get(socket_upgrade))
        .fallback(serve_static)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Running dev server
pub struct DevServerHandle {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DevServerHandle {
    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Close all client connections and the listener
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "dev server task did not shut down cleanly");
        }
        tracing::info!("Dev server stopped");
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn socket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let reload = state.reload.subscribe();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| client_session(socket, reload, shutdown))
}

/// Forward reload signals to one browser until it leaves or the server stops
async fn client_session(
    mut socket: WebSocket,
    mut reload: broadcast::Receiver<ReloadScope>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("browser connected");

    loop {
        tokio::select! {
            signal = reload.recv() => match signal {
                Ok(scope) => {
                    if socket.send(Message::Text(scope.as_str().into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "browser missed reload signals");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            changed = shutdown.changed() => {
                let stopped = changed.is_err() || *shutdown.borrow();
                if stopped {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    tracing::debug!("browser disconnected");
}

async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(mut path) = resolve_request_path(&state.root, uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if path.is_dir() {
        path = path.join("index.html");
    }

    let contents = match tokio::fs::read(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    if mime.essence_str() == "text/html" {
        let html = String::from_utf8_lossy(&contents);
        let body = inject_client_script(&html);
        return ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response();
    }

    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], contents).into_response()
}

/// Map a request path onto the served directory, rejecting escapes
fn resolve_request_path(root: &Path, request: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in request.split('/').filter(|s| !s.is_empty()) {
        let segment = Path::new(segment);
        match segment.components().next() {
            Some(Component::Normal(part)) if segment.components().count() == 1 => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}

/// Add the live reload script before `</body>` (or at the end)
pub fn inject_client_script(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", CLIENT_SCRIPT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => format!("{}{}\n{}", &html[..idx], tag, &html[idx..]),
        None => format!("{}\n{}\n", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get_raw(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_inject_client_script() {
        let html = inject_client_script("<html><BODY><p>hi</p></BODY></html>");
        assert_eq!(
            html,
            "<html><BODY><p>hi</p><script src=\"/__assetflow/client.js\"></script>\n</BODY></html>"
        );

        let fragment = inject_client_script("<p>hi</p>");
        assert!(fragment.ends_with("<script src=\"/__assetflow/client.js\"></script>\n"));
    }

    #[test]
    fn test_resolve_request_path_rejects_traversal() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_request_path(root, "/contents/css/all.css"),
            Some(PathBuf::from("/srv/site/contents/css/all.css"))
        );
        assert_eq!(resolve_request_path(root, "/"), Some(PathBuf::from("/srv/site")));
        assert_eq!(resolve_request_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_request_path(root, "/a/./b"), None);
    }

    #[tokio::test]
    async fn test_serves_files_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/contents/css")).unwrap();
        std::fs::write(
            dir.path().join("src/index.html"),
            "<html><body>home</body></html>",
        )
        .unwrap();
        std::fs::write(dir.path().join("src/contents/css/app.css"), "body{}").unwrap();

        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let (reload, _) = broadcast::channel(4);
        let server = DevServer::start(&config, dir.path(), reload).await.unwrap();
        let addr = server.local_addr();

        let index = get_raw(addr, "/").await;
        assert!(index.starts_with("HTTP/1.1 200"));
        assert!(index.contains("home"));
        assert!(index.contains(CLIENT_SCRIPT_PATH));

        let css = get_raw(addr, "/contents/css/app.css").await;
        assert!(css.contains("text/css"));
        assert!(css.ends_with("body{}"));

        let script = get_raw(addr, CLIENT_SCRIPT_PATH).await;
        assert!(script.contains("WebSocket"));

        let missing = get_raw(addr, "/nope.html").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        server.stop().await;
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_reload_signals_reach_connected_browser() {
        use futures_util::StreamExt;
        use std::time::Duration;
        use tokio_tungstenite::tungstenite::Message as WsMessage;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();

        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let (reload, _keep) = broadcast::channel(4);
        let server = DevServer::start(&config, dir.path(), reload.clone())
            .await
            .unwrap();

        let url = format!("ws://{}{}", server.local_addr(), SOCKET_PATH);
        let (mut browser, _) = tokio_tungstenite::connect_async(url).await.unwrap();

        // The session subscribes before the upgrade response is sent
        reload.send(ReloadScope::Css).unwrap();
        reload.send(ReloadScope::Full).unwrap();

        let mut received = Vec::new();
        while received.len() < 2 {
            let message = tokio::time::timeout(Duration::from_secs(5), browser.next())
                .await
                .expect("no reload signal within 5s")
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = message {
                received.push(text.as_str().to_string());
            }
        }
        assert_eq!(received, vec!["css", "reload"]);

        server.stop().await;
        let closing = tokio::time::timeout(Duration::from_secs(5), browser.next())
            .await
            .expect("socket not closed on shutdown");
        assert!(matches!(closing, Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None));
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            port: 0,
            root: PathBuf::from("does-not-exist"),
            ..ServerConfig::default()
        };
        let (reload, _) = broadcast::channel(4);
        assert!(matches!(
            DevServer::start(&config, dir.path(), reload).await,
            Err(AssetflowError::Server { .. })
        ));
    }
}
