//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use portal_proxy::config::ProxyConfig;
use portal_proxy::http::HttpServer;
use portal_proxy::lifecycle::Shutdown;

pub const TOKEN_PATH: &str = "/_layouts/tokenhtml";

/// One request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Log = Arc<Mutex<Vec<Captured>>>;
type Responder = Arc<dyn Fn(&Captured) -> Response + Send + Sync>;

/// In-process upstream that records every request and answers through a
/// caller-supplied closure.
pub struct MockUpstream {
    pub addr: SocketAddr,
    log: Log,
}

impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}/_api", self.addr)
    }

    pub fn token_url(&self) -> String {
        format!("http://{}{}", self.addr, TOKEN_PATH)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.log.lock().unwrap().clone()
    }

    /// Requests that went to the data API, excluding token fetches.
    pub fn api_requests(&self) -> Vec<Captured> {
        self.requests()
            .into_iter()
            .filter(|c| c.path.starts_with("/_api"))
            .collect()
    }

    pub fn token_fetches(&self) -> usize {
        self.requests().iter().filter(|c| c.path == TOKEN_PATH).count()
    }
}

pub async fn start_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&Captured) -> Response + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let responder: Responder = Arc::new(respond);

    let app = Router::new()
        .fallback(capture)
        .with_state((log.clone(), responder));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, log }
}

async fn capture(
    State((log, respond)): State<(Log, Responder)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let captured = Captured {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };
    let response = respond(&captured);
    log.lock().unwrap().push(captured);
    response
}

pub fn respond(status: u16, headers: &[(&str, &str)], body: impl Into<Body>) -> Response {
    let mut builder = Response::builder().status(StatusCode::from_u16(status).unwrap());
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body.into()).unwrap()
}

pub fn json_response(status: u16, value: serde_json::Value) -> Response {
    respond(
        status,
        &[("content-type", "application/json; odata.metadata=minimal")],
        serde_json::to_vec(&value).unwrap(),
    )
}

pub fn token_fragment(value: &str) -> Response {
    respond(
        200,
        &[("content-type", "text/html; charset=utf-8")],
        format!(
            r#"<input name="__RequestVerificationToken" type="hidden" value="{}" />"#,
            value
        ),
    )
}

/// Backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Backend that promises a body it never finishes sending.
pub async fn start_truncating_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let partial = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 100\r\n\r\nonly ten b";
                let _ = socket.write_all(partial.as_bytes()).await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn proxy_config(upstream: &MockUpstream) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.base_url = upstream.base_url();
    config.upstream.token_url = Some(upstream.token_url());
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<ProxyConfig>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(mut config: ProxyConfig) -> RunningProxy {
    config.upstream.system_proxy = false;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    RunningProxy {
        addr,
        shutdown,
        config_updates,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
