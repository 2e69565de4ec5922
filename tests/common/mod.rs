//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use transparent_proxy::config::ProxyConfig;
use transparent_proxy::net::Listener;
use transparent_proxy::{HttpServer, Shutdown};

/// What the mock origin saw on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl CapturedRequest {
    /// First value of a header, name matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }
}

/// A raw-TCP origin that records every request and answers with a fixed response.
pub struct MockOrigin {
    pub addr: SocketAddr,
    pub requests: mpsc::UnboundedReceiver<CapturedRequest>,
    connections: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockOrigin {
    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn next_request(&mut self) -> CapturedRequest {
        self.requests.recv().await.expect("origin stopped")
    }
}

/// Start an origin that answers every request with `response` (a full HTTP/1.1
/// response including status line) and then closes the connection.
pub async fn start_origin(response: impl Into<String>) -> MockOrigin {
    spawn_origin(response.into(), false).await
}

/// Like [`start_origin`], but the connection stays open after each response and
/// further requests on it are served too. A client that reuses connections shows
/// up as fewer `connections()` than requests.
#[allow(dead_code)]
pub async fn start_keepalive_origin(response: impl Into<String>) -> MockOrigin {
    spawn_origin(response.into(), true).await
}

async fn spawn_origin(response: String, keep_alive: bool) -> MockOrigin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response: Arc<str> = Arc::from(response);
    let connections = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded_channel();

    let accepted = connections.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                if keep_alive {
                    // Serve until the client closes its side.
                    while let Some(captured) = read_request(&mut socket).await {
                        let _ = tx.send(captured);
                        if socket.get_mut().write_all(response.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    return;
                }

                if let Some(captured) = read_request(&mut socket).await {
                    let _ = tx.send(captured);
                }
                let socket = socket.get_mut();
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockOrigin {
        addr,
        requests: rx,
        connections,
    }
}

/// Plain response with a `Content-Length` body.
#[allow(dead_code)]
pub fn response(status_line: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in extra_headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n{body}", body.len()));
    out
}

async fn read_request(socket: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut request_line = String::new();
    if socket.read_line(&mut request_line).await.ok()? == 0 {
        return None;
    }

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        socket.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let find = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let mut body: Vec<u8> = Vec::new();
    if let Some(length) = find("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.resize(length, 0);
        socket.read_exact(&mut body).await.ok()?;
    } else if find("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        loop {
            let mut size_line = String::new();
            socket.read_line(&mut size_line).await.ok()?;
            let size = usize::from_str_radix(size_line.trim(), 16).ok()?;
            let mut chunk = vec![0u8; size + 2];
            socket.read_exact(&mut chunk).await.ok()?;
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
    }

    Some(CapturedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    })
}

/// Start the proxy on an ephemeral loopback port. Keep the returned `Shutdown`
/// alive for as long as the proxy should run.
pub async fn start_proxy(mut config: ProxyConfig) -> (SocketAddr, Shutdown) {
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client that talks to the proxy directly and never follows redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// `http://<proxy>/?url=<percent-encoded target>`
#[allow(dead_code)]
pub fn relay_url(proxy: SocketAddr, target: &str) -> String {
    format!("http://{proxy}/?url={}", urlencoding::encode(target))
}
