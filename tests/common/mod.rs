//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Json, Router,
};
use futures_util::stream;
use passthrough_proxy::{HttpServer, ProxyConfig, Shutdown};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What the echo upstream has observed.
#[derive(Debug, Default)]
pub struct EchoStats {
    pub hits: AtomicUsize,
    pub peers: Mutex<HashSet<SocketAddr>>,
}

impl EchoStats {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn distinct_connections(&self) -> usize {
        self.peers.lock().unwrap().len()
    }
}

/// Proxy config forwarding `/passthrough` to `upstream` + `prefix`.
pub fn proxy_config(upstream: SocketAddr, prefix: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.url = format!("http://{}{}", upstream, prefix);
    config.upstream.mount_path = "/passthrough".into();
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// HTTP client that ignores any proxy configured in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Deterministic binary payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Start an upstream that answers with a JSON description of each request,
/// trailer fields included.
///
/// Paths ending in `/slow` stall for ten seconds first. Paths containing
/// `/bulk/<n>` answer with `n` pattern bytes streamed in 16 KiB chunks.
/// Paths containing `/status/<code>` answer with that status.
pub async fn start_echo_upstream() -> (SocketAddr, Arc<EchoStats>) {
    let stats = Arc::new(EchoStats::default());
    let app = Router::new().fallback(echo).with_state(stats.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });

    (addr, stats)
}

async fn echo(
    State(stats): State<Arc<EchoStats>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    stats.hits.fetch_add(1, Ordering::SeqCst);
    stats.peers.lock().unwrap().insert(peer);

    let path = request.uri().path().to_string();

    if path.ends_with("/slow") {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    if let Some(n) = path.split("/bulk/").nth(1) {
        let total: usize = n.parse().unwrap();
        let data = pattern(total);
        let chunks: Vec<Result<Bytes, std::io::Error>> = data
            .chunks(16 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        return Response::new(Body::from_stream(stream::iter(chunks)));
    }

    if let Some(code) = path.split("/status/").nth(1) {
        let status = axum::http::StatusCode::from_u16(code.parse().unwrap()).unwrap();
        return (status, format!("status {}", code)).into_response();
    }

    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in request.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let mut incoming = request.into_body();
    let mut body = Vec::new();
    let mut trailers: BTreeMap<String, String> = BTreeMap::new();
    while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut incoming).poll_frame(cx)).await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(_) => return axum::http::StatusCode::BAD_REQUEST.into_response(),
        };
        match frame.into_data() {
            Ok(data) => body.extend_from_slice(&data),
            Err(frame) => {
                if let Ok(fields) = frame.into_trailers() {
                    for (name, value) in &fields {
                        trailers.insert(
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        );
                    }
                }
            }
        }
    }

    Json(json!({
        "method": method,
        "uri": uri,
        "headers": headers,
        "body_len": body.len(),
        "body": String::from_utf8_lossy(&body),
        "trailers": trailers,
    }))
    .into_response()
}

/// Start an upstream that reads a request head and writes `response` verbatim.
pub async fn start_raw_upstream(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_head(&mut socket).await;
                        let _ = socket.write_all(response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an upstream that accepts connections and never answers.
pub async fn start_silent_upstream() -> SocketAddr {
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

/// An address with nothing listening on it.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start an upstream whose single response body is fed through the returned
/// channel. Dropping the sender ends the body.
pub async fn start_streaming_upstream() -> (SocketAddr, mpsc::Sender<&'static str>) {
    let (tx, rx) = mpsc::channel::<&'static str>(8);
    let rx = Arc::new(tokio::sync::Mutex::new(Some(rx)));

    let app = Router::new().fallback(move || {
        let rx = rx.clone();
        async move {
            let rx = rx.lock().await.take().expect("streaming upstream serves one request");
            let body = stream::unfold(rx, |mut rx| async move {
                rx.recv()
                    .await
                    .map(|chunk| (Ok::<_, std::io::Error>(chunk), rx))
            });
            Response::builder()
                .header("content-type", "text/event-stream")
                .body(Body::from_stream(body))
                .unwrap()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, tx)
}

async fn read_head(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => return,
            Ok(_) => buf.push(byte[0]),
        }
    }
}

/// Send a raw HTTP/1.1 request and return every byte until the server closes.
pub async fn raw_exchange(addr: SocketAddr, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .expect("response within 5s")
        .unwrap();
    raw
}

/// Send a raw HTTP/1.1 request and read the response until the server closes.
///
/// Returns the lowercase-keyed head lines and the (de-chunked) body.
pub async fn raw_request(addr: SocketAddr, request: &str) -> (String, Vec<u8>) {
    let raw = raw_exchange(addr, request).await;

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("complete response head");
    let head = String::from_utf8_lossy(&raw[..split]).to_lowercase();
    let body = raw[split + 4..].to_vec();

    if head.contains("transfer-encoding: chunked") {
        (head, dechunk(&body))
    } else {
        (head, body)
    }
}

fn dechunk(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let line_end = data.windows(2).position(|w| w == b"\r\n").unwrap();
        let size_str = String::from_utf8_lossy(&data[..line_end]);
        let size = usize::from_str_radix(size_str.split(';').next().unwrap().trim(), 16).unwrap();
        data = &data[line_end + 2..];
        if size == 0 {
            return out;
        }
        out.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}
