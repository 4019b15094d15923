//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use edge_proxy::config::ProxyConfig;
use edge_proxy::observability::events::LogEvent;
use edge_proxy::observability::MemorySink;
use edge_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What a mock backend sends back.
#[derive(Clone)]
pub enum MockReply {
    /// A complete response with `Content-Length`.
    Fixed {
        status_line: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    },
    /// A chunked response, each chunk written after its delay.
    Chunked {
        headers: Vec<(&'static str, &'static str)>,
        chunks: Vec<(u64, &'static str)>,
    },
    /// Accept the request and never answer.
    Hang,
}

impl MockReply {
    pub fn json(body: &'static str) -> Self {
        MockReply::Fixed {
            status_line: "200 OK",
            headers: vec![("Content-Type", "application/json")],
            body,
        }
    }

    pub fn event_stream(chunks: Vec<(u64, &'static str)>) -> Self {
        MockReply::Chunked {
            headers: vec![
                ("Content-Type", "text/event-stream"),
                ("Cache-Control", "no-cache"),
            ],
            chunks,
        }
    }
}

/// A raw-TCP HTTP/1.1 backend that records every request it receives.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub async fn start(reply: MockReply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let reply = reply.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    serve_one(socket, reply, recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Raw text (head and body) of each request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(mut socket: TcpStream, reply: MockReply, recorded: Arc<Mutex<Vec<String>>>) {
    let Some(raw) = read_request(&mut socket).await else {
        return;
    };
    recorded.lock().unwrap().push(raw);

    match reply {
        MockReply::Fixed {
            status_line,
            headers,
            body,
        } => {
            let mut head = format!("HTTP/1.1 {}\r\n", status_line);
            for (name, value) in headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            ));
            let _ = socket.write_all(head.as_bytes()).await;
        }
        MockReply::Chunked { headers, chunks } => {
            let mut head = String::from("HTTP/1.1 200 OK\r\n");
            for (name, value) in headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str("Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n");
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for (delay_ms, chunk) in chunks {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
        MockReply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// A proxy running on an ephemeral port, emitting into a [`MemorySink`].
pub struct TestProxy {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start(api_origin: &str, site_origin: &str) -> Self {
        let mut config = ProxyConfig::default();
        config.upstreams.api_origin = api_origin.to_string();
        config.upstreams.site_origin = site_origin.to_string();
        Self::start_with(config).await
    }

    pub async fn start_with(config: ProxyConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sink = Arc::new(MemorySink::new());
        let shutdown = Shutdown::new();

        let server = HttpServer::with_sink(config, sink.clone());
        let (_updates, config_updates) = mpsc::unbounded_channel();
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, config_updates, server_shutdown).await;
        });

        Self {
            addr,
            sink,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until `count` events of `kind` have been emitted.
    pub async fn wait_for(&self, kind: &str, count: usize) -> Vec<LogEvent> {
        for _ in 0..100 {
            let events = self.sink.events_of(kind);
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {} {} event(s)", count, kind);
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sink.events().iter().map(LogEvent::kind).collect()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Origin that refuses connections.
pub fn closed_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
