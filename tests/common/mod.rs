//! Shared helpers for integration tests: mock backends, a mock DNS server
//! and deterministic pipeline components.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{rdata::A, RData, Record, RecordType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;

use resilient_http::dns::{Resolve, ResolveError, Resolving};
use resilient_http::net::AddressPicker;

/// Install a log subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Resolver stub returning a fixed address set for every host.
#[derive(Debug)]
pub struct StaticResolver {
    addrs: Vec<IpAddr>,
}

impl StaticResolver {
    pub fn new(addrs: Vec<IpAddr>) -> Arc<Self> {
        Arc::new(Self { addrs })
    }

    /// A primary resolver that always comes back empty, forcing the
    /// fallback path.
    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, _host: &str) -> Resolving {
        let addrs = self.addrs.clone();
        Box::pin(async move { Ok(addrs) })
    }
}

/// Resolver stub that always fails.
#[derive(Debug)]
pub struct FailingResolver;

impl Resolve for FailingResolver {
    fn resolve(&self, host: &str) -> Resolving {
        let host = host.to_string();
        Box::pin(async move {
            Err(ResolveError::System {
                host,
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
            })
        })
    }
}

/// Picker that replays a fixed index sequence.
#[derive(Debug)]
pub struct SequencePicker {
    sequence: Vec<usize>,
    next: AtomicUsize,
}

impl SequencePicker {
    pub fn new(sequence: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            sequence,
            next: AtomicUsize::new(0),
        })
    }
}

impl AddressPicker for SequencePicker {
    fn pick(&self, len: usize) -> usize {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.sequence[i % self.sequence.len()] % len
    }
}

/// Start an HTTP/1.1 backend that captures each raw request and answers
/// 200 with `body` (empty for HEAD). Connections are closed per request.
pub async fn start_http_backend(
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(handle_http(socket, body, tx));
        }
    });

    (addr, rx)
}

pub async fn handle_http(
    mut socket: TcpStream,
    body: &'static str,
    tx: mpsc::UnboundedSender<String>,
) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    let header_end = loop {
        let Ok(n) = socket.read(&mut tmp).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let Ok(n) = socket.read(&mut tmp).await else {
            return;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let _ = tx.send(String::from_utf8_lossy(&buf).to_string());

    let payload = if head.starts_with("HEAD ") { "" } else { body };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a UDP DNS server answering A queries from `records`, counting
/// queries received. Unknown names get NXDOMAIN.
pub async fn start_dns_server(
    records: Vec<(&str, Ipv4Addr)>,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let queries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&queries);
    let records: Vec<(String, Ipv4Addr)> = records
        .into_iter()
        .map(|(host, ip)| (host.to_string(), ip))
        .collect();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let Ok(query) = Message::from_vec(&buf[..len]) else {
                continue;
            };

            let mut response = Message::new();
            response.set_id(query.id());
            response.set_message_type(MessageType::Response);
            response.set_recursion_desired(true);
            response.set_recursion_available(true);
            for q in query.queries() {
                response.add_query(q.clone());
                if q.query_type() != RecordType::A {
                    continue;
                }
                let name = q.name().to_utf8();
                let name = name.trim_end_matches('.');
                for (host, ip) in &records {
                    if name.eq_ignore_ascii_case(host) {
                        response.add_answer(Record::from_rdata(
                            q.name().clone(),
                            60,
                            RData::A(A::from(*ip)),
                        ));
                    }
                }
            }
            if response.answers().is_empty() {
                response.set_response_code(ResponseCode::NXDomain);
            }
            if let Ok(bytes) = response.to_vec() {
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });

    (addr, queries)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
