use bytes::Bytes;
use reqwest::{Method, header::HeaderMap};
use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

use volley::{
    DispatchPlan, FailureKind, Job, Outcome, RequestSender,
    http::{HttpOptions, HttpSender, StatusPolicy, parse_header},
};

/// Minimal keep-alive HTTP/1.1 server answering every request the same way.
struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl TestServer {
    async fn start(status: u16, body: &'static str) -> Self {
        Self::start_with(Some((status, body))).await
    }

    /// A server that reads requests but never answers.
    async fn silent() -> Self {
        Self::start_with(None).await
    }

    async fn start_with(reply: Option<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, requests) = mpsc::unbounded_channel();

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let counter = counter.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = handle_client(socket, reply, counter, tx).await;
                });
            }
        });

        Self {
            addr,
            hits,
            requests,
        }
    }

    fn url(&self) -> String {
        format!("http://{}/catcher", self.addr)
    }
}

async fn handle_client(
    mut socket: TcpStream,
    reply: Option<(u16, &'static str)>,
    hits: Arc<AtomicUsize>,
    requests: mpsc::UnboundedSender<Vec<u8>>,
) -> std::io::Result<()> {
    loop {
        let Some(request) = read_request(&mut socket).await? else {
            return Ok(());
        };
        hits.fetch_add(1, Ordering::SeqCst);
        let _ = requests.send(request);

        let Some((status, body)) = reply else {
            std::future::pending::<()>().await;
            return Ok(());
        };
        let response = format!(
            "HTTP/1.1 {status} Test\r\ncontent-length: {}\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await?;
    }
}

/// Read one request (head and body) or `None` once the client hangs up.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(Some(buf))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn sender(policy: StatusPolicy) -> HttpSender {
    HttpSender::new(HttpOptions::builder().status_policy(policy).build()).unwrap()
}

#[tokio::test]
async fn success_records_status_and_body_length() {
    let server = TestServer::start(200, "hello").await;

    let outcome = sender(StatusPolicy::Accept)
        .send(&server.url(), Bytes::from_static(b"{}"), None)
        .await;

    match outcome {
        Outcome::Success { status, bytes, .. } => {
            assert_eq!(status, 200);
            assert_eq!(bytes, 5);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn method_headers_and_payload_reach_the_server() {
    let mut server = TestServer::start(204, "").await;
    let mut headers = HeaderMap::new();
    let (name, value) = parse_header("X-Catcher: php").unwrap();
    headers.insert(name, value);
    let sender = HttpSender::new(
        HttpOptions::builder()
            .method(Method::PUT)
            .headers(headers)
            .build(),
    )
    .unwrap();

    let outcome = sender
        .send(&server.url(), Bytes::from_static(br#"{"token":"abc"}"#), None)
        .await;
    assert!(outcome.is_success());

    let raw = server.requests.recv().await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.starts_with("PUT /catcher HTTP/1.1"));
    assert!(text.to_ascii_lowercase().contains("x-catcher: php"));
    assert!(text.ends_with(r#"{"token":"abc"}"#));
}

#[tokio::test]
async fn status_policy_decides_on_server_errors() {
    let server = TestServer::start(503, "busy").await;

    let accepted = sender(StatusPolicy::Accept)
        .send(&server.url(), Bytes::new(), None)
        .await;
    assert!(accepted.is_success());
    assert_eq!(accepted.status(), Some(503));

    let rejected = sender(StatusPolicy::ServerErrors)
        .send(&server.url(), Bytes::new(), None)
        .await;
    assert_eq!(rejected.failure_kind(), Some(FailureKind::Status(503)));
}

#[tokio::test]
async fn client_errors_only_fail_under_strict_policy() {
    let server = TestServer::start(404, "").await;

    let lenient = sender(StatusPolicy::ServerErrors)
        .send(&server.url(), Bytes::new(), None)
        .await;
    assert!(lenient.is_success());

    let strict = sender(StatusPolicy::Errors)
        .send(&server.url(), Bytes::new(), None)
        .await;
    assert_eq!(strict.failure_kind(), Some(FailureKind::Status(404)));
}

#[tokio::test]
async fn refused_connection_is_a_connection_failure() {
    // Grab a free port, then close it again.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let outcome = sender(StatusPolicy::Accept)
        .send(&format!("http://{addr}/"), Bytes::new(), None)
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Connection));
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let server = TestServer::silent().await;

    let outcome = sender(StatusPolicy::Accept)
        .send(&server.url(), Bytes::new(), Some(Duration::from_millis(100)))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
}

#[tokio::test]
async fn full_run_against_local_server() {
    let server = TestServer::start(200, "ok").await;
    let job = Job::new(server.url(), r#"{"catcher_type":"errors/php"}"#).unwrap();

    let summary = volley::run(
        DispatchPlan::new(50, 5).unwrap(),
        job,
        sender(StatusPolicy::Accept),
    )
    .await;

    assert_eq!(summary.total, 50);
    assert_eq!(summary.successes, 50);
    assert_eq!(summary.bytes, 100);
    assert_eq!(summary.statuses.get(&200), Some(&50));
    assert_eq!(server.hits.load(Ordering::SeqCst), 50);
    assert!(summary.duration > Duration::ZERO);
}

#[tokio::test]
async fn dispatcher_timeout_covers_silent_servers() {
    let server = TestServer::silent().await;
    let job = Job::new(server.url(), "")
        .unwrap()
        .with_timeout(Duration::from_millis(100));

    let summary = volley::run(
        DispatchPlan::new(4, 2).unwrap(),
        job,
        sender(StatusPolicy::Accept),
    )
    .await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.timeouts, 4);
    assert_eq!(summary.successes, 0);
}
