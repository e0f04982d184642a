// SPDX-License-Identifier: MIT
// End-to-end HTTP Basic scenarios against a loopback mock server.

use std::time::Duration;

use bruter_rs::dialer::Dialer;
use bruter_rs::handlers::{http_basic, Outcome};
use bruter_rs::model::{Credential, Encryption, Target};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_mock(capture_host: bool) -> (std::net::SocketAddr, tokio::sync::oneshot::Receiver<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (rd, mut wr) = stream.into_split();
        let mut reader = BufReader::new(rd);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await.unwrap();

        let mut captured_host = None;
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await.unwrap();
            if n == 0 || line.trim().is_empty() {
                break;
            }
            if capture_host {
                if let Some(h) = line.strip_prefix("Host:").or_else(|| line.strip_prefix("host:")) {
                    captured_host = Some(h.trim().to_string());
                }
            }
        }

        wr.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let _ = tx.send(captured_host);
    });

    (addr, rx)
}

#[tokio::test]
async fn http_basic_success_returns_exactly_one_success() {
    let (addr, _rx) = spawn_mock(false).await;
    let target = Target {
        ip: addr.ip(),
        port: addr.port(),
        encryption: Encryption::Plain,
        original_target: addr.ip().to_string(),
    };
    let credential = Credential {
        username: "admin".into(),
        password: "admin".into(),
    };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let outcome = http_basic::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    assert!(matches!(outcome, Outcome::Success));
}

#[tokio::test]
async fn http_basic_sets_host_header_from_original_target() {
    let (addr, rx) = spawn_mock(true).await;
    let target = Target {
        ip: addr.ip(),
        port: addr.port(),
        encryption: Encryption::Plain,
        original_target: format!("example.com:{}", addr.port()),
    };
    let credential = Credential {
        username: "admin".into(),
        password: "admin".into(),
    };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let _ = http_basic::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    let captured = rx.await.unwrap();
    assert_eq!(captured.as_deref(), Some("example.com"));
}
