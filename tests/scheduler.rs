// SPDX-License-Identifier: MIT
// Scheduler-level properties: delay discipline and prompt cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bruter_rs::dialer::Dialer;
use bruter_rs::model::{Encryption, Protocol, Target};
use bruter_rs::scheduler::{self, ScanOptions};
use bruter_rs::sink::{OutputFormat, ResultSink};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn mock_http_always_401() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let _ = stream
                    .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn delay_enforces_sequential_spacing() {
    let addr = mock_http_always_401().await;
    let target = Target {
        ip: addr.ip(),
        port: addr.port(),
        encryption: Encryption::Plain,
        original_target: addr.ip().to_string(),
    };

    let opts = ScanOptions {
        timeout: Duration::from_secs(2),
        parallel: 1,
        threads: 10,
        delay: Duration::from_millis(50),
        usernames: Arc::new(vec!["admin".to_string()]),
        passwords: Arc::new(vec![
            "p1".to_string(),
            "p2".to_string(),
            "p3".to_string(),
            "p4".to_string(),
            "p5".to_string(),
        ]),
    };
    assert_eq!(opts.effective_threads(), 1);

    let dialer = Dialer::new(None);
    let sink = ResultSink::new(None, OutputFormat::Plain).await.unwrap();
    let ctx = CancellationToken::new();

    let start = Instant::now();
    scheduler::run(Protocol::Http, vec![target], opts, dialer, sink, ctx)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(180), "elapsed={elapsed:?}");
}

async fn mock_http_hangs() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            // Accept but never write a response, forcing callers onto their timeout.
            std::mem::forget(stream);
        }
    });
    addr
}

#[tokio::test]
async fn cancellation_stops_the_scan_promptly() {
    let addr = mock_http_hangs().await;
    let targets: Vec<Target> = (0..3)
        .map(|_| Target {
            ip: addr.ip(),
            port: addr.port(),
            encryption: Encryption::Plain,
            original_target: addr.ip().to_string(),
        })
        .collect();

    let opts = ScanOptions {
        timeout: Duration::from_secs(10),
        parallel: 3,
        threads: 2,
        delay: Duration::ZERO,
        usernames: Arc::new(vec!["a".to_string(), "b".to_string()]),
        passwords: Arc::new(vec!["p1".to_string(), "p2".to_string()]),
    };

    let dialer = Dialer::new(None);
    let sink = ResultSink::new(None, OutputFormat::Plain).await.unwrap();
    let ctx = CancellationToken::new();
    let cancel_handle = ctx.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_handle.cancel();
    });

    let start = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(3),
        scheduler::run(Protocol::Http, targets, opts, dialer, sink, ctx),
    )
    .await;

    assert!(result.is_ok(), "scheduler did not return promptly after cancellation");
    assert!(start.elapsed() < Duration::from_secs(3));
}
