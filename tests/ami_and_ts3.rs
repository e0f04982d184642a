// SPDX-License-Identifier: MIT
// Asterisk AMI and TeamSpeak 3 ServerQuery success/failure scenarios.

use std::time::Duration;

use bruter_rs::dialer::Dialer;
use bruter_rs::handlers::{asterisk, teamspeak, Outcome};
use bruter_rs::model::{Credential, Encryption, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn mock_ami(response_block: &'static str) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"Asterisk Call Manager/5.0.0\r\n").await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await;
        stream.write_all(response_block.as_bytes()).await.unwrap();
    });
    addr
}

async fn mock_ts3(reply_line: &'static str) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"TS3\n").await.unwrap();
        stream.write_all(b"Welcome to the TeamSpeak 3 ServerQuery interface.\n").await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await;
        stream.write_all(reply_line.as_bytes()).await.unwrap();
    });
    addr
}

fn target_at(addr: std::net::SocketAddr) -> Target {
    Target {
        ip: addr.ip(),
        port: addr.port(),
        encryption: Encryption::Plain,
        original_target: addr.ip().to_string(),
    }
}

#[tokio::test]
async fn ami_login_success() {
    let addr = mock_ami("Response: Success\r\nMessage: Authentication accepted\r\n\r\n").await;
    let target = target_at(addr);
    let credential = Credential { username: "admin".into(), password: "admin".into() };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let outcome = asterisk::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    assert!(matches!(outcome, Outcome::Success));
}

#[tokio::test]
async fn ami_login_failure_is_auth_fail() {
    let addr = mock_ami("Response: Error\r\nMessage: Authentication failed\r\n\r\n").await;
    let target = target_at(addr);
    let credential = Credential { username: "admin".into(), password: "wrong".into() };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let outcome = asterisk::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    assert!(matches!(outcome, Outcome::AuthFail));
}

#[tokio::test]
async fn ts3_login_success() {
    let addr = mock_ts3("error id=0 msg=ok\n\r").await;
    let target = target_at(addr);
    let credential = Credential { username: "serveradmin".into(), password: "admin".into() };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let outcome = teamspeak::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    assert!(matches!(outcome, Outcome::Success));
}

#[tokio::test]
async fn ts3_login_failure_is_auth_fail() {
    let addr = mock_ts3("error id=520 msg=invalid\\spermissions\n\r").await;
    let target = target_at(addr);
    let credential = Credential { username: "serveradmin".into(), password: "wrong".into() };
    let dialer = Dialer::new(None);
    let ctx = CancellationToken::new();

    let outcome = teamspeak::handler(&ctx, &dialer, Duration::from_secs(2), &target, &credential).await;
    assert!(matches!(outcome, Outcome::AuthFail));
}
