// SPDX-License-Identifier: MIT
// Cisco IOS enable-mode password brute-force: login to user-mode, then enable.
//
// credential.username reaches user-mode (and doubles as the line password
// where a user-mode "Password:" prompt appears); credential.password is the
// only value tested against the enable secret prompt.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn read_until_prompt(stream: &mut tokio::net::TcpStream, markers: &[&str]) -> Result<String, ScanError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await.map_err(ScanError::from)?;
        if n == 0 {
            return Err(ScanError::protocol("connection closed while waiting for prompt"));
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if markers.iter().any(|m| text.contains(m)) {
            return Ok(text.to_string());
        }
        if buf.len() > 16 * 1024 {
            return Err(ScanError::protocol("prompt not found within read budget"));
        }
    }
}

async fn attempt(dialer: &Dialer, target: &Target, username: &str, password: &str) -> Result<bool, ScanError> {
    let addr = format!("{}:{}", target.ip, target.port)
        .parse()
        .map_err(|_| ScanError::protocol("invalid socket address"))?;
    let mut stream = dialer.dial(addr).await?;

    let initial = read_until_prompt(&mut stream, &["Username:", "login:", "Password:"]).await?;
    let lower = initial.to_ascii_lowercase();

    if lower.contains("username:") || lower.contains("login:") {
        stream.write_all(format!("{username}\r\n").as_bytes()).await.map_err(ScanError::from)?;
        read_until_prompt(&mut stream, &["Password:"]).await?;
    }

    stream.write_all(format!("{username}\r\n").as_bytes()).await.map_err(ScanError::from)?;

    let login_resp = read_until_prompt(
        &mut stream,
        &[">", "#", "invalid", "failed", "Authentication failed"],
    )
    .await?;
    if !login_resp.contains('>') && !login_resp.contains('#') {
        return Ok(false);
    }

    stream.write_all(b"enable\r\n").await.map_err(ScanError::from)?;
    read_until_prompt(&mut stream, &["Password:"]).await?;

    stream.write_all(format!("{password}\r\n").as_bytes()).await.map_err(ScanError::from)?;
    let enable_resp = read_until_prompt(
        &mut stream,
        &["#", "% Access denied", "% Bad passwords", "% No password set"],
    )
    .await?;

    Ok(enable_resp.contains('#'))
}

pub fn checker<'a>(target: &'a Target, dialer: &'a Dialer, timeout: Duration) -> CheckerFuture<'a> {
    no_default_creds_checker(target, dialer, timeout)
}

pub fn handler<'a>(
    ctx: &'a CancellationToken,
    dialer: &'a Dialer,
    timeout: Duration,
    target: &'a Target,
    credential: &'a Credential,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let fut = attempt(dialer, target, &credential.username, &credential.password);
        tokio::select! {
            _ = ctx.cancelled() => Outcome::Transport(ScanError::Cancelled),
            result = tokio::time::timeout(timeout, fut) => {
                match result {
                    Ok(Ok(true)) => Outcome::Success,
                    Ok(Ok(false)) => Outcome::AuthFail,
                    Ok(Err(e)) => Outcome::Protocol(e),
                    Err(_) => Outcome::Transport(ScanError::Timeout(timeout)),
                }
            }
        }
    })
}
