// SPDX-License-Identifier: MIT
// Telnet login authentication against standard Unix login/password prompts.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

/// Reads from `stream` a chunk at a time until the accumulated (lowercased)
/// buffer contains one of `markers`, returning the buffer as read so far.
async fn read_until_prompt(
    stream: &mut crate::dialer::EitherStream,
    markers: &[&str],
) -> Result<String, ScanError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await.map_err(ScanError::from)?;
        if n == 0 {
            return Err(ScanError::protocol("connection closed while waiting for prompt"));
        }
        buf.extend_from_slice(&chunk[..n]);
        let lower = String::from_utf8_lossy(&buf).to_ascii_lowercase();
        if markers.iter().any(|m| lower.contains(m)) {
            return Ok(lower);
        }
        if buf.len() > 16 * 1024 {
            return Err(ScanError::protocol("prompt not found within read budget"));
        }
    }
}

async fn attempt(
    dialer: &Dialer,
    target: &Target,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<bool, ScanError> {
    let sni = target.original_host().unwrap_or(&target.original_target).to_string();
    let addr = format!("{}:{}", target.ip, target.port)
        .parse()
        .map_err(|_| ScanError::protocol("invalid socket address"))?;
    let mut stream = dialer
        .dial_auto_context(addr, &sni, target.encryption.is_tls(), timeout)
        .await?;

    read_until_prompt(&mut stream, &["login:", "username:", "user:"]).await?;
    stream.write_all(format!("{username}\r\n").as_bytes()).await.map_err(ScanError::from)?;

    read_until_prompt(&mut stream, &["password:", "passwd:"]).await?;
    stream.write_all(format!("{password}\r\n").as_bytes()).await.map_err(ScanError::from)?;

    let banner = read_until_prompt(&mut stream, &["$", "#", ">", "incorrect", "failed", "denied"]).await?;
    Ok(banner.contains('$') || banner.contains('#') || banner.contains('>'))
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
        let fut = attempt(dialer, target, &credential.username, &credential.password, timeout);
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
