// SPDX-License-Identifier: MIT
// Asterisk Manager Interface (AMI) login, port 5038.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(dialer: &Dialer, target: &Target, username: &str, password: &str) -> Result<bool, ScanError> {
    let addr = format!("{}:{}", target.ip, target.port)
        .parse()
        .map_err(|_| ScanError::protocol("invalid socket address"))?;
    let stream = dialer.dial(addr).await?;
    let (rd, mut wr) = tokio::io::split(stream);
    let mut reader = BufReader::new(rd);

    let mut banner = String::new();
    reader.read_line(&mut banner).await.map_err(ScanError::from)?;
    if !banner.contains("Asterisk") {
        return Err(ScanError::protocol(format!("not an AMI server: {:?}", banner.trim())));
    }

    wr.write_all(format!("Action: Login\r\nUsername: {username}\r\nSecret: {password}\r\n\r\n").as_bytes())
        .await
        .map_err(ScanError::from)?;

    let mut response = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.map_err(ScanError::from)?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            response.push_str(trimmed);
            response.push(' ');
        }
        if n == 0 || trimmed.is_empty() {
            break;
        }
    }

    if response.contains("Response: Success") {
        Ok(true)
    } else if response.contains("Response: Error") {
        Ok(false)
    } else {
        Err(ScanError::protocol(format!("unexpected AMI response: {response}")))
    }
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
