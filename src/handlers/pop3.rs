// SPDX-License-Identifier: MIT
// POP3 USER/PASS authentication (RFC 1939) over plain TCP or TLS.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(
    dialer: &Dialer,
    target: &Target,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<bool, ScanError> {
    let sni = target.original_host().unwrap_or(&target.original_target).to_string();
    let addr = format!("{}:{}", target.ip, target.port).parse().map_err(|_| {
        ScanError::protocol("invalid socket address")
    })?;
    let stream = dialer
        .dial_auto_context(addr, &sni, target.encryption.is_tls(), timeout)
        .await?;
    let (rd, mut wr) = tokio::io::split(stream);
    let mut reader = BufReader::new(rd);

    let mut greeting = String::new();
    reader.read_line(&mut greeting).await.map_err(ScanError::from)?;
    if !greeting.starts_with("+OK") {
        return Err(ScanError::protocol(format!("unexpected POP3 greeting: {greeting:?}")));
    }

    wr.write_all(format!("USER {username}\r\n").as_bytes()).await.map_err(ScanError::from)?;
    let mut user_resp = String::new();
    reader.read_line(&mut user_resp).await.map_err(ScanError::from)?;
    if !user_resp.starts_with("+OK") {
        return Ok(false);
    }

    wr.write_all(format!("PASS {password}\r\n").as_bytes()).await.map_err(ScanError::from)?;
    let mut pass_resp = String::new();
    reader.read_line(&mut pass_resp).await.map_err(ScanError::from)?;

    Ok(pass_resp.starts_with("+OK"))
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
