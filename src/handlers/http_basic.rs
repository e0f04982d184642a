// SPDX-License-Identifier: MIT
// HTTP Basic authentication probe against port 80/443.

use std::time::Duration;

use base64::Engine;
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

fn basic_auth_header(username: &str, password: &str) -> String {
    let raw = format!("{username}:{password}");
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
}

async fn attempt(
    dialer: &Dialer,
    target: &Target,
    username: &str,
    password: &str,
) -> Result<bool, ScanError> {
    let client = dialer.http_client()?;
    let scheme = if target.encryption.is_tls() { "https" } else { "http" };
    let url = format!("{scheme}://{}/", target.addr());

    let mut req = client
        .get(&url)
        .header("Authorization", basic_auth_header(username, password));
    if let Some(host) = target.original_host() {
        req = req.header(reqwest::header::HOST, host);
    }

    let resp = req.send().await.map_err(|e| ScanError::Transport(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    match resp.status().as_u16() {
        200 | 302 => Ok(true),
        401 | 403 => Ok(false),
        other => Err(ScanError::protocol(format!("unexpected status {other}"))),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_user_colon_pass() {
        let header = basic_auth_header("admin", "admin");
        assert_eq!(header, "Basic YWRtaW46YWRtaW4=");
    }
}
