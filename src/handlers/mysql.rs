// SPDX-License-Identifier: MIT
// MySQL authentication probe via a ping on a fresh connection.

use std::time::Duration;

use mysql_async::prelude::Queryable;
use mysql_async::{OptsBuilder, SslOpts};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(target: &Target, username: &str, password: &str) -> Result<bool, ScanError> {
    let mut opts = OptsBuilder::default()
        .ip_or_hostname(target.ip.to_string())
        .tcp_port(target.port)
        .user(Some(username))
        .pass(Some(password));

    if target.encryption.is_tls() {
        opts = opts.ssl_opts(Some(
            SslOpts::default().with_danger_accept_invalid_certs(true),
        ));
    }

    match mysql_async::Conn::new(opts).await {
        Ok(mut conn) => {
            let pinged = conn.ping().await;
            let _ = conn.disconnect().await;
            pinged.map(|_| true).or(Ok(false))
        }
        Err(e) => {
            let msg = e.to_string().to_ascii_lowercase();
            if msg.contains("access denied") || msg.contains("1045") {
                Ok(false)
            } else {
                Err(ScanError::protocol(e.to_string()))
            }
        }
    }
}

pub fn checker<'a>(target: &'a Target, dialer: &'a Dialer, timeout: Duration) -> CheckerFuture<'a> {
    no_default_creds_checker(target, dialer, timeout)
}

pub fn handler<'a>(
    ctx: &'a CancellationToken,
    _dialer: &'a Dialer,
    timeout: Duration,
    target: &'a Target,
    credential: &'a Credential,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let fut = attempt(target, &credential.username, &credential.password);
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
