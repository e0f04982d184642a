// SPDX-License-Identifier: MIT
// XMPP SASL PLAIN authentication, plaintext or STARTTLS per target.encryption.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(target: &Target, username: &str, password: &str) -> Result<bool, ScanError> {
    let domain = target.original_host().unwrap_or(&target.ip.to_string()).to_string();
    let jid_str = format!("{username}@{domain}");
    let jid: tokio_xmpp::jid::BareJid = jid_str
        .parse()
        .map_err(|e: tokio_xmpp::jid::Error| ScanError::protocol(e.to_string()))?;

    let config = if target.encryption.is_tls() {
        tokio_xmpp::AsyncClient::new(jid, password.to_string())
    } else {
        tokio_xmpp::AsyncClient::new_insecure_tcp(jid, password.to_string())
    };

    match config {
        Ok(mut client) => match client.wait_for_ready().await {
            Ok(()) => Ok(true),
            Err(e) => {
                let msg = e.to_string().to_ascii_lowercase();
                if msg.contains("not-authorized") || msg.contains("authentication failed") {
                    Ok(false)
                } else {
                    Err(ScanError::protocol(e.to_string()))
                }
            }
        },
        Err(e) => Err(ScanError::protocol(e.to_string())),
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
