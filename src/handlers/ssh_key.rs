// SPDX-License-Identifier: MIT
// SSH public-key authentication. credential.password carries PEM text or a
// path to a key file; credential.username is the SSH username.

use std::sync::Arc;
use std::time::Duration;

use russh::client;
use russh_keys::decode_secret_key;
use tokio_util::sync::CancellationToken;

use super::ssh::AcceptAllHostKeys;
use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn load_key(password_field: &str) -> Result<russh_keys::key::KeyPair, ScanError> {
    let pem = if password_field.starts_with("-----") {
        password_field.to_string()
    } else {
        tokio::fs::read_to_string(password_field)
            .await
            .map_err(|e| ScanError::Config(format!("reading key file {password_field:?}: {e}")))?
    };

    decode_secret_key(&pem, None)
        .or_else(|_| decode_secret_key(&pem, Some("")))
        .map_err(|e| ScanError::protocol(format!("invalid key: {e}")))
}

async fn attempt(
    dialer: &Dialer,
    target: &Target,
    timeout: Duration,
    username: &str,
    password: &str,
) -> Result<bool, ScanError> {
    let key = load_key(password).await?;

    let config = Arc::new(client::Config {
        inactivity_timeout: Some(timeout),
        ..Default::default()
    });
    let addr = std::net::SocketAddr::new(target.ip, target.port);
    let stream = dialer.dial_context(addr, timeout).await?;
    let mut session = client::connect_stream(config, stream, AcceptAllHostKeys)
        .await
        .map_err(|e| ScanError::protocol(e.to_string()))?;

    match session.authenticate_publickey(username, Arc::new(key)).await {
        Ok(true) => Ok(true),
        Ok(false) => Ok(false),
        Err(e) => {
            let msg = e.to_string().to_ascii_lowercase();
            if msg.contains("permission denied") || msg.contains("no supported") {
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
    dialer: &'a Dialer,
    timeout: Duration,
    target: &'a Target,
    credential: &'a Credential,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let fut = attempt(dialer, target, timeout, &credential.username, &credential.password);
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
