// SPDX-License-Identifier: MIT
// SSH password authentication with insecure host-key acceptance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

pub(crate) struct AcceptAllHostKeys;

#[async_trait]
impl client::Handler for AcceptAllHostKeys {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _key: &russh_keys::key::PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub(crate) async fn connect(
    dialer: &Dialer,
    target: &Target,
    timeout: Duration,
) -> Result<Handle<AcceptAllHostKeys>, ScanError> {
    let config = Arc::new(client::Config {
        inactivity_timeout: Some(timeout),
        ..Default::default()
    });
    let addr = std::net::SocketAddr::new(target.ip, target.port);
    let stream = dialer.dial_context(addr, timeout).await?;
    client::connect_stream(config, stream, AcceptAllHostKeys)
        .await
        .map_err(|e| ScanError::protocol(e.to_string()))
}

pub(crate) async fn attempt_password(
    dialer: &Dialer,
    target: &Target,
    timeout: Duration,
    username: &str,
    password: &str,
) -> Result<bool, ScanError> {
    let mut session = connect(dialer, target, timeout).await?;
    match session.authenticate_password(username, password).await {
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
        let fut = attempt_password(dialer, target, timeout, &credential.username, &credential.password);
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
