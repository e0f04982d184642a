// SPDX-License-Identifier: MIT
// VNC (RFB) password authentication. The username is not part of the protocol.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vnc::{PixelFormat, VncConnector};

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(dialer: &Dialer, target: &Target, password: &str) -> Result<bool, ScanError> {
    let addr = format!("{}:{}", target.ip, target.port)
        .parse()
        .map_err(|_| ScanError::protocol("invalid socket address"))?;
    let tcp = dialer.dial(addr).await?;
    let password = password.to_string();

    let connector = VncConnector::new(tcp)
        .set_auth_method(async move { Ok(password) })
        .allow_shared(true)
        .set_pixel_format(PixelFormat::bgra())
        .build()
        .map_err(|e| ScanError::protocol(e.to_string()))?;

    match connector.try_start().await {
        Ok(handshake) => {
            let _client = handshake.finish().await.map_err(|e| ScanError::protocol(e.to_string()))?;
            Ok(true)
        }
        Err(e) => {
            let msg = e.to_string().to_ascii_lowercase();
            if msg.contains("authentication failed")
                || msg.contains("too many authentication failures")
                || msg.contains("auth")
            {
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
        let fut = attempt(dialer, target, &credential.password);
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
