// SPDX-License-Identifier: MIT
// AMQP 0-9-1 checker/handler, grounded on the protocol's ACCESS_REFUSED close.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

const DEFAULT_USERNAME: &str = "guest";
const DEFAULT_PASSWORD: &str = "guest";

fn uri(target: &Target, encryption: bool, username: &str, password: &str) -> String {
    let scheme = if encryption { "amqps" } else { "amqp" };
    format!("{scheme}://{username}:{password}@{}:{}/", target.ip, target.port)
}

async fn probe(
    target: &Target,
    encryption: bool,
    username: &str,
    password: &str,
) -> Result<bool, ScanError> {
    let addr = uri(target, encryption, username, password);
    let options = lapin::ConnectionProperties::default();
    match lapin::Connection::connect(&addr, options).await {
        Ok(conn) => {
            let _ = conn.close(200, "done").await;
            Ok(true)
        }
        Err(e) => {
            if is_access_refused(&e) {
                Ok(false)
            } else {
                Err(ScanError::protocol(e.to_string()))
            }
        }
    }
}

fn is_access_refused(err: &lapin::Error) -> bool {
    let msg = err.to_string().to_ascii_uppercase();
    msg.contains("ACCESS_REFUSED") || msg.contains("NOT_ALLOWED") || msg.contains("403") || msg.contains("530")
}

pub fn checker<'a>(target: &'a Target, _dialer: &'a Dialer, timeout: Duration) -> CheckerFuture<'a> {
    Box::pin(async move {
        match tokio::time::timeout(timeout, probe(target, true, DEFAULT_USERNAME, DEFAULT_PASSWORD)).await {
            Ok(Ok(ok)) => Ok((ok, true)),
            Ok(Err(_)) | Err(_) => {
                match tokio::time::timeout(timeout, probe(target, false, DEFAULT_USERNAME, DEFAULT_PASSWORD)).await {
                    Ok(Ok(ok)) => Ok((ok, false)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ScanError::Timeout(timeout)),
                }
            }
        }
    })
}

pub fn handler<'a>(
    ctx: &'a CancellationToken,
    _dialer: &'a Dialer,
    timeout: Duration,
    target: &'a Target,
    credential: &'a Credential,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let attempt = probe(target, target.encryption.is_tls(), &credential.username, &credential.password);
        tokio::select! {
            _ = ctx.cancelled() => Outcome::Transport(ScanError::Cancelled),
            result = tokio::time::timeout(timeout, attempt) => {
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
    fn uri_uses_amqps_scheme_when_encrypted() {
        let target = Target {
            ip: "127.0.0.1".parse().unwrap(),
            port: 5671,
            encryption: crate::model::Encryption::Tls,
            original_target: "127.0.0.1".into(),
        };
        let s = uri(&target, true, "guest", "guest");
        assert!(s.starts_with("amqps://"));
    }
}
