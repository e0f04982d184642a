// SPDX-License-Identifier: MIT
// ClickHouse native protocol (9000/9440) authentication via a connect + ping.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

const DEFAULT_USERNAME: &str = "default";
const DEFAULT_PASSWORD: &str = "";

/// klickhouse selects its transport from the destination string's scheme:
/// a bare `host:port` dials plaintext, `tls://host:port` negotiates TLS
/// before the native protocol handshake begins.
fn destination(target: &Target, secure: bool) -> String {
    if secure {
        format!("tls://{}:{}", target.ip, target.port)
    } else {
        format!("{}:{}", target.ip, target.port)
    }
}

async fn attempt(target: &Target, secure: bool, username: &str, password: &str) -> Result<bool, ScanError> {
    let mut options = klickhouse::ClientOptions {
        username: username.to_string(),
        password: password.to_string(),
        default_database: "default".to_string(),
        ..Default::default()
    };
    options.tcp_nodelay = true;

    match klickhouse::Client::connect(destination(target, secure), options).await {
        Ok(client) => {
            client.execute("SELECT 1").await.map_err(|e| ScanError::protocol(e.to_string()))?;
            Ok(true)
        }
        Err(e) => {
            if let Some(code) = clickhouse_exception_code(&e) {
                if matches!(code, 192 | 193 | 194 | 516) {
                    return Ok(false);
                }
            }
            Err(classify(e))
        }
    }
}

fn clickhouse_exception_code(err: &klickhouse::KlickhouseError) -> Option<i32> {
    match err {
        klickhouse::KlickhouseError::ServerException { code, .. } => Some(*code),
        _ => None,
    }
}

fn classify(err: klickhouse::KlickhouseError) -> ScanError {
    let msg = err.to_string();
    if msg.contains("first record does not look like a TLS handshake") || msg.to_ascii_lowercase().contains("tls") {
        return ScanError::tls(msg);
    }
    ScanError::protocol(msg)
}

pub fn checker<'a>(target: &'a Target, _dialer: &'a Dialer, timeout: Duration) -> CheckerFuture<'a> {
    Box::pin(async move {
        match tokio::time::timeout(timeout, attempt(target, true, DEFAULT_USERNAME, DEFAULT_PASSWORD)).await {
            Ok(Ok(ok)) => Ok((ok, true)),
            Ok(Err(_)) | Err(_) => {
                match tokio::time::timeout(timeout, attempt(target, false, DEFAULT_USERNAME, DEFAULT_PASSWORD)).await {
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
        let fut = attempt(target, target.encryption.is_tls(), &credential.username, &credential.password);
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
    use crate::model::Encryption;

    fn target_at(port: u16) -> Target {
        Target {
            ip: "192.0.2.9".parse().unwrap(),
            port,
            encryption: Encryption::Tls,
            original_target: "192.0.2.9".into(),
        }
    }

    #[test]
    fn destination_carries_the_tls_scheme_only_when_secure() {
        let target = target_at(9440);
        assert_eq!(destination(&target, true), "tls://192.0.2.9:9440");
        assert_eq!(destination(&target, false), "192.0.2.9:9440");
    }
}
