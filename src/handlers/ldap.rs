// SPDX-License-Identifier: MIT
// LDAP/LDAPS simple bind authentication.

use std::time::Duration;

use ldap3::{LdapConnAsync, LdapConnSettings};
use tokio_util::sync::CancellationToken;

use super::{no_default_creds_checker, CheckerFuture, HandlerFuture, Outcome};
use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

async fn attempt(target: &Target, username: &str, password: &str) -> Result<bool, ScanError> {
    let scheme = if target.encryption.is_tls() { "ldaps" } else { "ldap" };
    let url = format!("{scheme}://{}/", target.addr());

    let settings = LdapConnSettings::new().set_no_tls_verify(true);
    let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
        .await
        .map_err(|e| ScanError::protocol(e.to_string()))?;
    ldap3::drive!(conn);

    match ldap.simple_bind(username, password).await {
        Ok(res) => match res.success() {
            Ok(_) => {
                let _ = ldap.unbind().await;
                Ok(true)
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("49") || msg.to_ascii_lowercase().contains("invalidcredentials") {
                    Ok(false)
                } else {
                    Err(ScanError::protocol(msg))
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
