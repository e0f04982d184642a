// SPDX-License-Identifier: MIT
// Per-protocol checker/handler implementations and their shared contract.

pub mod amqp;
pub mod asterisk;
pub mod cisco_enable;
pub mod clickhouse;
pub mod http_basic;
pub mod ldap;
pub mod mysql;
pub mod pop3;
pub mod ssh;
pub mod ssh_key;
pub mod teamspeak;
pub mod telnet;
pub mod vnc;
pub mod xmpp;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::model::{Credential, Target};

/// Result of a single authentication attempt. Replaces the `(bool, error?)`
/// pair the original tool returns: `Transport` and `Protocol` are kept distinct
/// so a handler can tag *why* it gave up without overloading a bare bool.
#[derive(Debug)]
pub enum Outcome {
    Success,
    AuthFail,
    Transport(ScanError),
    Protocol(ScanError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;
pub type CheckerFuture<'a> = Pin<Box<dyn Future<Output = Result<(bool, bool), ScanError>> + Send + 'a>>;

/// `async fn(ctx, dialer, timeout, target, credential) -> Outcome`, boxed so
/// the registry can hold one function-pointer type per protocol.
pub type ModuleHandler =
    for<'a> fn(&'a CancellationToken, &'a Dialer, Duration, &'a Target, &'a Credential) -> HandlerFuture<'a>;

/// `async fn(target, dialer, timeout) -> Result<(default_creds_ok, encryption_in_use), ScanError>`.
pub type Checker = for<'a> fn(&'a Target, &'a Dialer, Duration) -> CheckerFuture<'a>;

/// Checker for protocols with no protocol-canonical default credential pair
/// worth special-casing: reports no default creds found, but still probes
/// whether the target speaks TLS so handlers for TLS-default ports (HTTPS,
/// LDAPS, POP3S, ...) don't connect in cleartext against a listener that
/// only understands a handshake.
pub(crate) fn no_default_creds_checker<'a>(
    target: &'a Target,
    dialer: &'a Dialer,
    timeout: Duration,
) -> CheckerFuture<'a> {
    Box::pin(async move {
        let addr = std::net::SocketAddr::new(target.ip, target.port);
        let owned_host;
        let sni: &str = match target.original_host() {
            Some(h) => h,
            None => {
                owned_host = target.ip.to_string();
                &owned_host
            }
        };
        match dialer.dial_auto_context(addr, sni, true, timeout).await {
            Ok(_stream) => Ok((false, true)),
            Err(_) => match dialer.dial_context(addr, timeout).await {
                Ok(_stream) => Ok((false, false)),
                Err(e) => Err(e),
            },
        }
    })
}
