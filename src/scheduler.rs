// SPDX-License-Identifier: MIT
// Two-level fan-out: P target workers, each spawning T credential workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dialer::Dialer;
use crate::error::ScanError;
use crate::handlers::Outcome;
use crate::model::{Protocol, ScanResult, Target};
use crate::registry::{self, Entry};
use crate::sink::ResultSink;
use crate::wordlist;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ScanOptions {
    pub timeout: Duration,
    pub parallel: usize,
    pub threads: usize,
    pub delay: Duration,
    pub usernames: Arc<Vec<String>>,
    pub passwords: Arc<Vec<String>>,
}

impl ScanOptions {
    /// Delay forces single-threaded credential workers per target, matching
    /// the source tool's own throttling rule.
    pub fn effective_threads(&self) -> usize {
        if self.delay > Duration::ZERO {
            1
        } else {
            self.threads.max(1)
        }
    }
}

/// Runs the full scan for one protocol over `targets`, driving the two-level
/// fan-out to completion or until `ctx` is cancelled.
pub async fn run(
    protocol: Protocol,
    targets: Vec<Target>,
    opts: ScanOptions,
    dialer: Dialer,
    sink: ResultSink,
    ctx: CancellationToken,
) -> Result<(), ScanError> {
    let entry = registry::entry(protocol);
    let entry = Arc::new(entry);

    let (result_tx, result_rx) = mpsc::channel::<ScanResult>(CHANNEL_CAPACITY);
    let sink_handle = sink.clone().spawn(result_rx);

    let (target_tx, target_rx) = mpsc::channel::<Target>(CHANNEL_CAPACITY);
    let target_rx: SharedTargetReceiver = Arc::new(tokio::sync::Mutex::new(target_rx));

    let feed_ctx = ctx.clone();
    let feed_entry = entry.clone();
    let feed_dialer = dialer.clone();
    let feed_timeout = opts.timeout;
    let feed_result_tx = result_tx.clone();
    let feeder = tokio::spawn(async move {
        for target in targets {
            if feed_ctx.is_cancelled() {
                break;
            }
            match run_checker(&feed_entry, &target, &feed_dialer, feed_timeout).await {
                Ok((default_creds_ok, encryption)) => {
                    let mut target = target;
                    if encryption {
                        target.encryption = crate::model::Encryption::Tls;
                    } else if matches!(target.encryption, crate::model::Encryption::Unknown) {
                        target.encryption = crate::model::Encryption::Plain;
                    }
                    if default_creds_ok {
                        let cred = default_credential_hint(protocol);
                        let result = ScanResult::new(protocol, &target, &cred);
                        let _ = feed_result_tx.send(result).await;
                        continue;
                    }
                    if target_tx.send(target).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(%e, target = %target.addr(), "checker failed, skipping target");
                }
            }
        }
    });

    let threads = opts.effective_threads();

    let mut target_workers = JoinSet::new();
    for _ in 0..opts.parallel.max(1) {
        let entry = entry.clone();
        let dialer = dialer.clone();
        let ctx = ctx.clone();
        let result_tx = result_tx.clone();
        let usernames = opts.usernames.clone();
        let passwords = opts.passwords.clone();
        let timeout = opts.timeout;
        let delay = opts.delay;

        let target_rx = target_rx.clone();
        target_workers.spawn(async move {
            run_target_worker(
                entry, dialer, ctx, result_tx, usernames, passwords, timeout, delay, threads, protocol, target_rx,
            )
            .await;
        });
    }

    feeder.await.map_err(|e| ScanError::protocol(e.to_string()))?;
    while target_workers.join_next().await.is_some() {}

    drop(result_tx);
    sink_handle.await.map_err(|e| ScanError::protocol(e.to_string()))?;

    Ok(())
}

async fn run_checker(
    entry: &Entry,
    target: &Target,
    dialer: &Dialer,
    timeout: Duration,
) -> Result<(bool, bool), ScanError> {
    (entry.checker)(target, dialer, timeout).await
}

/// Each of the `P` outer workers repeatedly takes a Target off the shared
/// channel and runs a full `T`-wide credential sweep against it before
/// returning for the next Target.
#[allow(clippy::too_many_arguments)]
async fn run_target_worker(
    entry: Arc<Entry>,
    dialer: Dialer,
    ctx: CancellationToken,
    result_tx: mpsc::Sender<ScanResult>,
    usernames: Arc<Vec<String>>,
    passwords: Arc<Vec<String>>,
    timeout: Duration,
    delay: Duration,
    threads: usize,
    protocol: Protocol,
    target_rx: SharedTargetReceiver,
) {
    loop {
        let target = {
            let mut guard = target_rx.lock().await;
            guard.recv().await
        };
        let Some(target) = target else { break };
        if ctx.is_cancelled() {
            break;
        }

        let (cred_tx, cred_rx) = mpsc::channel::<crate::model::Credential>(CHANNEL_CAPACITY);
        let producer_ctx = ctx.clone();
        let producer_usernames = usernames.clone();
        let producer_passwords = passwords.clone();
        let producer = tokio::spawn(async move {
            wordlist::stream_cross_product(&producer_usernames, &producer_passwords, &cred_tx, &producer_ctx).await;
        });

        let cred_rx = Arc::new(tokio::sync::Mutex::new(cred_rx));
        let mut workers = JoinSet::new();
        for _ in 0..threads {
            let entry = entry.clone();
            let dialer = dialer.clone();
            let ctx = ctx.clone();
            let result_tx = result_tx.clone();
            let target = target.clone();
            let cred_rx = cred_rx.clone();

            workers.spawn(async move {
                loop {
                    let credential = {
                        let mut guard = cred_rx.lock().await;
                        guard.recv().await
                    };
                    let Some(credential) = credential else { break };
                    if ctx.is_cancelled() {
                        break;
                    }

                    let outcome = (entry.handler)(&ctx, &dialer, timeout, &target, &credential).await;
                    match outcome {
                        Outcome::Success => {
                            let result = ScanResult::new(protocol, &target, &credential);
                            let _ = result_tx.send(result).await;
                        }
                        Outcome::AuthFail => {
                            tracing::debug!(target = %target.addr(), user = %credential.username, "auth fail");
                        }
                        Outcome::Transport(e) | Outcome::Protocol(e) => {
                            tracing::debug!(%e, target = %target.addr(), "attempt error");
                        }
                    }

                    if delay > Duration::ZERO {
                        tokio::select! {
                            _ = ctx.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            });
        }

        let _ = producer.await;
        while workers.join_next().await.is_some() {}
    }
}

type SharedTargetReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Target>>>;

fn default_credential_hint(protocol: Protocol) -> crate::model::Credential {
    let (username, password) = match protocol {
        Protocol::Amqp => ("guest", "guest"),
        Protocol::Clickhouse => ("default", ""),
        _ => ("", ""),
    };
    crate::model::Credential {
        username: username.to_string(),
        password: password.to_string(),
    }
}
