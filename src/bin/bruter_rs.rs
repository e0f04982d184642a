// SPDX-License-Identifier: MIT
// Command-line entry point: parses flags, wires up logging and runs one scan.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bruter_rs::dialer::Dialer;
use bruter_rs::model::Protocol;
use bruter_rs::sink::{OutputFormat, ResultSink};
use bruter_rs::{scheduler, target, wordlist};

/// Multi-protocol network credential brute-forcer.
#[derive(Parser, Debug)]
#[command(name = "bruter-rs", version, about)]
struct Cli {
    /// Suppress the startup banner and info-level logging.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Enable verbose logging, including AuthFail attempts.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write successful credentials to this file.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Write successes as JSON-lines instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Number of targets scanned concurrently.
    #[arg(short = 'P', long, default_value_t = 10, global = true)]
    parallel: usize,

    /// Number of credential workers per target.
    #[arg(short = 'T', long, default_value_t = 1, global = true)]
    threads: usize,

    /// Delay between attempts on the same target, in milliseconds.
    #[arg(long, default_value_t = 0, global = true)]
    delay: u64,

    /// Per-attempt timeout, in seconds.
    #[arg(long, default_value_t = 5, global = true)]
    timeout: u64,

    /// Username, or a path to a username wordlist.
    #[arg(short, long, global = true)]
    username: String,

    /// Password, or a path to a password wordlist.
    #[arg(short, long, global = true)]
    password: String,

    /// Upstream SOCKS5 proxy, e.g. socks5://127.0.0.1:1080.
    #[arg(long, global = true)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Amqp(TargetArgs),
    Http(TargetArgs),
    Ldap(TargetArgs),
    Mysql(TargetArgs),
    Pop3(TargetArgs),
    Ssh(TargetArgs),
    SshKey(TargetArgs),
    Telnet(TargetArgs),
    Vnc(TargetArgs),
    Xmpp(TargetArgs),
    Clickhouse(TargetArgs),
    Teamspeak(TargetArgs),
    Asterisk(TargetArgs),
    CiscoEnable(TargetArgs),
}

impl Command {
    fn protocol(&self) -> Protocol {
        match self {
            Command::Amqp(_) => Protocol::Amqp,
            Command::Http(_) => Protocol::Http,
            Command::Ldap(_) => Protocol::Ldap,
            Command::Mysql(_) => Protocol::Mysql,
            Command::Pop3(_) => Protocol::Pop3,
            Command::Ssh(_) => Protocol::Ssh,
            Command::SshKey(_) => Protocol::SshKey,
            Command::Telnet(_) => Protocol::Telnet,
            Command::Vnc(_) => Protocol::Vnc,
            Command::Xmpp(_) => Protocol::Xmpp,
            Command::Clickhouse(_) => Protocol::Clickhouse,
            Command::Teamspeak(_) => Protocol::Teamspeak,
            Command::Asterisk(_) => Protocol::Asterisk,
            Command::CiscoEnable(_) => Protocol::CiscoEnable,
        }
    }

    fn args(&self) -> &TargetArgs {
        match self {
            Command::Amqp(a)
            | Command::Http(a)
            | Command::Ldap(a)
            | Command::Mysql(a)
            | Command::Pop3(a)
            | Command::Ssh(a)
            | Command::SshKey(a)
            | Command::Telnet(a)
            | Command::Vnc(a)
            | Command::Xmpp(a)
            | Command::Clickhouse(a)
            | Command::Teamspeak(a)
            | Command::Asterisk(a)
            | Command::CiscoEnable(a) => a,
        }
    }
}

#[derive(Parser, Debug)]
struct TargetArgs {
    /// A single host[:port] or a path to a file of such lines.
    target: String,

    /// Override the protocol's default port.
    #[arg(long)]
    port: Option<u16>,
}

fn init_logging(cli: &Cli) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("bruter_rs=debug,info")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_banner(protocol: Protocol, parallel: usize, threads: usize) {
    println!("bruter-rs :: {protocol} :: P={parallel} T={threads}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit = run(cli).await;
    match exit {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(%e, "fatal error");
            Err(e)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let protocol = cli.command.protocol();
    let args = cli.command.args();

    if !cli.quiet {
        print_banner(protocol, cli.parallel, cli.threads);
    }

    let default_port = args.port.unwrap_or_else(|| protocol.default_port());
    let targets = target::ingest_targets(&args.target, default_port)
        .await
        .context("ingesting targets")?;

    let usernames = wordlist::parse_file_by_line(&cli.username)
        .await
        .context("reading username source")?;
    let passwords = wordlist::parse_file_by_line(&cli.password)
        .await
        .context("reading password source")?;

    let proxy = match &cli.proxy {
        Some(raw) => Some(parse_proxy(raw)?),
        None => None,
    };
    let dialer = Dialer::new(proxy);

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Plain };
    let sink = ResultSink::new(cli.output.as_deref().and_then(|p| p.to_str()), format)
        .await
        .context("opening output file")?;

    let ctx = CancellationToken::new();
    install_signal_handlers(ctx.clone());

    let opts = scheduler::ScanOptions {
        timeout: Duration::from_secs(cli.timeout),
        parallel: cli.parallel,
        threads: cli.threads,
        delay: Duration::from_millis(cli.delay),
        usernames: Arc::new(usernames),
        passwords: Arc::new(passwords),
    };

    scheduler::run(protocol, targets, opts, dialer, sink.clone(), ctx).await?;

    tracing::info!(successes = sink.success_count(), "scan complete");
    Ok(())
}

fn parse_proxy(raw: &str) -> Result<SocketAddr> {
    let url = url::Url::parse(raw).context("invalid proxy URL")?;
    let host = url.host_str().context("proxy URL missing host")?;
    let port = url.port().context("proxy URL missing port")?;
    format!("{host}:{port}").parse().context("resolving proxy address")
}

fn install_signal_handlers(ctx: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => return,
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::warn!("received shutdown signal, cancelling in-flight attempts");
        ctx.cancel();
    });
}
