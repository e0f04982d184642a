// SPDX-License-Identifier: MIT
// Target parsing and ingestion: literal host[:port] strings or a file of them.

use std::net::IpAddr;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::lookup_host;

use crate::error::ScanError;
use crate::model::{Encryption, Target};

/// Parses one `host`, `host:port`, `[ipv6]:port` or hostname literal.
/// Bare IPv4/IPv6 and `ip:port` are resolved without a DNS round trip;
/// anything else goes through `lookup_host` and keeps the first address.
pub async fn parse_target(raw: &str, default_port: u16) -> Result<Target, ScanError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScanError::Ingestion {
            target: raw.to_string(),
            reason: "empty target".into(),
        });
    }

    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Ok(Target {
            ip,
            port: default_port,
            encryption: Encryption::Unknown,
            original_target: raw.to_string(),
        });
    }

    let (host, port) = split_host_port(raw, default_port)?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Target {
            ip,
            port,
            encryption: Encryption::Unknown,
            original_target: raw.to_string(),
        });
    }

    let lookup_addr = format!("{host}:{port}");
    let mut addrs = lookup_host(&lookup_addr).await.map_err(|e| ScanError::Ingestion {
        target: raw.to_string(),
        reason: format!("dns resolution failed: {e}"),
    })?;
    let resolved = addrs.next().ok_or_else(|| ScanError::Ingestion {
        target: raw.to_string(),
        reason: "hostname resolved to no addresses".into(),
    })?;

    Ok(Target {
        ip: resolved.ip(),
        port,
        encryption: Encryption::Unknown,
        original_target: raw.to_string(),
    })
}

/// Splits `host:port` / `[ipv6]:port` / bare `host`, applying `default_port`
/// when no port suffix is present.
fn split_host_port(raw: &str, default_port: u16) -> Result<(String, u16), ScanError> {
    if let Some(rest) = raw.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| ScanError::Ingestion {
            target: raw.to_string(),
            reason: "unterminated ipv6 literal".into(),
        })?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(raw, p)?,
            None => default_port,
        };
        return Ok((host.to_string(), port));
    }

    match raw.rsplit_once(':') {
        Some((host, port_str)) if port_str.chars().all(|c| c.is_ascii_digit()) && !port_str.is_empty() => {
            Ok((host.to_string(), parse_port(raw, port_str)?))
        }
        _ => Ok((raw.to_string(), default_port)),
    }
}

fn parse_port(raw: &str, port_str: &str) -> Result<u16, ScanError> {
    let port: u32 = port_str.parse().map_err(|_| ScanError::Ingestion {
        target: raw.to_string(),
        reason: format!("invalid port {port_str:?}"),
    })?;
    if port == 0 || port > 65535 {
        return Err(ScanError::Ingestion {
            target: raw.to_string(),
            reason: "port out of range 1-65535".into(),
        });
    }
    Ok(port as u16)
}

/// Ingests a target argument: reads it as a file of one-target-per-line if
/// the path exists, otherwise treats it as a single literal target. Unparseable
/// lines are logged at debug and skipped; the whole call fails only if zero
/// targets survive.
pub async fn ingest_targets(arg: &str, default_port: u16) -> Result<Vec<Target>, ScanError> {
    let mut targets = Vec::new();

    if tokio::fs::metadata(arg).await.is_ok() {
        let file = tokio::fs::File::open(arg).await.map_err(ScanError::from)?;
        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await.map_err(ScanError::from)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_target(line, default_port).await {
                Ok(t) => targets.push(t),
                Err(e) => tracing::debug!(%e, line, "skipping unparseable target line"),
            }
        }
    } else {
        targets.push(parse_target(arg, default_port).await?);
    }

    if targets.is_empty() {
        return Err(ScanError::Ingestion {
            target: arg.to_string(),
            reason: "no targets found".into(),
        });
    }

    Ok(targets)
}

#[allow(dead_code)]
fn is_file(path: &str) -> bool {
    Path::new(path).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_bare_ipv4() {
        let t = parse_target("192.0.2.1", 23).await.unwrap();
        assert_eq!(t.ip.to_string(), "192.0.2.1");
        assert_eq!(t.port, 23);
    }

    #[tokio::test]
    async fn parses_ipv4_with_port() {
        let t = parse_target("192.0.2.1:2222", 23).await.unwrap();
        assert_eq!(t.port, 2222);
    }

    #[tokio::test]
    async fn parses_ipv6_literal_with_port() {
        let t = parse_target("[2001:db8::1]:8080", 23).await.unwrap();
        assert_eq!(t.port, 8080);
        assert_eq!(t.ip.to_string(), "2001:db8::1");
    }

    #[tokio::test]
    async fn rejects_out_of_range_port() {
        assert!(parse_target("192.0.2.1:70000", 23).await.is_err());
    }

    #[tokio::test]
    async fn rejects_empty_string() {
        assert!(parse_target("   ", 23).await.is_err());
    }

    #[tokio::test]
    async fn ingest_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        tokio::fs::write(&path, "\n\n").await.unwrap();
        let result = ingest_targets(path.to_str().unwrap(), 23).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ingest_reads_file_of_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        tokio::fs::write(&path, "192.0.2.1\n192.0.2.2:2222\n\n").await.unwrap();
        let targets = ingest_targets(path.to_str().unwrap(), 23).await.unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].port, 2222);
    }
}
