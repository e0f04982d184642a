// SPDX-License-Identifier: MIT
// Plain data values: Target, Credential, ScanResult, and the closed Protocol tag.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Closed set of supported protocol tags. A `clap::ValueEnum` maps CLI
/// subcommands onto these variants, so an unrecognised protocol never
/// reaches the handler registry — it is rejected at argument-parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum Protocol {
    Amqp,
    Http,
    Ldap,
    Mysql,
    Pop3,
    Ssh,
    SshKey,
    Telnet,
    Vnc,
    Xmpp,
    Clickhouse,
    Teamspeak,
    Asterisk,
    CiscoEnable,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Amqp => 5672,
            Protocol::Http => 80,
            Protocol::Ldap => 389,
            Protocol::Mysql => 3306,
            Protocol::Pop3 => 110,
            Protocol::Ssh | Protocol::SshKey => 22,
            Protocol::Telnet => 23,
            Protocol::Vnc => 5900,
            Protocol::Xmpp => 5222,
            Protocol::Clickhouse => 9000,
            Protocol::Teamspeak => 10011,
            Protocol::Asterisk => 5038,
            Protocol::CiscoEnable => 23,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Protocol::Amqp => "amqp",
            Protocol::Http => "http",
            Protocol::Ldap => "ldap",
            Protocol::Mysql => "mysql",
            Protocol::Pop3 => "pop3",
            Protocol::Ssh => "ssh",
            Protocol::SshKey => "ssh-key",
            Protocol::Telnet => "telnet",
            Protocol::Vnc => "vnc",
            Protocol::Xmpp => "xmpp",
            Protocol::Clickhouse => "clickhouse",
            Protocol::Teamspeak => "teamspeak",
            Protocol::Asterisk => "asterisk",
            Protocol::CiscoEnable => "cisco-enable",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tri-state encryption flag: unknown until the checker runs, then fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    Unknown,
    Plain,
    Tls,
}

impl Encryption {
    pub fn is_tls(self) -> bool {
        matches!(self, Encryption::Tls)
    }
}

/// A resolved scan target. Constructed once at ingestion; the checker is the
/// only code allowed to flip `encryption` from `Unknown` to a concrete value.
#[derive(Debug, Clone)]
pub struct Target {
    pub ip: IpAddr,
    pub port: u16,
    pub encryption: Encryption,
    /// The pre-resolution string: bare IP, hostname, or `host:port`.
    /// Preserved for SNI / Host header / XMPP JID construction.
    pub original_target: String,
}

impl Target {
    pub fn addr(&self) -> String {
        match self.ip {
            IpAddr::V4(v4) => format!("{v4}:{}", self.port),
            IpAddr::V6(v6) => format!("[{v6}]:{}", self.port),
        }
    }

    /// The original target's host component, with any `:port` suffix and
    /// surrounding `[...]` (IPv6 literal) brackets stripped — used as a
    /// Host header / SNI name / SASL domain when it is not a bare IP.
    pub fn original_host(&self) -> Option<&str> {
        if self.original_target.parse::<IpAddr>().is_ok() {
            return None;
        }
        let s = self.original_target.as_str();
        if let Some(rest) = s.strip_prefix('[') {
            return rest.split(']').next();
        }
        match s.rsplit_once(':') {
            // only treat the suffix as a port if it parses as one, otherwise
            // the colon is part of a bare IPv6 literal with no brackets
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => Some(host),
            _ => Some(s),
        }
    }
}

/// Username + password. For SSH key mode `password` holds PEM text (starting
/// `"-----"`) or a filesystem path. VNC ignores the username.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Emitted only on a verified authentication success.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub protocol: String,
    #[serde(skip_serializing)]
    pub ip: IpAddr,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(rename = "target")]
    pub original_target: String,
    pub timestamp: u64,
}

impl ScanResult {
    pub fn new(protocol: Protocol, target: &Target, credential: &Credential) -> Self {
        Self {
            protocol: protocol.tag().to_string(),
            ip: target.ip,
            port: target.port,
            username: credential.username.clone(),
            password: credential.password.clone(),
            original_target: target.original_target.clone(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amqp" => Ok(Protocol::Amqp),
            "http" => Ok(Protocol::Http),
            "ldap" => Ok(Protocol::Ldap),
            "mysql" => Ok(Protocol::Mysql),
            "pop3" => Ok(Protocol::Pop3),
            "ssh" => Ok(Protocol::Ssh),
            "ssh-key" => Ok(Protocol::SshKey),
            "telnet" => Ok(Protocol::Telnet),
            "vnc" => Ok(Protocol::Vnc),
            "xmpp" => Ok(Protocol::Xmpp),
            "clickhouse" => Ok(Protocol::Clickhouse),
            "teamspeak" => Ok(Protocol::Teamspeak),
            "asterisk" => Ok(Protocol::Asterisk),
            "cisco-enable" => Ok(Protocol::CiscoEnable),
            other => Err(format!("unknown protocol {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_host_strips_port() {
        let t = Target {
            ip: "127.0.0.1".parse().unwrap(),
            port: 8080,
            encryption: Encryption::Unknown,
            original_target: "example.com:8080".into(),
        };
        assert_eq!(t.original_host(), Some("example.com"));
    }

    #[test]
    fn original_host_none_for_bare_ip() {
        let t = Target {
            ip: "127.0.0.1".parse().unwrap(),
            port: 80,
            encryption: Encryption::Unknown,
            original_target: "127.0.0.1".into(),
        };
        assert_eq!(t.original_host(), None);
    }

    #[test]
    fn original_host_handles_ipv6_literal() {
        let t = Target {
            ip: "::1".parse().unwrap(),
            port: 443,
            encryption: Encryption::Unknown,
            original_target: "[::1]:443".into(),
        };
        assert_eq!(t.original_host(), None);
    }

    #[test]
    fn protocol_roundtrips_through_tag() {
        for p in [
            Protocol::Amqp,
            Protocol::Http,
            Protocol::Ldap,
            Protocol::Mysql,
            Protocol::Pop3,
            Protocol::Ssh,
            Protocol::SshKey,
            Protocol::Telnet,
            Protocol::Vnc,
            Protocol::Xmpp,
            Protocol::Clickhouse,
            Protocol::Teamspeak,
            Protocol::Asterisk,
            Protocol::CiscoEnable,
        ] {
            assert_eq!(Protocol::from_str(p.tag()).unwrap().tag(), p.tag());
        }
    }
}
