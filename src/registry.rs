// SPDX-License-Identifier: MIT
// Declarative protocol → {default_port, checker, handler} registry.

use crate::handlers::{Checker, ModuleHandler};
use crate::model::Protocol;

pub struct Entry {
    pub default_port: u16,
    pub checker: Checker,
    pub handler: ModuleHandler,
}

/// One-shot lookup over the closed `Protocol` set. No runtime-mutable global:
/// the table is a `match`, so the compiler enforces that every variant is wired.
pub fn entry(protocol: Protocol) -> Entry {
    use crate::handlers::*;

    match protocol {
        Protocol::Amqp => Entry {
            default_port: protocol.default_port(),
            checker: amqp::checker,
            handler: amqp::handler,
        },
        Protocol::Http => Entry {
            default_port: protocol.default_port(),
            checker: http_basic::checker,
            handler: http_basic::handler,
        },
        Protocol::Ldap => Entry {
            default_port: protocol.default_port(),
            checker: ldap::checker,
            handler: ldap::handler,
        },
        Protocol::Mysql => Entry {
            default_port: protocol.default_port(),
            checker: mysql::checker,
            handler: mysql::handler,
        },
        Protocol::Pop3 => Entry {
            default_port: protocol.default_port(),
            checker: pop3::checker,
            handler: pop3::handler,
        },
        Protocol::Ssh => Entry {
            default_port: protocol.default_port(),
            checker: ssh::checker,
            handler: ssh::handler,
        },
        Protocol::SshKey => Entry {
            default_port: protocol.default_port(),
            checker: ssh_key::checker,
            handler: ssh_key::handler,
        },
        Protocol::Telnet => Entry {
            default_port: protocol.default_port(),
            checker: telnet::checker,
            handler: telnet::handler,
        },
        Protocol::Vnc => Entry {
            default_port: protocol.default_port(),
            checker: vnc::checker,
            handler: vnc::handler,
        },
        Protocol::Xmpp => Entry {
            default_port: protocol.default_port(),
            checker: xmpp::checker,
            handler: xmpp::handler,
        },
        Protocol::Clickhouse => Entry {
            default_port: protocol.default_port(),
            checker: clickhouse::checker,
            handler: clickhouse::handler,
        },
        Protocol::Teamspeak => Entry {
            default_port: protocol.default_port(),
            checker: teamspeak::checker,
            handler: teamspeak::handler,
        },
        Protocol::Asterisk => Entry {
            default_port: protocol.default_port(),
            checker: asterisk::checker,
            handler: asterisk::handler,
        },
        Protocol::CiscoEnable => Entry {
            default_port: protocol.default_port(),
            checker: cisco_enable::checker,
            handler: cisco_enable::handler,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_protocol_resolves_to_an_entry() {
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
            let e = entry(p);
            assert_eq!(e.default_port, p.default_port());
        }
    }
}
