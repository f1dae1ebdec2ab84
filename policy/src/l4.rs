// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Transport-layer (L4) match fragments

use std::str::FromStr;
use tracing::trace;

/// Transport protocols the dataplane can match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum L4Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl L4Protocol {
    /// The protocol token used in match expressions.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            L4Protocol::Tcp => "tcp",
            L4Protocol::Udp => "udp",
            L4Protocol::Sctp => "sctp",
        }
    }
}

impl FromStr for L4Protocol {
    type Err = String;

    /// Parse a protocol name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(L4Protocol::Tcp),
            "udp" => Ok(L4Protocol::Udp),
            "sctp" => Ok(L4Protocol::Sctp),
            _ => Err(format!("Unsupported L4 protocol '{s}'")),
        }
    }
}

/// Build the L4 match for `protocol` and destination ports `port`..=`end_port`.
///
/// A zero `port` means "any port" and a zero `end_port` means "single port". Protocols other than
/// TCP, UDP and SCTP yield an empty match: the caller then contributes no L4 restriction.
#[must_use]
pub fn l4_match(protocol: &str, port: u16, end_port: u16) -> String {
    let Ok(proto) = protocol.parse::<L4Protocol>() else {
        trace!("Ignoring port policy with unsupported protocol '{protocol}'");
        return String::new();
    };
    let proto = proto.as_str();
    if port == 0 {
        proto.to_string()
    } else if end_port == 0 || end_port == port {
        format!("{proto} && {proto}.dst=={port}")
    } else {
        format!("{proto} && {port}<={proto}.dst<={end_port}")
    }
}

/// The protocol and destination ports of one entry in a rule's port list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortPolicy {
    pub protocol: String,
    /// 0 if unspecified
    pub port: u16,
    /// 0 if unspecified. Only meaningful when `port` is set.
    pub end_port: u16,
}

impl PortPolicy {
    #[must_use]
    pub fn new(protocol: &str, port: u16, end_port: u16) -> Self {
        Self {
            protocol: protocol.to_string(),
            port,
            end_port,
        }
    }

    /// The L4 match of this port policy, see [`l4_match`].
    #[must_use]
    pub fn l4_match(&self) -> String {
        l4_match(&self.protocol, self.port, self.end_port)
    }
}

#[cfg(test)]
mod test {
    use super::{L4Protocol, PortPolicy, l4_match};

    #[test]
    fn test_l4_match() {
        // (description, protocol, port, end_port, expected)
        let cases = [
            ("unsupported protocol", "kube", 0, 0, ""),
            ("unsupported protocol with ports", "icmp", 80, 90, ""),
            (
                "valid protocol with no endport specified",
                "TCP",
                300,
                0,
                "tcp && tcp.dst==300",
            ),
            (
                "valid protocol with endport specified",
                "TCP",
                300,
                310,
                "tcp && 300<=tcp.dst<=310",
            ),
            ("valid protocol with no ports specified", "TCP", 0, 0, "tcp"),
            ("lowercase udp", "udp", 53, 0, "udp && udp.dst==53"),
            ("mixed case sctp", "Sctp", 0, 0, "sctp"),
            ("one-port range", "UDP", 53, 53, "udp && udp.dst==53"),
            ("full range", "TCP", 1, 65535, "tcp && 1<=tcp.dst<=65535"),
        ];
        for (desc, protocol, port, end_port, expected) in cases {
            assert_eq!(l4_match(protocol, port, end_port), expected, "{desc}");
        }
    }

    #[test]
    fn test_port_policy_l4_match() {
        let pp = PortPolicy::new("SCTP", 5000, 5010);
        assert_eq!(pp.l4_match(), "sctp && 5000<=sctp.dst<=5010");
        // calling again yields the same fragment
        assert_eq!(pp.l4_match(), pp.l4_match());
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("tCp".parse::<L4Protocol>(), Ok(L4Protocol::Tcp));
        assert_eq!("UDP".parse::<L4Protocol>(), Ok(L4Protocol::Udp));
        assert!("".parse::<L4Protocol>().is_err());
        assert_eq!(L4Protocol::Sctp.as_str(), "sctp");
    }
}
